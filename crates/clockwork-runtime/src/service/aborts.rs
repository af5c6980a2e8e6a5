//! In-flight request registry keyed by [`AbortKey`].
//!
//! One abort primitive serves both supersede ("latest wins") and
//! explicit cancel; the reason is carried so callers that must
//! distinguish can. Generations guard the unregister path: a request
//! only removes the entry it still owns, so a completion racing a newer
//! registration never evicts the newer request.

use clockwork_types::AbortKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;

/// Why an in-flight request was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AbortReason {
    /// A newer request registered under the same key.
    Superseded,
    /// An explicit-cancel effect targeted the key.
    Manual,
}

struct AbortEntry {
    generation: u64,
    tx: oneshot::Sender<AbortReason>,
}

/// Receiver half handed to the in-flight request.
pub(crate) struct AbortTicket {
    pub(crate) generation: u64,
    pub(crate) rx: oneshot::Receiver<AbortReason>,
}

/// Instance-owned map of abortable in-flight requests.
pub(crate) struct AbortRegistry {
    entries: Mutex<HashMap<AbortKey, AbortEntry>>,
    next_generation: AtomicU64,
}

impl AbortRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Registers a new request under the key, immediately aborting any
    /// previous holder ("latest wins").
    pub(crate) fn register(&self, key: &AbortKey) -> AbortTicket {
        let (tx, rx) = oneshot::channel();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let previous = self
            .entries
            .lock()
            .insert(key.clone(), AbortEntry { generation, tx });
        if let Some(previous) = previous {
            // Receiver may already be gone; a failed send means the old
            // request finished on its own.
            let _ = previous.tx.send(AbortReason::Superseded);
        }

        AbortTicket { generation, rx }
    }

    /// Aborts whatever is registered under the key.
    ///
    /// Returns `false` (a no-op) when nothing is registered.
    pub(crate) fn cancel(&self, key: &AbortKey) -> bool {
        match self.entries.lock().remove(key) {
            Some(entry) => {
                let _ = entry.tx.send(AbortReason::Manual);
                true
            }
            None => false,
        }
    }

    /// Removes the entry if it still belongs to `generation`.
    ///
    /// Called when a request reaches a terminal outcome; a stale
    /// generation means a newer request owns the key now.
    pub(crate) fn complete(&self, key: &AbortKey, generation: u64) {
        let mut entries = self.entries.lock();
        if entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            entries.remove(key);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> AbortKey {
        AbortKey::new(s)
    }

    #[tokio::test]
    async fn register_then_supersede_signals_old() {
        let registry = AbortRegistry::new();

        let first = registry.register(&key("k"));
        let _second = registry.register(&key("k"));

        let reason = first.rx.await.expect("superseded signal");
        assert_eq!(reason, AbortReason::Superseded);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn cancel_signals_manual() {
        let registry = AbortRegistry::new();
        let ticket = registry.register(&key("k"));

        assert!(registry.cancel(&key("k")));

        let reason = ticket.rx.await.expect("manual signal");
        assert_eq!(reason, AbortReason::Manual);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn cancel_unregistered_is_noop() {
        let registry = AbortRegistry::new();
        assert!(!registry.cancel(&key("missing")));
    }

    #[test]
    fn complete_respects_generation() {
        let registry = AbortRegistry::new();

        let first = registry.register(&key("k"));
        let second = registry.register(&key("k"));

        // The stale first request completing must not evict the second.
        registry.complete(&key("k"), first.generation);
        assert_eq!(registry.len(), 1);

        registry.complete(&key("k"), second.generation);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn distinct_keys_are_independent() {
        let registry = AbortRegistry::new();
        let a = registry.register(&key("a"));
        let _b = registry.register(&key("b"));

        assert!(registry.cancel(&key("b")));
        assert_eq!(registry.len(), 1);

        // "a" is untouched.
        registry.complete(&key("a"), a.generation);
        assert_eq!(registry.len(), 0);
    }
}
