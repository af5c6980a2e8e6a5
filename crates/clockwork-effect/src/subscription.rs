//! Keyed standing-effect declarations and their diff.
//!
//! A [`Subscription`] declares work that should keep running while some
//! state condition holds: an interval tick, a frame loop. The set of
//! active subscriptions is *derived* from the current model after each
//! commit and reconciled against the previous set by key:
//!
//! - keys only in the old set are stopped;
//! - keys only in the new set are started;
//! - unchanged keys are left running, even if their closures differ.
//!
//! Identity is the key string, not object identity, which makes the
//! diff a cheap set difference.

use clockwork_types::SubscriptionKey;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// A repeating tick at a fixed interval.
pub struct EverySubscription<M> {
    /// Identity across reconciliation cycles.
    pub key: SubscriptionKey,
    /// Tick period.
    pub interval: Duration,
    /// Builds the message dispatched on each tick.
    pub on_tick: Arc<dyn Fn() -> M + Send + Sync>,
}

impl<M> Clone for EverySubscription<M> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            interval: self.interval,
            on_tick: self.on_tick.clone(),
        }
    }
}

/// A message on every frame tick.
///
/// The closure receives the frame timestamp in milliseconds since the
/// runner's frame clock started.
pub struct FramesSubscription<M> {
    /// Identity across reconciliation cycles.
    pub key: SubscriptionKey,
    /// Builds the message dispatched on each frame.
    pub on_frame: Arc<dyn Fn(u64) -> M + Send + Sync>,
}

impl<M> Clone for FramesSubscription<M> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            on_frame: self.on_frame.clone(),
        }
    }
}

/// A keyed declaration of a standing effect.
///
/// # Example
///
/// ```
/// use clockwork_effect::Subscription;
/// use std::time::Duration;
///
/// #[derive(Clone)]
/// enum Msg { Tick }
///
/// let sub = Subscription::every("clock", Duration::from_secs(1), || Msg::Tick);
/// assert_eq!(sub.key().as_str(), "clock");
/// ```
pub enum Subscription<M> {
    /// Repeating tick at a fixed interval.
    Every(EverySubscription<M>),
    /// Message on every frame tick.
    Frames(FramesSubscription<M>),
}

impl<M> Subscription<M> {
    /// Creates an interval subscription.
    pub fn every(
        key: impl Into<SubscriptionKey>,
        interval: Duration,
        on_tick: impl Fn() -> M + Send + Sync + 'static,
    ) -> Self {
        Self::Every(EverySubscription {
            key: key.into(),
            interval,
            on_tick: Arc::new(on_tick),
        })
    }

    /// Creates a frame subscription.
    pub fn frames(
        key: impl Into<SubscriptionKey>,
        on_frame: impl Fn(u64) -> M + Send + Sync + 'static,
    ) -> Self {
        Self::Frames(FramesSubscription {
            key: key.into(),
            on_frame: Arc::new(on_frame),
        })
    }

    /// Returns the subscription's identity key.
    #[must_use]
    pub fn key(&self) -> &SubscriptionKey {
        match self {
            Self::Every(s) => &s.key,
            Self::Frames(s) => &s.key,
        }
    }

    /// Returns the variant name, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Every(_) => "every",
            Self::Frames(_) => "frames",
        }
    }

    /// Translates this subscription's messages into a parent vocabulary.
    ///
    /// The key is preserved, so a mapped subscription reconciles against
    /// its unmapped predecessor without a restart.
    #[must_use]
    pub fn map<N>(self, wrap: impl Fn(M) -> N + Send + Sync + 'static) -> Subscription<N>
    where
        M: 'static,
        N: 'static,
    {
        match self {
            Self::Every(s) => {
                let on_tick = s.on_tick;
                Subscription::Every(EverySubscription {
                    key: s.key,
                    interval: s.interval,
                    on_tick: Arc::new(move || wrap((*on_tick)())),
                })
            }
            Self::Frames(s) => {
                let on_frame = s.on_frame;
                Subscription::Frames(FramesSubscription {
                    key: s.key,
                    on_frame: Arc::new(move |ts| wrap((*on_frame)(ts))),
                })
            }
        }
    }
}

impl<M> Clone for Subscription<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Every(s) => Self::Every(s.clone()),
            Self::Frames(s) => Self::Frames(s.clone()),
        }
    }
}

impl<M> std::fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Every(s) => f
                .debug_struct("Every")
                .field("key", &s.key)
                .field("interval", &s.interval)
                .finish_non_exhaustive(),
            Self::Frames(s) => f
                .debug_struct("Frames")
                .field("key", &s.key)
                .finish_non_exhaustive(),
        }
    }
}

/// Result of diffing two subscription lists.
pub struct SubscriptionDiff<M> {
    /// Subscriptions present only in the new list.
    pub to_start: Vec<Subscription<M>>,
    /// Keys present only in the old list.
    pub to_stop: Vec<SubscriptionKey>,
}

/// Computes the start/stop instructions between two subscription lists.
///
/// Unchanged keys appear in neither output: the default policy restarts
/// only on identity change, so a hot-swapped closure under an unchanged
/// key keeps the previously started behavior.
pub fn diff_subscriptions<M>(
    old: &[Subscription<M>],
    new: &[Subscription<M>],
) -> SubscriptionDiff<M> {
    let old_keys: HashSet<&SubscriptionKey> = old.iter().map(Subscription::key).collect();
    let new_keys: HashSet<&SubscriptionKey> = new.iter().map(Subscription::key).collect();

    let to_start = new
        .iter()
        .filter(|s| !old_keys.contains(s.key()))
        .cloned()
        .collect();
    let to_stop = old
        .iter()
        .filter(|s| !new_keys.contains(s.key()))
        .map(|s| s.key().clone())
        .collect();

    SubscriptionDiff { to_start, to_stop }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Msg {
        Tick,
        Frame(u64),
    }

    fn every(key: &str) -> Subscription<Msg> {
        Subscription::every(key, Duration::from_secs(1), || Msg::Tick)
    }

    #[test]
    fn diff_empty_to_some_starts_all() {
        let diff = diff_subscriptions(&[], &[every("a"), every("b")]);
        assert_eq!(diff.to_start.len(), 2);
        assert!(diff.to_stop.is_empty());
    }

    #[test]
    fn diff_some_to_empty_stops_all() {
        let diff = diff_subscriptions(&[every("a"), every("b")], &[]);
        assert!(diff.to_start.is_empty());
        assert_eq!(
            diff.to_stop,
            vec![SubscriptionKey::new("a"), SubscriptionKey::new("b")]
        );
    }

    #[test]
    fn unchanged_key_is_not_restarted() {
        let old = [every("keep"), every("drop")];
        let new = [every("keep"), every("add")];

        let diff = diff_subscriptions(&old, &new);

        let started: Vec<&str> = diff.to_start.iter().map(|s| s.key().as_str()).collect();
        assert_eq!(started, vec!["add"]);
        assert_eq!(diff.to_stop, vec![SubscriptionKey::new("drop")]);
    }

    #[test]
    fn unchanged_key_with_different_closure_is_not_restarted() {
        let old = [every("k")];
        let new = [Subscription::every("k", Duration::from_millis(10), || {
            Msg::Frame(0)
        })];

        let diff = diff_subscriptions(&old, &new);
        assert!(diff.to_start.is_empty());
        assert!(diff.to_stop.is_empty());
    }

    #[test]
    fn map_preserves_key() {
        #[derive(Debug, PartialEq)]
        enum Parent {
            Inner(Msg),
        }

        let sub = every("clock").map(Parent::Inner);
        assert_eq!(sub.key().as_str(), "clock");

        let Subscription::Every(s) = sub else {
            panic!("expected interval subscription");
        };
        assert_eq!((*s.on_tick)(), Parent::Inner(Msg::Tick));
    }

    #[test]
    fn frames_carry_timestamp() {
        let sub = Subscription::frames("f", Msg::Frame);
        let Subscription::Frames(s) = sub else {
            panic!("expected frames subscription");
        };
        assert_eq!((*s.on_frame)(16), Msg::Frame(16));
    }
}
