//! The seam between the engine and the execution side.
//!
//! The engine never executes an effect itself: it hands each one, in
//! order, to an [`EffectRunner`] together with a [`Dispatch`] handle
//! that feeds resulting messages back into the engine's FIFO queue.
//! Standing effects go through a [`SubscriptionRunner`], keyed so the
//! reconciler can stop them individually.
//!
//! Runners must tolerate being called synchronously during a drain: a
//! runner that dispatches from inside `run` only enqueues; the message
//! is processed by the already-active drain loop, never via a nested
//! call.

use crate::effect::Effect;
use crate::subscription::Subscription;
use clockwork_types::SubscriptionKey;
use std::sync::Arc;

/// Handle for feeding messages back into a dispatch queue.
///
/// Cloneable and thread-safe; the execution service moves clones into
/// its spawned tasks. Dispatching after engine shutdown is a silent
/// no-op.
pub struct Dispatch<M> {
    send: Arc<dyn Fn(M) + Send + Sync>,
}

impl<M> Dispatch<M> {
    /// Wraps a dispatch function.
    pub fn new(send: impl Fn(M) + Send + Sync + 'static) -> Self {
        Self {
            send: Arc::new(send),
        }
    }

    /// Sends one message.
    pub fn send(&self, msg: M) {
        (*self.send)(msg);
    }
}

impl<M> Clone for Dispatch<M> {
    fn clone(&self) -> Self {
        Self {
            send: self.send.clone(),
        }
    }
}

impl<M> std::fmt::Debug for Dispatch<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch").finish_non_exhaustive()
    }
}

/// Executes one-shot effects against real resources.
///
/// Implementations never hold application state; everything they need
/// is in the effect description and the dispatch handle.
pub trait EffectRunner<M>: Send + Sync {
    /// Takes ownership of one effect and starts it.
    ///
    /// Must not block: long-running work is spawned, and resulting
    /// messages are delivered through `dispatch` whenever they arrive.
    fn run(&self, effect: Effect<M>, dispatch: Dispatch<M>);
}

/// Starts and stops standing effects by key.
pub trait SubscriptionRunner<M>: Send + Sync {
    /// Starts a subscription. If one is already running under the same
    /// key it is stopped first.
    fn start(&self, sub: Subscription<M>, dispatch: Dispatch<M>);

    /// Stops the subscription under the key; no-op if none is running.
    fn stop(&self, key: &SubscriptionKey);
}

// Plain functions are runners; tests and small hosts use closures
// directly instead of defining a struct.
impl<M, F> EffectRunner<M> for F
where
    F: Fn(Effect<M>, Dispatch<M>) + Send + Sync,
{
    fn run(&self, effect: Effect<M>, dispatch: Dispatch<M>) {
        self(effect, dispatch);
    }
}

/// A runner that drops every effect.
///
/// Useful for programs whose updates are pure state transitions, and in
/// tests that only exercise dispatch ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardRunner;

impl<M> EffectRunner<M> for DiscardRunner {
    fn run(&self, effect: Effect<M>, _dispatch: Dispatch<M>) {
        tracing::debug!(kind = effect.kind(), "discarding effect");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Msg {
        Ping,
    }

    #[test]
    fn dispatch_sends() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let dispatch = Dispatch::new(move |msg: Msg| sink.lock().unwrap().push(msg));

        dispatch.send(Msg::Ping);
        dispatch.clone().send(Msg::Ping);

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn closures_are_runners() {
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let sink = kinds.clone();
        let runner = move |effect: Effect<Msg>, _dispatch: Dispatch<Msg>| {
            sink.lock().unwrap().push(effect.kind());
        };

        runner.run(
            Effect::delay(Duration::from_millis(1), || Msg::Ping),
            Dispatch::new(|_| {}),
        );
        runner.run(Effect::cancel("k"), Dispatch::new(|_| {}));

        assert_eq!(*kinds.lock().unwrap(), vec!["delay", "cancel"]);
    }

    #[test]
    fn discard_runner_drops_silently() {
        let runner = DiscardRunner;
        runner.run(
            Effect::<Msg>::delay(Duration::from_millis(1), || Msg::Ping),
            Dispatch::new(|_| {}),
        );
    }
}
