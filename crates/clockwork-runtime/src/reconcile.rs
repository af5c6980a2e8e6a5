//! Subscription reconciliation.
//!
//! Runs once per notification cycle from the committed state. The key
//! string is the identity: unchanged keys keep their running instance,
//! keys only in the old list are stopped, keys only in the new list are
//! started, and the new list unconditionally replaces the active list.

use clockwork_effect::{diff_subscriptions, Dispatch, Subscription, SubscriptionRunner};
use tracing::debug;

/// Applies one reconciliation cycle.
///
/// `active` is replaced by `new_subs`; the runner receives stop calls
/// for vanished keys and start calls for appearing keys.
pub(crate) fn reconcile<M>(
    active: &mut Vec<Subscription<M>>,
    new_subs: Vec<Subscription<M>>,
    runner: &dyn SubscriptionRunner<M>,
    dispatch: &Dispatch<M>,
) {
    let diff = diff_subscriptions(active, &new_subs);
    *active = new_subs;

    for key in &diff.to_stop {
        debug!(key = %key, "stopping subscription");
        runner.stop(key);
    }
    for sub in diff.to_start {
        debug!(key = %sub.key(), kind = sub.kind(), "starting subscription");
        runner.start(sub, dispatch.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockwork_types::SubscriptionKey;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    enum Msg {
        Tick,
    }

    #[derive(Default)]
    struct FakeRunner {
        events: Mutex<Vec<String>>,
    }

    impl SubscriptionRunner<Msg> for Arc<FakeRunner> {
        fn start(&self, sub: Subscription<Msg>, _dispatch: Dispatch<Msg>) {
            self.events.lock().push(format!("start:{}", sub.key()));
        }

        fn stop(&self, key: &SubscriptionKey) {
            self.events.lock().push(format!("stop:{key}"));
        }
    }

    fn sub(key: &str) -> Subscription<Msg> {
        Subscription::every(key, Duration::from_secs(1), || Msg::Tick)
    }

    #[test]
    fn starts_new_and_stops_vanished() {
        let runner = Arc::new(FakeRunner::default());
        let dispatch = Dispatch::new(|_: Msg| {});
        let mut active = vec![sub("old"), sub("both")];

        reconcile(
            &mut active,
            vec![sub("both"), sub("new")],
            &runner,
            &dispatch,
        );

        let events = runner.events.lock().clone();
        assert!(events.contains(&"stop:old".to_string()));
        assert!(events.contains(&"start:new".to_string()));
        assert!(!events.iter().any(|e| e.ends_with(":both")));
    }

    #[test]
    fn active_list_is_replaced() {
        let runner = Arc::new(FakeRunner::default());
        let dispatch = Dispatch::new(|_: Msg| {});
        let mut active = vec![sub("a")];

        reconcile(&mut active, vec![sub("b"), sub("c")], &runner, &dispatch);

        let keys: Vec<&str> = active.iter().map(|s| s.key().as_str()).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn empty_to_empty_is_silent() {
        let runner = Arc::new(FakeRunner::default());
        let dispatch = Dispatch::new(|_: Msg| {});
        let mut active: Vec<Subscription<Msg>> = Vec::new();

        reconcile(&mut active, Vec::new(), &runner, &dispatch);

        assert!(runner.events.lock().is_empty());
    }
}
