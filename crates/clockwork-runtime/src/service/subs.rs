//! Standing-effect execution: interval ticks and the frame clock.
//!
//! Each running subscription is one spawned task, held in the service's
//! key-indexed map. Stop aborts the task; restart-on-same-key stops the
//! old instance first.

use super::{ServiceInner, TokioEffectService};
use clockwork_effect::{Dispatch, Subscription, SubscriptionRunner};
use clockwork_types::SubscriptionKey;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

fn stop_inner(inner: &Arc<ServiceInner>, key: &SubscriptionKey) {
    if let Some(task) = inner.subs.lock().remove(key) {
        task.abort();
        debug!(key = %key, "subscription stopped");
    }
}

impl<M: Send + 'static> SubscriptionRunner<M> for TokioEffectService {
    fn start(&self, sub: Subscription<M>, dispatch: Dispatch<M>) {
        let key = sub.key().clone();
        // Same-key restart: the old instance dies before the new one
        // starts, so at most one task runs per key.
        stop_inner(&self.inner, &key);
        debug!(key = %key, kind = sub.kind(), "subscription started");

        let task: JoinHandle<()> = match sub {
            Subscription::Every(sub) => self.inner.handle.spawn(async move {
                let start = tokio::time::Instant::now() + sub.interval;
                let mut ticker = tokio::time::interval_at(start, sub.interval);
                loop {
                    ticker.tick().await;
                    dispatch.send((*sub.on_tick)());
                }
            }),
            Subscription::Frames(sub) => {
                let inner = self.inner.clone();
                self.inner.handle.spawn(async move {
                    let interval = inner.frame_interval;
                    let start = tokio::time::Instant::now() + interval;
                    let mut ticker = tokio::time::interval_at(start, interval);
                    loop {
                        ticker.tick().await;
                        let ts = TokioEffectService::frame_now_ms(&inner);
                        dispatch.send((*sub.on_frame)(ts));
                    }
                })
            }
        };

        self.inner.subs.lock().insert(key, task);
    }

    fn stop(&self, key: &SubscriptionKey) {
        stop_inner(&self.inner, key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Msg {
        Tick,
        Frame(u64),
    }

    fn collector() -> (Dispatch<Msg>, Arc<Mutex<Vec<Msg>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (Dispatch::new(move |msg| sink.lock().push(msg)), seen)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn interval_ticks_repeatedly() {
        let service = TokioEffectService::new().expect("runtime");
        let (dispatch, seen) = collector();

        service.start(
            Subscription::every("t", Duration::from_millis(10), || Msg::Tick),
            dispatch,
        );
        tokio::time::sleep(Duration::from_millis(65)).await;
        SubscriptionRunner::<Msg>::stop(&service, &SubscriptionKey::new("t"));

        let count = seen.lock().len();
        assert!(count >= 3, "expected several ticks, got {count}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_halts_ticks() {
        let service = TokioEffectService::new().expect("runtime");
        let (dispatch, seen) = collector();

        service.start(
            Subscription::every("t", Duration::from_millis(10), || Msg::Tick),
            dispatch,
        );
        tokio::time::sleep(Duration::from_millis(35)).await;
        SubscriptionRunner::<Msg>::stop(&service, &SubscriptionKey::new("t"));

        let at_stop = seen.lock().len();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.lock().len(), at_stop);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_unknown_key_is_noop() {
        let service = TokioEffectService::new().expect("runtime");
        SubscriptionRunner::<Msg>::stop(&service, &SubscriptionKey::new("nothing"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn frames_carry_monotonic_timestamps() {
        let service = TokioEffectService::new().expect("runtime");
        let (dispatch, seen) = collector();

        service.start(Subscription::frames("f", Msg::Frame), dispatch);
        tokio::time::sleep(Duration::from_millis(60)).await;
        SubscriptionRunner::<Msg>::stop(&service, &SubscriptionKey::new("f"));

        let frames: Vec<u64> = seen
            .lock()
            .iter()
            .map(|m| match m {
                Msg::Frame(ts) => *ts,
                Msg::Tick => unreachable!("frames subscription sends frames"),
            })
            .collect();
        assert!(frames.len() >= 2, "expected several frames");
        assert!(frames.windows(2).all(|w| w[0] <= w[1]));
    }
}
