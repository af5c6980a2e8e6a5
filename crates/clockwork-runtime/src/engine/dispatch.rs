//! Engine core: queue, drain loop, commit, notification.

use super::builder::NotifyMode;
use super::error::EngineError;
use super::metrics::{EngineMetrics, MetricCells};
use crate::reconcile;
use crate::replay::{divergence_summary, replay, DeterminismResult};
use crate::session::ReplayableState;
use clockwork_effect::{Dispatch, EffectRunner, Subscription, SubscriptionRunner};
use clockwork_program::{
    MsgLogEntry, Program, RandomProvider, TimeProvider, UpdateContext, UpdateResult,
};
use clockwork_types::canonical;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Handle returned by [`Engine::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer<M> = Arc<dyn Fn(Arc<M>) + Send + Sync>;

/// Mutable state owned by the drain loop.
pub(crate) struct Core<P: Program> {
    pub(crate) model: Arc<P::Model>,
    pub(crate) replay_base: Arc<P::Model>,
    pub(crate) log: VecDeque<MsgLogEntry<P::Msg>>,
    pub(crate) evicted: u64,
}

pub(crate) struct Shared<P: Program> {
    pub(crate) program: P,
    pub(crate) runner: Box<dyn EffectRunner<P::Msg>>,
    pub(crate) sub_runner: Option<Box<dyn SubscriptionRunner<P::Msg>>>,
    pub(crate) commit_hook: Option<Box<dyn Fn(Arc<P::Model>) + Send + Sync>>,
    pub(crate) core: Mutex<Core<P>>,
    pub(crate) queue: Mutex<VecDeque<P::Msg>>,
    pub(crate) observers: Mutex<HashMap<u64, Observer<P::Model>>>,
    pub(crate) next_observer: AtomicU64,
    pub(crate) active_subs: Mutex<Vec<Subscription<P::Msg>>>,
    pub(crate) time: Mutex<Box<dyn TimeProvider>>,
    pub(crate) rng: Mutex<Box<dyn RandomProvider>>,
    pub(crate) draining: AtomicBool,
    pub(crate) notify_pending: AtomicBool,
    pub(crate) shutdown: AtomicBool,
    pub(crate) check_mode: bool,
    pub(crate) max_log_size: usize,
    pub(crate) notify_mode: NotifyMode,
    pub(crate) metrics: MetricCells,
}

/// The dispatch engine.
///
/// Owns the committed model, the pending-message queue, and the message
/// log; drives update calls, log writes, effect handoff, and batched
/// observer notification. Cheap to clone; clones share one engine.
///
/// # Ordering Guarantees
///
/// - Messages are processed strictly in dispatch order (FIFO).
/// - A dispatch during a drain (including synchronously from an effect
///   callback) only enqueues; it is never processed via a nested call,
///   so host call-stack depth stays constant regardless of re-dispatch
///   chain length.
/// - Effects from one update invocation are handed to the runner in the
///   order returned. Completion order is unspecified.
///
/// # Failure Semantics
///
/// An error from an invariant assertion or the canonical round-trip
/// check (consistency-check mode) propagates out of
/// [`dispatch`](Self::dispatch) and aborts the current drain; remaining
/// messages stay queued. Post-shutdown dispatches are silently dropped.
pub struct Engine<P: Program> {
    pub(crate) shared: Arc<Shared<P>>,
}

impl<P: Program> Clone for Engine<P> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<P: Program> Engine<P> {
    pub(crate) fn from_shared(shared: Arc<Shared<P>>) -> Self {
        Self { shared }
    }

    /// Appends a message to the queue and drains if idle.
    ///
    /// Synchronous: when this returns `Ok`, the message, and every
    /// message transitively enqueued while draining, has been
    /// processed, unless another drain was already active (then the
    /// active drain processes it before returning).
    ///
    /// # Errors
    ///
    /// Consistency-check failures (invariant violation, non-canonical
    /// state) abort the drain and surface here.
    pub fn dispatch(&self, msg: P::Msg) -> Result<(), EngineError> {
        if self.shared.shutdown.load(Ordering::Acquire) {
            debug!("dispatch after shutdown dropped");
            return Ok(());
        }

        {
            let mut queue = self.shared.queue.lock();
            queue.push_back(msg);
            self.shared.metrics.note_queue_len(queue.len());
        }

        self.drain()
    }

    /// Returns a cloneable handle that feeds messages back into this
    /// engine's queue.
    ///
    /// The handle holds only a weak reference: once the last engine
    /// clone drops, sends become no-ops. Errors raised by a handle
    /// dispatch are logged, not propagated; there is no caller to
    /// surface them to.
    #[must_use]
    pub fn dispatch_handle(&self) -> Dispatch<P::Msg> {
        let weak: Weak<Shared<P>> = Arc::downgrade(&self.shared);
        Dispatch::new(move |msg| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let engine = Engine::from_shared(shared);
            if let Err(err) = engine.dispatch(msg) {
                error!(error = %err, "dispatch from effect callback failed");
            }
        })
    }

    fn drain(&self) -> Result<(), EngineError> {
        loop {
            if self.shared.draining.swap(true, Ordering::AcqRel) {
                // Another drain is active; it will process the queued
                // message before returning to idle.
                return Ok(());
            }

            let result = self.run_queue();
            self.shared.draining.store(false, Ordering::Release);
            result?;

            if self.shared.queue.lock().is_empty() {
                break;
            }
            // A message slipped in between emptying the queue and
            // releasing the flag; reclaim the drain.
        }

        self.schedule_notify();
        Ok(())
    }

    fn run_queue(&self) -> Result<(), EngineError> {
        loop {
            let msg = self.shared.queue.lock().pop_front();
            let Some(msg) = msg else {
                return Ok(());
            };
            self.step(msg)?;
        }
    }

    /// Processes one message to completion: update, log write, checks,
    /// commit, effect handoff.
    fn step(&self, msg: P::Msg) -> Result<(), EngineError> {
        let started = Instant::now();
        let ts = self.shared.time.lock().now_ms();

        let model = self.shared.core.lock().model.clone();
        let (next, effects, entropy) = {
            let mut rng = self.shared.rng.lock();
            let mut ctx = UpdateContext::live(ts, &mut **rng);
            let UpdateResult {
                model: next,
                effects,
            } = self.shared.program.update(&model, &msg, &mut ctx);
            (next, effects, ctx.into_entropy())
        };

        {
            let mut core = self.shared.core.lock();
            core.log.push_back(MsgLogEntry::new(msg, ts).with_entropy(entropy));
            if core.log.len() > self.shared.max_log_size {
                core.log.pop_front();
                core.evicted += 1;
            }
        }

        if self.shared.check_mode {
            self.shared.program.assert_invariants(&next)?;
            self.check_canonical(&next)?;
        }

        self.shared.core.lock().model = Arc::new(next);
        self.shared.metrics.record_update(started.elapsed());

        let dispatch = self.dispatch_handle();
        for effect in effects {
            debug!(kind = effect.kind(), "effect handoff");
            self.shared.runner.run(effect, dispatch.clone());
        }

        Ok(())
    }

    /// Verifies that a freshly produced model survives a canonical
    /// serialization round-trip unchanged.
    ///
    /// Committed snapshots are immutable by type (`Arc`), so the
    /// remaining corruption risk is representational: a model whose
    /// serde form drops or reshapes data would commit one state and
    /// persist another. Catch it here, before the commit.
    fn check_canonical(&self, next: &P::Model) -> Result<(), EngineError> {
        let text = canonical::to_canonical_string(next)?;
        let back: P::Model = serde_json::from_str(&text)?;
        if back != *next {
            let round_tripped = canonical::to_canonical_string(&back)?;
            let detail = if text == round_tripped {
                "round-tripped value differs from the committed value while serializing \
                 identically; part of the state is invisible to its serde representation"
                    .to_string()
            } else {
                divergence_summary(&text, &round_tripped)
            };
            return Err(EngineError::NotCanonical { detail });
        }
        Ok(())
    }

    fn schedule_notify(&self) {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return;
        }
        if self.shared.notify_pending.swap(true, Ordering::AcqRel) {
            // A cycle is already pending; this burst coalesces into it.
            self.shared.metrics.record_coalesced();
            return;
        }

        match self.shared.notify_mode {
            NotifyMode::Manual => {}
            NotifyMode::Deferred => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let weak = Arc::downgrade(&self.shared);
                    handle.spawn(async move {
                        if let Some(shared) = weak.upgrade() {
                            Engine::from_shared(shared).flush();
                        }
                    });
                }
                Err(_) => {
                    warn!(
                        "deferred notification requires a tokio runtime; \
                         call flush() explicitly or use NotifyMode::Manual"
                    );
                }
            },
        }
    }

    /// Delivers the pending notification cycle, if any.
    ///
    /// One cycle: commit hook, observers (latest snapshot only), then
    /// subscription reconciliation from the committed state. A no-op
    /// when nothing is pending, so hosts in manual mode can call it
    /// unconditionally.
    pub fn flush(&self) {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return;
        }
        if !self.shared.notify_pending.swap(false, Ordering::AcqRel) {
            return;
        }

        let snapshot = self.shared.core.lock().model.clone();

        if let Some(hook) = &self.shared.commit_hook {
            hook(snapshot.clone());
        }

        let observers: Vec<Observer<P::Model>> =
            self.shared.observers.lock().values().cloned().collect();
        for observer in observers {
            (*observer)(snapshot.clone());
        }
        self.shared.metrics.record_notification();

        self.reconcile_subscriptions(&snapshot);
    }

    pub(crate) fn reconcile_subscriptions(&self, model: &Arc<P::Model>) {
        let Some(runner) = &self.shared.sub_runner else {
            return;
        };
        let new_subs = self.shared.program.subscriptions(model);
        let dispatch = self.dispatch_handle();
        let mut active = self.shared.active_subs.lock();
        reconcile::reconcile(&mut active, new_subs, runner.as_ref(), &dispatch);
    }

    /// Returns the latest committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<P::Model> {
        self.shared.core.lock().model.clone()
    }

    /// Registers an observer called once per notification cycle with
    /// the latest committed snapshot.
    pub fn subscribe(
        &self,
        observer: impl Fn(Arc<P::Model>) + Send + Sync + 'static,
    ) -> ObserverId {
        let id = self.shared.next_observer.fetch_add(1, Ordering::Relaxed);
        self.shared
            .observers
            .lock()
            .insert(id, Arc::new(observer));
        ObserverId(id)
    }

    /// Removes an observer; no-op if already removed.
    pub fn unsubscribe(&self, id: ObserverId) {
        self.shared.observers.lock().remove(&id.0);
    }

    /// Returns a copy of the message log.
    #[must_use]
    pub fn msg_log(&self) -> Vec<MsgLogEntry<P::Msg>> {
        self.shared.core.lock().log.iter().cloned().collect()
    }

    /// Returns the log and snapshot as one atomic pair.
    ///
    /// Both are read under a single lock, so the snapshot is exactly
    /// the state the log produces.
    #[must_use]
    pub fn replayable_state(&self) -> ReplayableState<P> {
        let core = self.shared.core.lock();
        ReplayableState {
            log: core.log.iter().cloned().collect(),
            snapshot: core.model.clone(),
        }
    }

    /// Replays the full log from the replay base and compares the
    /// result with the live state by canonical equality.
    ///
    /// Divergence is reported in the result, never raised: it is a
    /// diagnostic that non-determinism leaked outside the update
    /// context, or that the log no longer starts at the replay base
    /// (see `genesis_intact`).
    ///
    /// # Errors
    ///
    /// Only serialization failures surface as errors.
    pub fn verify_determinism(&self) -> Result<DeterminismResult, EngineError> {
        let (base, log, current, evicted) = {
            let core = self.shared.core.lock();
            (
                (*core.replay_base).clone(),
                core.log.iter().cloned().collect::<Vec<_>>(),
                core.model.clone(),
                core.evicted,
            )
        };

        let replayed = replay(&self.shared.program, base, &log);
        let live_text = canonical::to_canonical_string(&*current)?;
        let replayed_text = canonical::to_canonical_string(&replayed)?;
        let matched = live_text == replayed_text;

        Ok(DeterminismResult {
            matched,
            entries_checked: log.len(),
            genesis_intact: evicted == 0,
            divergence: (!matched).then(|| divergence_summary(&replayed_text, &live_text)),
        })
    }

    /// Returns current diagnostic counters.
    #[must_use]
    pub fn metrics(&self) -> EngineMetrics {
        let (log_len, evicted) = {
            let core = self.shared.core.lock();
            (core.log.len(), core.evicted)
        };
        self.shared.metrics.snapshot(log_len, evicted)
    }

    /// Stops the engine: clears the queue and observers, stops active
    /// subscriptions. Idempotent; subsequent dispatches are silently
    /// dropped.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        self.shared.queue.lock().clear();
        self.shared.observers.lock().clear();

        if let Some(runner) = &self.shared.sub_runner {
            for sub in self.shared.active_subs.lock().drain(..) {
                runner.stop(sub.key());
            }
        }

        info!("engine shut down");
    }
}
