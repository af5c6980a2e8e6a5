//! Engine configuration.

use super::dispatch::{Core, Engine, Shared};
use super::metrics::MetricCells;
use clockwork_effect::{EffectRunner, SubscriptionRunner};
use clockwork_program::{
    MsgLogEntry, Program, RandomProvider, ThreadRandom, TimeProvider, WallClock,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

/// Default message log capacity.
pub const DEFAULT_MAX_LOG_SIZE: usize = 10_000;

/// How the post-drain notification cycle is scheduled.
///
/// The required property is coalesce-don't-duplicate with
/// at-least-the-final-state delivery; the mode only picks the
/// scheduling vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyMode {
    /// Spawn the cycle onto the current tokio runtime, "after the
    /// current synchronous work" (default).
    #[default]
    Deferred,

    /// Leave the cycle pending until the host calls
    /// [`Engine::flush`](super::Engine::flush). For fully synchronous
    /// hosts and deterministic tests.
    Manual,
}

/// Builder for [`Engine`].
///
/// # Example
///
/// ```no_run
/// use clockwork_runtime::{Engine, NotifyMode};
/// use clockwork_effect::DiscardRunner;
/// # use clockwork_program::{Program, UpdateContext, UpdateResult};
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// # struct Model;
/// # #[derive(Debug, Clone, Serialize, Deserialize)]
/// # enum Msg {}
/// # struct App;
/// # impl Program for App {
/// #     type Model = Model;
/// #     type Msg = Msg;
/// #     fn update(&self, m: &Model, _: &Msg, _: &mut UpdateContext<'_>) -> UpdateResult<Model, Msg> {
/// #         UpdateResult::new(m.clone())
/// #     }
/// # }
///
/// let engine = Engine::builder(App, Model, DiscardRunner)
///     .consistency_checks(true)
///     .max_log_size(1_000)
///     .notify_mode(NotifyMode::Manual)
///     .build();
/// ```
pub struct EngineBuilder<P: Program> {
    program: P,
    model: P::Model,
    runner: Box<dyn EffectRunner<P::Msg>>,
    sub_runner: Option<Box<dyn SubscriptionRunner<P::Msg>>>,
    commit_hook: Option<Box<dyn Fn(Arc<P::Model>) + Send + Sync>>,
    time: Box<dyn TimeProvider>,
    rng: Box<dyn RandomProvider>,
    check_mode: bool,
    max_log_size: usize,
    initial_log: Vec<MsgLogEntry<P::Msg>>,
    replay_base: Option<P::Model>,
    notify_mode: NotifyMode,
}

impl<P: Program> Engine<P> {
    /// Starts building an engine from a program, its initial model, and
    /// an effect runner.
    pub fn builder(
        program: P,
        model: P::Model,
        runner: impl EffectRunner<P::Msg> + 'static,
    ) -> EngineBuilder<P> {
        EngineBuilder {
            program,
            model,
            runner: Box::new(runner),
            sub_runner: None,
            commit_hook: None,
            time: Box::new(WallClock),
            rng: Box::new(ThreadRandom),
            check_mode: false,
            max_log_size: DEFAULT_MAX_LOG_SIZE,
            initial_log: Vec::new(),
            replay_base: None,
            notify_mode: NotifyMode::default(),
        }
    }
}

impl<P: Program> EngineBuilder<P> {
    /// Sets the runner for standing subscriptions.
    ///
    /// Without one, `Program::subscriptions` is never consulted.
    #[must_use]
    pub fn subscription_runner(mut self, runner: impl SubscriptionRunner<P::Msg> + 'static) -> Self {
        self.sub_runner = Some(Box::new(runner));
        self
    }

    /// Sets the commit hook, invoked with the latest committed snapshot
    /// once per notification cycle, before observers.
    #[must_use]
    pub fn on_commit(mut self, hook: impl Fn(Arc<P::Model>) + Send + Sync + 'static) -> Self {
        self.commit_hook = Some(Box::new(hook));
        self
    }

    /// Enables consistency-check mode: invariant assertions plus the
    /// canonical round-trip check on every freshly produced model.
    #[must_use]
    pub fn consistency_checks(mut self, enabled: bool) -> Self {
        self.check_mode = enabled;
        self
    }

    /// Substitutes the wall clock (tests).
    #[must_use]
    pub fn time_provider(mut self, time: impl TimeProvider + 'static) -> Self {
        self.time = Box::new(time);
        self
    }

    /// Substitutes the randomness source (tests).
    #[must_use]
    pub fn random_provider(mut self, rng: impl RandomProvider + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Caps the message log; the oldest entry is evicted beyond this.
    ///
    /// Eviction breaks exact replay from genesis, not from a retained
    /// snapshot.
    #[must_use]
    pub fn max_log_size(mut self, max: usize) -> Self {
        self.max_log_size = max;
        self
    }

    /// Seeds the log with entries from a previous session.
    ///
    /// Pair with [`replay_base`](Self::replay_base) pointing at the
    /// genesis model those entries started from, so determinism
    /// verification spans the whole log.
    #[must_use]
    pub fn initial_log(mut self, log: Vec<MsgLogEntry<P::Msg>>) -> Self {
        self.initial_log = log;
        self
    }

    /// Sets the model the log is replayed from in determinism checks.
    ///
    /// Defaults to the initial model, which is correct whenever the
    /// engine starts with an empty log.
    #[must_use]
    pub fn replay_base(mut self, model: P::Model) -> Self {
        self.replay_base = Some(model);
        self
    }

    /// Picks the notification scheduling vehicle.
    #[must_use]
    pub fn notify_mode(mut self, mode: NotifyMode) -> Self {
        self.notify_mode = mode;
        self
    }

    /// Builds the engine and starts the initial subscription set.
    #[must_use]
    pub fn build(self) -> Engine<P> {
        let model = Arc::new(self.model);
        let replay_base = match self.replay_base {
            Some(base) => Arc::new(base),
            None => model.clone(),
        };

        let shared = Arc::new(Shared {
            program: self.program,
            runner: self.runner,
            sub_runner: self.sub_runner,
            commit_hook: self.commit_hook,
            core: Mutex::new(Core {
                model: model.clone(),
                replay_base,
                log: VecDeque::from(self.initial_log),
                evicted: 0,
            }),
            queue: Mutex::new(VecDeque::new()),
            observers: Mutex::new(HashMap::new()),
            next_observer: AtomicU64::new(0),
            active_subs: Mutex::new(Vec::new()),
            time: Mutex::new(self.time),
            rng: Mutex::new(self.rng),
            draining: AtomicBool::new(false),
            notify_pending: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            check_mode: self.check_mode,
            max_log_size: self.max_log_size,
            notify_mode: self.notify_mode,
            metrics: MetricCells::default(),
        });

        let engine = Engine::from_shared(shared);
        // Subscriptions derived from the initial model start immediately,
        // before any message is processed.
        engine.reconcile_subscriptions(&model);
        engine
    }
}
