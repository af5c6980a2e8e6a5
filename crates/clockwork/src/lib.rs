//! Clockwork - a deterministic model-update-effects runtime.
//!
//! All application state lives in one immutable snapshot; all
//! transitions are triggered by discrete messages; all interaction with
//! the outside world is declared as effect data and executed by a
//! service. Every processed message is logged with its captured
//! non-determinism, so a session replays to an identical state.
//!
//! This crate re-exports the public API of the workspace:
//!
//! | Layer | Crate | Highlights |
//! |-------|-------|------------|
//! | vocabulary | `clockwork-types` | keys, ids, [`ErrorCode`], canonical JSON |
//! | vocabulary | `clockwork-effect` | [`Effect`], [`Subscription`], runner traits |
//! | vocabulary | `clockwork-program` | [`Program`], [`UpdateContext`], log entries |
//! | runtime | `clockwork-runtime` | [`Engine`], [`replay`], [`TokioEffectService`], sessions |
//!
//! # Quick Start
//!
//! ```
//! use clockwork::{
//!     DiscardRunner, Engine, NotifyMode, Program, UpdateContext, UpdateResult,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Counter { count: i64 }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! enum Msg { Increment }
//!
//! struct App;
//!
//! impl Program for App {
//!     type Model = Counter;
//!     type Msg = Msg;
//!
//!     fn update(
//!         &self,
//!         model: &Counter,
//!         _msg: &Msg,
//!         _ctx: &mut UpdateContext<'_>,
//!     ) -> UpdateResult<Counter, Msg> {
//!         UpdateResult::new(Counter { count: model.count + 1 })
//!     }
//! }
//!
//! let engine = Engine::builder(App, Counter { count: 0 }, DiscardRunner)
//!     .notify_mode(NotifyMode::Manual)
//!     .build();
//! engine.dispatch(Msg::Increment).unwrap();
//! assert_eq!(engine.snapshot().count, 1);
//! ```

pub use clockwork_effect::{
    ComputeEffect, DelayEffect, DiscardRunner, Dispatch, Effect, EffectError, EffectRunner,
    EverySubscription, ExpectBody, FrameEffect, FramesSubscription, HttpEffect, HttpMethod,
    Subscription, SubscriptionRunner,
};
pub use clockwork_program::{
    Entropy, FixedClock, InvariantViolation, MsgLogEntry, Program, RandomProvider, SeededRandom,
    SteppingClock, ThreadRandom, TimeProvider, UpdateContext, UpdateResult, WallClock,
};
pub use clockwork_runtime::{
    default_session_path, replay, resume_or_fresh, DeterminismResult, Engine, EngineBuilder,
    EngineError, EngineMetrics, LocalFileStore, NotifyMode, ObserverId, ReplayableState, Resume,
    ServiceConfig, ServiceError, SessionAsset, SessionStore, StorageError, TokioEffectService,
    DEFAULT_MAX_LOG_SIZE, SESSION_VERSION,
};
pub use clockwork_types::{
    canonical, AbortKey, ErrorCode, RequestId, SubscriptionKey, TaskId,
};

/// Test support re-exported from the program crate.
pub mod testing {
    pub use clockwork_program::testing::{ProgramHarness, RecordingRunner, DEFAULT_SEED};
}
