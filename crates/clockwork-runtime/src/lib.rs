//! Clockwork runtime - the engine behind the vocabulary crates.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Vocabulary Layer                         │
//! │  (stable seam, safe for applications to depend on)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  clockwork-types   : ids, keys, ErrorCode, canonical JSON   │
//! │  clockwork-effect  : Effect, Subscription, runner traits    │
//! │  clockwork-program : Program trait, UpdateContext, log      │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Runtime Layer (THIS CRATE)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  engine/   : Engine, EngineBuilder, metrics                 │
//! │  replay    : deterministic fold, DeterminismResult          │
//! │  service/  : TokioEffectService (http, compute pool, timers)│
//! │  session/  : SessionAsset, SessionStore, LocalFileStore     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Execution Model
//!
//! The [`Engine`](engine::Engine) is cooperative: one FIFO queue, at
//! most one update invocation in flight, every message processed to
//! completion (state transition, log write, effect handoff) before the
//! next is popped. Re-entrant dispatches (effect callbacks firing during
//! a drain) only enqueue; the active drain loop picks them up,
//! so call-stack depth stays constant however long the re-dispatch
//! chain grows.
//!
//! True concurrency lives only in the
//! [`TokioEffectService`](service::TokioEffectService): HTTP requests
//! and pooled computation units run in parallel, bounded per target,
//! and their resulting messages re-enter the same FIFO queue. State
//! correctness therefore depends only on dispatch order, which the
//! message log records and [`replay`](replay::replay) reproduces.
//!
//! # Modules
//!
//! ## [`engine`] - Dispatch Engine
//!
//! - [`Engine`](engine::Engine): queue, message log, batched
//!   notification, subscription reconciliation
//! - [`EngineBuilder`](engine::EngineBuilder): configuration
//! - [`EngineMetrics`](engine::EngineMetrics): diagnostics
//!
//! ## [`replay`] - Deterministic Replay
//!
//! - [`replay`](replay::replay): pure fold of a program over a log
//! - [`DeterminismResult`](replay::DeterminismResult): live-vs-replayed
//!   comparison
//!
//! ## [`service`] - Effect Execution
//!
//! - [`TokioEffectService`](service::TokioEffectService): interprets
//!   the closed effect vocabulary against real resources with
//!   cancellation, pooling, and bounded concurrency
//!
//! ## [`session`] - Persistence Glue
//!
//! - [`SessionAsset`](session::SessionAsset): versioned `{log, snapshot}`
//! - [`LocalFileStore`](session::LocalFileStore): atomic JSON files
//! - [`resume_or_fresh`](session::resume_or_fresh): replay-or-discard
//!   restore

pub mod engine;
pub mod replay;
pub mod service;
pub mod session;

mod reconcile;

pub use engine::{
    Engine, EngineBuilder, EngineError, EngineMetrics, NotifyMode, ObserverId,
    DEFAULT_MAX_LOG_SIZE,
};
pub use replay::{replay, DeterminismResult};
pub use service::{ServiceConfig, ServiceError, TokioEffectService};
pub use session::{
    default_session_path, resume_or_fresh, LocalFileStore, ReplayableState, Resume, SessionAsset,
    SessionStore, StorageError, SESSION_VERSION,
};

// Re-export the seam types applications wire together.
pub use clockwork_effect::{
    DiscardRunner, Dispatch, Effect, EffectError, EffectRunner, Subscription, SubscriptionRunner,
};
pub use clockwork_program::{Program, UpdateContext, UpdateResult};
