//! The dispatch engine.
//!
//! One FIFO queue, one committed model, one message log. The engine
//! moves between three states:
//!
//! ```text
//! Idle ──dispatch──► Draining ──queue empty──► Idle (+ one deferred notify)
//!   │                    │
//!   └──── shutdown ◄─────┘  (queue cleared, observers cleared, subs stopped)
//! ```
//!
//! A dispatch while Draining only enqueues; the active drain loop
//! picks the message up, so effect-triggered re-dispatch chains run in
//! bounded stack space. After a drain, exactly one deferred commit
//! callback is scheduled; a burst of dispatches collapses into one
//! observer notification carrying the latest state.

mod builder;
mod dispatch;
mod error;
mod metrics;

pub use builder::{EngineBuilder, NotifyMode, DEFAULT_MAX_LOG_SIZE};
pub use dispatch::{Engine, ObserverId};
pub use error::EngineError;
pub use metrics::EngineMetrics;
