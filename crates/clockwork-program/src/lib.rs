//! The application-facing seam of the Clockwork runtime.
//!
//! An application is a [`Program`]: a model type, a message type, and a
//! pure update function. The runtime owns the loop; the program owns
//! the meaning.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Application                             │
//! │   impl Program: update(model, msg, ctx) → (model', effects) │
//! └─────────────────────────────────────────────────────────────┘
//!                               ▲ called once per message
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      clockwork-runtime                       │
//! │   Engine: FIFO queue, message log, replay, notification     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Determinism Contract
//!
//! `update` must be total, synchronous, and side-effect-free except
//! through the supplied [`UpdateContext`]. The context is the only door
//! to non-determinism: `now_ms()` and `random()` are intercepted and
//! recorded per processing step, so a recorded log replays to an
//! identical state without re-invoking the real clock or RNG.
//!
//! # Contents
//!
//! - [`Program`]: the update function and its optional hooks
//! - [`UpdateResult`]: next model plus ordered effects
//! - [`UpdateContext`]: recording/replaying entropy capability
//! - [`MsgLogEntry`] / [`Entropy`]: the persisted log entry shape
//! - [`TimeProvider`] / [`RandomProvider`]: pluggable entropy sources
//! - [`testing`]: harness for exercising programs without an engine

mod context;
mod log;
mod program;
mod providers;

pub mod testing;

pub use context::UpdateContext;
pub use log::{Entropy, MsgLogEntry};
pub use program::{InvariantViolation, Program, UpdateResult};
pub use providers::{
    FixedClock, RandomProvider, SeededRandom, SteppingClock, ThreadRandom, TimeProvider, WallClock,
};
