//! Effect and subscription vocabulary for Clockwork.
//!
//! Side effects in Clockwork are *data*. The update function never
//! touches a socket or a clock; it returns [`Effect`] values describing
//! what should happen, and the runtime hands them to an
//! [`EffectRunner`] for execution. Standing work (an interval tick, a
//! frame loop) is declared with [`Subscription`] values derived from the
//! current state and reconciled by key.
//!
//! # Message Flow
//!
//! ```text
//! update(model, msg, ctx) ──► (next model, [Effect])
//!                                            │ handoff, in order
//!                                            ▼
//!                                    ┌───────────────┐
//!                                    │ EffectRunner  │──► real resources
//!                                    └───────────────┘
//!                                            │ Dispatch
//!                                            ▼
//!                                    resulting messages re-enter
//!                                    the engine's FIFO queue
//! ```
//!
//! # Closed Vocabulary
//!
//! [`Effect`] is a closed sum type. Every consumption site matches
//! exhaustively, so adding a variant is a compile-time-visible change at
//! each runner. The variants:
//!
//! | Variant | Action | Outcome |
//! |---------|--------|---------|
//! | [`Effect::Http`] | network request | success/error message, or silent drop on cancel |
//! | [`Effect::Cancel`] | abort request under a key | none (no-op if unregistered) |
//! | [`Effect::Delay`] | one-shot timer | one message |
//! | [`Effect::Frame`] | next frame tick | one message |
//! | [`Effect::Compute`] | pooled offloaded computation | success/error message |
//!
//! # Composition
//!
//! A composite component embeds a child's effect unmodified and
//! translates its messages with [`Effect::map`]; the same applies to
//! [`Subscription::map`]. The translation composes into the outcome
//! mappings, so the execution side needs no knowledge of the nesting.
//!
//! # Errors
//!
//! Effect failures are never thrown: they arrive as ordinary messages
//! built by the caller-supplied error mapping from an [`EffectError`]
//! payload.

mod effect;
mod error;
mod runner;
mod subscription;

pub use effect::{
    ComputeEffect, DelayEffect, Effect, ErrorMapper, ExpectBody, FrameEffect, HttpEffect,
    HttpMethod, SuccessMapper,
};
pub use error::EffectError;
pub use runner::{DiscardRunner, Dispatch, EffectRunner, SubscriptionRunner};
pub use subscription::{
    diff_subscriptions, EverySubscription, FramesSubscription, Subscription, SubscriptionDiff,
};

// Re-export the key types effects are addressed by.
pub use clockwork_types::{AbortKey, RequestId, SubscriptionKey, TaskId};
