//! Core types for the Clockwork runtime.
//!
//! This crate is the bottom of the workspace dependency graph. It holds
//! the small, stable types every other crate agrees on:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Vocabulary Layer                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  clockwork-types   : ids, keys, ErrorCode, canonical  ◄── HERE
//! │  clockwork-effect  : Effect, Subscription, runner seam      │
//! │  clockwork-program : Program trait, UpdateContext, log      │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Runtime Layer                           │
//! │  clockwork-runtime : Engine, replay, effect service         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Contents
//!
//! - [`RequestId`], [`TaskId`]: UUID-based identifiers for in-flight
//!   effect work
//! - [`AbortKey`], [`SubscriptionKey`]: caller-chosen string identities
//!   used for supersede/cancel and subscription diffing
//! - [`ErrorCode`]: unified machine-readable error interface
//! - [`canonical`]: canonical JSON serialization used for state equality
//!   and persistence

mod error;
mod id;
mod key;

pub mod canonical;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{RequestId, TaskId};
pub use key::{AbortKey, SubscriptionKey};
