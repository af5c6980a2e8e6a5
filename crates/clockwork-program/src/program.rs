//! The [`Program`] trait and update result.

use crate::context::UpdateContext;
use clockwork_effect::{Effect, Subscription};
use clockwork_types::ErrorCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// A caller invariant failed on a freshly produced state.
///
/// Raised only in consistency-check mode; fatal: it aborts the current
/// drain rather than committing a corrupt state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violated: {0}")]
pub struct InvariantViolation(String);

impl InvariantViolation {
    /// Creates a violation with a description of the failed invariant.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl ErrorCode for InvariantViolation {
    fn code(&self) -> &'static str {
        "PROGRAM_INVARIANT"
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// The result of one update invocation: the next model and the effects
/// to hand off, in order.
///
/// Effect order is preserved through to invocation order; completion
/// order is unspecified.
///
/// # Example
///
/// ```
/// use clockwork_program::UpdateResult;
/// use clockwork_effect::Effect;
/// use std::time::Duration;
///
/// #[derive(Clone)]
/// enum Msg { Tick }
///
/// let result: UpdateResult<u32, Msg> = UpdateResult::new(7)
///     .with_effect(Effect::delay(Duration::from_secs(1), || Msg::Tick));
/// assert_eq!(result.model, 7);
/// assert_eq!(result.effects.len(), 1);
/// ```
pub struct UpdateResult<Model, M> {
    /// The next model. Always produced, even when unchanged.
    pub model: Model,
    /// Effects to hand to the runner, in invocation order.
    pub effects: Vec<Effect<M>>,
}

impl<Model, M> UpdateResult<Model, M> {
    /// Creates a result with no effects.
    #[must_use]
    pub fn new(model: Model) -> Self {
        Self {
            model,
            effects: Vec::new(),
        }
    }

    /// Appends one effect.
    #[must_use]
    pub fn with_effect(mut self, effect: Effect<M>) -> Self {
        self.effects.push(effect);
        self
    }

    /// Appends several effects, preserving order.
    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect<M>>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// An application: model, messages, and a pure update function.
///
/// # Contract
///
/// - `update` is total and synchronous; it reads exactly one prior
///   model and produces exactly one next model per call.
/// - All non-determinism goes through the [`UpdateContext`]; anything
///   else (interior mutability, ambient clocks, I/O) breaks replay.
/// - `subscriptions` derives the standing-effect set from the model
///   alone; it is called once per notification cycle.
/// - `assert_invariants` is consulted only in consistency-check mode,
///   on every freshly produced model, before it is committed.
///
/// # Example
///
/// ```
/// use clockwork_program::{Program, UpdateContext, UpdateResult};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct Counter { count: i64 }
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// enum Msg { Increment, Decrement }
///
/// struct CounterProgram;
///
/// impl Program for CounterProgram {
///     type Model = Counter;
///     type Msg = Msg;
///
///     fn update(
///         &self,
///         model: &Counter,
///         msg: &Msg,
///         _ctx: &mut UpdateContext<'_>,
///     ) -> UpdateResult<Counter, Msg> {
///         let count = match msg {
///             Msg::Increment => model.count + 1,
///             Msg::Decrement => model.count - 1,
///         };
///         UpdateResult::new(Counter { count })
///     }
/// }
/// ```
pub trait Program: Send + Sync + 'static {
    /// The application state. Serializable to a canonical textual form;
    /// committed snapshots are shared immutably.
    type Model: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// The closed message vocabulary. Serializable so the message log
    /// round-trips through persistence.
    type Msg: Clone + Serialize + DeserializeOwned + Send + 'static;

    /// Computes the next model and effects for one message.
    fn update(
        &self,
        model: &Self::Model,
        msg: &Self::Msg,
        ctx: &mut UpdateContext<'_>,
    ) -> UpdateResult<Self::Model, Self::Msg>;

    /// Derives the standing-effect set from the current model.
    ///
    /// The default is no subscriptions.
    fn subscriptions(&self, _model: &Self::Model) -> Vec<Subscription<Self::Msg>> {
        Vec::new()
    }

    /// Checks caller invariants on a freshly produced model.
    ///
    /// Called only in consistency-check mode. An `Err` aborts the
    /// current drain before the model is committed.
    fn assert_invariants(&self, _model: &Self::Model) -> Result<(), InvariantViolation> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockwork_types::assert_error_code;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Msg {
        Tick,
    }

    #[test]
    fn update_result_builders() {
        let result: UpdateResult<u8, Msg> = UpdateResult::new(1)
            .with_effect(Effect::delay(Duration::from_millis(1), || Msg::Tick))
            .with_effects([
                Effect::cancel("a"),
                Effect::delay(Duration::from_millis(2), || Msg::Tick),
            ]);

        assert_eq!(result.model, 1);
        let kinds: Vec<_> = result.effects.iter().map(Effect::kind).collect();
        assert_eq!(kinds, vec!["delay", "cancel", "delay"]);
    }

    #[test]
    fn invariant_violation_error_code() {
        let violation = InvariantViolation::new("count must be non-negative");
        assert_error_code(&violation, "PROGRAM_");
        assert!(!violation.is_recoverable());
        assert!(violation.to_string().contains("non-negative"));
    }
}
