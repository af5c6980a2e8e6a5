//! Message log entry shape.
//!
//! One entry per processed message. The entry is the unit of replay and
//! of persistence: `{msg, ts_ms, entropy?}` round-trips through the
//! canonical serialization, and the stored entropy substitutes for the
//! live clock/RNG when the log is folded back over the update function.

use serde::{Deserialize, Serialize};

/// Non-deterministic values captured at point of use during one step.
///
/// Only randomness needs an explicit list: the step's single wall-clock
/// capture lives in the entry's `ts_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entropy {
    /// Random draws, in the order the update function requested them.
    pub random: Vec<f64>,
}

/// One processed message with its captured non-determinism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "M: Serialize", deserialize = "M: Deserialize<'de>"))]
pub struct MsgLogEntry<M> {
    /// The message, exactly as dispatched.
    pub msg: M,
    /// The step's wall-clock capture, Unix milliseconds.
    pub ts_ms: i64,
    /// Recorded random draws; omitted when the step drew none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropy: Option<Entropy>,
}

impl<M> MsgLogEntry<M> {
    /// Creates an entry with no recorded entropy.
    #[must_use]
    pub fn new(msg: M, ts_ms: i64) -> Self {
        Self {
            msg,
            ts_ms,
            entropy: None,
        }
    }

    /// Attaches recorded entropy.
    #[must_use]
    pub fn with_entropy(mut self, entropy: Option<Entropy>) -> Self {
        self.entropy = entropy;
        self
    }

    /// The entry's recorded draws, cloned for a replay context.
    #[must_use]
    pub fn draws(&self) -> Vec<f64> {
        self.entropy
            .as_ref()
            .map(|e| e.random.clone())
            .unwrap_or_default()
    }
}
