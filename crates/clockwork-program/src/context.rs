//! The per-step entropy capability.
//!
//! Every processing step builds one [`UpdateContext`]. In live mode the
//! context draws from real providers and records every value; the
//! recorded draws land in the step's log entry. In replay mode the
//! context serves the recorded values back in order, so the update
//! function observes the exact clock and RNG readings of the original
//! run without touching either.

use crate::log::Entropy;
use crate::providers::RandomProvider;
use std::collections::VecDeque;

enum Mode<'a> {
    /// Draw from the real provider, recording each value.
    Live {
        rng: &'a mut dyn RandomProvider,
        recorded: Vec<f64>,
    },
    /// Serve recorded draws in order; fall back to a live source only
    /// on exhaustion (a log/update mismatch).
    Replay {
        draws: VecDeque<f64>,
        fallback_draws: u32,
    },
}

/// Capability handed to the update function for one processing step.
///
/// Exposes the wall clock and randomness in a form the replay engine
/// can reproduce exactly: the timestamp is captured once per step, and
/// every random draw is recorded.
///
/// # Example
///
/// ```
/// use clockwork_program::{SeededRandom, RandomProvider, UpdateContext};
///
/// let mut rng = SeededRandom::new(7);
/// let mut ctx = UpdateContext::live(1_000, &mut rng);
///
/// let t = ctx.now_ms();
/// let r = ctx.random();
/// assert_eq!(t, 1_000);
///
/// let entropy = ctx.into_entropy().expect("one draw was recorded");
/// assert_eq!(entropy.random, vec![r]);
/// ```
pub struct UpdateContext<'a> {
    ts_ms: i64,
    mode: Mode<'a>,
}

impl<'a> UpdateContext<'a> {
    /// Creates a live context for one step.
    ///
    /// `ts_ms` is the step's single wall-clock capture; every call to
    /// [`now_ms`](Self::now_ms) within the step returns the same value.
    pub fn live(ts_ms: i64, rng: &'a mut dyn RandomProvider) -> Self {
        Self {
            ts_ms,
            mode: Mode::Live {
                rng,
                recorded: Vec::new(),
            },
        }
    }

    /// Creates a replay context serving a log entry's recorded draws.
    #[must_use]
    pub fn replay(ts_ms: i64, draws: Vec<f64>) -> UpdateContext<'static> {
        UpdateContext {
            ts_ms,
            mode: Mode::Replay {
                draws: draws.into(),
                fallback_draws: 0,
            },
        }
    }

    /// Returns the step's timestamp in Unix milliseconds.
    ///
    /// Stable within a step: one capture per message, however many
    /// times it is read.
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        self.ts_ms
    }

    /// Returns a random value in `[0, 1)`.
    ///
    /// Live: draws from the provider and records the value. Replay:
    /// consumes the next recorded value; if the log holds fewer draws
    /// than the update requests, a live fallback value is produced and
    /// a warning logged; the replayed state can then diverge.
    pub fn random(&mut self) -> f64 {
        match &mut self.mode {
            Mode::Live { rng, recorded } => {
                let value = rng.random();
                recorded.push(value);
                value
            }
            Mode::Replay {
                draws,
                fallback_draws,
            } => match draws.pop_front() {
                Some(value) => value,
                None => {
                    *fallback_draws += 1;
                    if *fallback_draws == 1 {
                        tracing::warn!(
                            ts_ms = self.ts_ms,
                            "replay exhausted recorded entropy; update draws more \
                             randomness than the log recorded"
                        );
                    }
                    rand::random::<f64>()
                }
            },
        }
    }

    /// Consumes the context, returning the recorded draws.
    ///
    /// `None` when no randomness was drawn (the common case), keeping
    /// log entries compact. Replay contexts record nothing.
    #[must_use]
    pub fn into_entropy(self) -> Option<Entropy> {
        match self.mode {
            Mode::Live { recorded, .. } if !recorded.is_empty() => {
                Some(Entropy { random: recorded })
            }
            _ => None,
        }
    }

    /// Number of draws served from a live fallback during replay.
    ///
    /// Non-zero indicates the log and the update function disagree on
    /// how much randomness a step consumes.
    #[must_use]
    pub fn fallback_draws(&self) -> u32 {
        match &self.mode {
            Mode::Live { .. } => 0,
            Mode::Replay { fallback_draws, .. } => *fallback_draws,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::SeededRandom;

    #[test]
    fn live_records_every_draw() {
        let mut rng = SeededRandom::new(1);
        let mut ctx = UpdateContext::live(5, &mut rng);

        let a = ctx.random();
        let b = ctx.random();

        let entropy = ctx.into_entropy().expect("two draws recorded");
        assert_eq!(entropy.random, vec![a, b]);
    }

    #[test]
    fn live_without_draws_records_nothing() {
        let mut rng = SeededRandom::new(1);
        let ctx = UpdateContext::live(5, &mut rng);
        assert!(ctx.into_entropy().is_none());
    }

    #[test]
    fn now_is_stable_within_step() {
        let mut rng = SeededRandom::new(1);
        let ctx = UpdateContext::live(42, &mut rng);
        assert_eq!(ctx.now_ms(), 42);
        assert_eq!(ctx.now_ms(), 42);
    }

    #[test]
    fn replay_serves_draws_in_order() {
        let mut ctx = UpdateContext::replay(0, vec![0.25, 0.5]);
        assert_eq!(ctx.random(), 0.25);
        assert_eq!(ctx.random(), 0.5);
        assert_eq!(ctx.fallback_draws(), 0);
    }

    #[test]
    fn replay_falls_back_on_exhaustion() {
        let mut ctx = UpdateContext::replay(0, vec![0.25]);
        assert_eq!(ctx.random(), 0.25);

        let fallback = ctx.random();
        assert!((0.0..1.0).contains(&fallback));
        assert_eq!(ctx.fallback_draws(), 1);
    }

    #[test]
    fn replay_records_no_entropy() {
        let mut ctx = UpdateContext::replay(0, vec![0.25]);
        let _ = ctx.random();
        assert!(ctx.into_entropy().is_none());
    }
}
