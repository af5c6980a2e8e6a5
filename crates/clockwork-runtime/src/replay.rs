//! Deterministic replay: a pure fold of the update function over a log.
//!
//! Each step's context serves the entry's stored timestamp and consumes
//! its recorded entropy in order; no effects are executed. If the
//! update function is referentially transparent outside the context
//! capability, replaying the exact log from the exact initial model
//! reproduces a state canonically identical to the live engine's final
//! state.

use clockwork_program::{MsgLogEntry, Program, UpdateContext};

/// Outcome of comparing a live state with its replayed reconstruction.
///
/// Diagnostic only: divergence is reported, never raised. A mismatch
/// indicates non-determinism leaking outside the update context, or a
/// log that no longer starts at the replay base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether the replayed state canonically equals the live state.
    pub matched: bool,
    /// Number of log entries folded.
    pub entries_checked: usize,
    /// `false` once eviction has dropped entries: the log no longer
    /// reaches back to the replay base, so a mismatch is expected.
    pub genesis_intact: bool,
    /// A short excerpt around the first differing byte, when unmatched.
    pub divergence: Option<String>,
}

/// Replays a log against an initial model.
///
/// Effects returned by the update function are dropped: replay
/// reconstructs state, it does not re-run the outside world.
///
/// # Example
///
/// ```
/// use clockwork_program::testing::ProgramHarness;
/// use clockwork_program::{Program, UpdateContext, UpdateResult};
/// use clockwork_runtime::replay;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct Model { value: i64 }
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// enum Msg { Add(i64) }
///
/// struct App;
/// impl Program for App {
///     type Model = Model;
///     type Msg = Msg;
///     fn update(
///         &self,
///         model: &Model,
///         msg: &Msg,
///         _ctx: &mut UpdateContext<'_>,
///     ) -> UpdateResult<Model, Msg> {
///         let Msg::Add(n) = msg;
///         UpdateResult::new(Model { value: model.value + n })
///     }
/// }
///
/// let mut harness = ProgramHarness::new(App, Model { value: 0 });
/// harness.update(Msg::Add(2));
/// harness.update(Msg::Add(40));
///
/// let replayed = replay(&App, Model { value: 0 }, harness.log());
/// assert_eq!(&replayed, harness.model());
/// ```
pub fn replay<P: Program>(
    program: &P,
    initial: P::Model,
    log: &[MsgLogEntry<P::Msg>],
) -> P::Model {
    let mut model = initial;
    for entry in log {
        let mut ctx = UpdateContext::replay(entry.ts_ms, entry.draws());
        let result = program.update(&model, &entry.msg, &mut ctx);
        model = result.model;
    }
    model
}

/// Builds a short excerpt around the first byte where two canonical
/// strings differ.
pub(crate) fn divergence_summary(expected: &str, actual: &str) -> String {
    let position = expected
        .bytes()
        .zip(actual.bytes())
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| expected.len().min(actual.len()));

    let window = 40;
    let start = position.saturating_sub(window);
    let excerpt = |s: &str| {
        let end = (position + window).min(s.len());
        s.get(start..end).unwrap_or("").to_string()
    };

    format!(
        "first difference at byte {position}: expected ...{}... actual ...{}...",
        excerpt(expected),
        excerpt(actual)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockwork_program::testing::ProgramHarness;
    use clockwork_program::UpdateResult;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Model {
        total: i64,
        last_roll: Option<f64>,
        last_ts: i64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum Msg {
        Add(i64),
        Roll,
    }

    struct App;

    impl Program for App {
        type Model = Model;
        type Msg = Msg;

        fn update(
            &self,
            model: &Model,
            msg: &Msg,
            ctx: &mut UpdateContext<'_>,
        ) -> UpdateResult<Model, Msg> {
            let mut next = model.clone();
            next.last_ts = ctx.now_ms();
            match msg {
                Msg::Add(n) => next.total += n,
                Msg::Roll => next.last_roll = Some(ctx.random()),
            }
            UpdateResult::new(next)
        }
    }

    fn initial() -> Model {
        Model {
            total: 0,
            last_roll: None,
            last_ts: 0,
        }
    }

    #[test]
    fn replay_reproduces_entropy_and_time() {
        let mut harness = ProgramHarness::new(App, initial());
        harness.update(Msg::Add(5));
        harness.update(Msg::Roll);
        harness.update(Msg::Add(7));

        let replayed = replay(&App, initial(), harness.log());
        assert_eq!(&replayed, harness.model());
    }

    #[test]
    fn repeated_replay_is_identical() {
        let mut harness = ProgramHarness::new(App, initial());
        for _ in 0..10 {
            harness.update(Msg::Roll);
        }
        let log = harness.into_log();

        let first = replay(&App, initial(), &log);
        let second = replay(&App, initial(), &log);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_log_returns_initial() {
        let replayed = replay(&App, initial(), &[]);
        assert_eq!(replayed, initial());
    }

    #[test]
    fn divergence_summary_points_at_difference() {
        let summary = divergence_summary(r#"{"a":1}"#, r#"{"a":2}"#);
        assert!(summary.contains("byte 5"));
    }

    #[test]
    fn divergence_summary_handles_prefix() {
        let summary = divergence_summary("abc", "abcdef");
        assert!(summary.contains("byte 3"));
    }
}
