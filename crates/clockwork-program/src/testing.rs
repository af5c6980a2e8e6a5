//! Test support for programs.
//!
//! [`ProgramHarness`] exercises a program's update function without an
//! engine: deterministic clock and RNG, a captured message log, and the
//! returned effects handed back for inspection. Pair it with
//! [`RecordingRunner`] when a test only cares *which* effects were
//! produced.
//!
//! # Example
//!
//! ```
//! use clockwork_program::testing::ProgramHarness;
//! use clockwork_program::{Program, UpdateContext, UpdateResult};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Model { total: i64 }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! enum Msg { Add(i64) }
//!
//! struct Adder;
//!
//! impl Program for Adder {
//!     type Model = Model;
//!     type Msg = Msg;
//!
//!     fn update(
//!         &self,
//!         model: &Model,
//!         msg: &Msg,
//!         _ctx: &mut UpdateContext<'_>,
//!     ) -> UpdateResult<Model, Msg> {
//!         let Msg::Add(n) = msg;
//!         UpdateResult::new(Model { total: model.total + n })
//!     }
//! }
//!
//! let mut harness = ProgramHarness::new(Adder, Model { total: 0 });
//! harness.update(Msg::Add(2));
//! harness.update(Msg::Add(3));
//! assert_eq!(harness.model().total, 5);
//! assert_eq!(harness.log().len(), 2);
//! ```

use crate::context::UpdateContext;
use crate::log::MsgLogEntry;
use crate::program::Program;
use crate::providers::{SeededRandom, SteppingClock, TimeProvider};
use clockwork_effect::{Dispatch, Effect, EffectRunner};
use parking_lot::Mutex;
use std::sync::Arc;

/// Default RNG seed for harness runs.
pub const DEFAULT_SEED: u64 = 42;

/// Exercises a program step by step, outside any engine.
///
/// Time starts at 0 and advances 1000 ms per message; randomness is
/// seeded. Both can be overridden before the first update.
pub struct ProgramHarness<P: Program> {
    program: P,
    model: P::Model,
    clock: SteppingClock,
    rng: SeededRandom,
    log: Vec<MsgLogEntry<P::Msg>>,
}

impl<P: Program> ProgramHarness<P> {
    /// Creates a harness over a program and its initial model.
    #[must_use]
    pub fn new(program: P, model: P::Model) -> Self {
        Self {
            program,
            model,
            clock: SteppingClock::new(0, 1_000),
            rng: SeededRandom::new(DEFAULT_SEED),
            log: Vec::new(),
        }
    }

    /// Overrides the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SeededRandom::new(seed);
        self
    }

    /// Overrides the stepping clock.
    #[must_use]
    pub fn with_clock(mut self, clock: SteppingClock) -> Self {
        self.clock = clock;
        self
    }

    /// Processes one message: runs update, commits the model, appends a
    /// log entry, and returns the effects for inspection.
    pub fn update(&mut self, msg: P::Msg) -> Vec<Effect<P::Msg>> {
        let ts = self.clock.now_ms();
        let mut ctx = UpdateContext::live(ts, &mut self.rng);
        let result = self.program.update(&self.model, &msg, &mut ctx);
        let entropy = ctx.into_entropy();

        self.log
            .push(MsgLogEntry::new(msg, ts).with_entropy(entropy));
        self.model = result.model;
        result.effects
    }

    /// The current model.
    #[must_use]
    pub fn model(&self) -> &P::Model {
        &self.model
    }

    /// The captured log, one entry per processed message.
    #[must_use]
    pub fn log(&self) -> &[MsgLogEntry<P::Msg>] {
        &self.log
    }

    /// Consumes the harness, returning the captured log.
    #[must_use]
    pub fn into_log(self) -> Vec<MsgLogEntry<P::Msg>> {
        self.log
    }

    /// The program under test.
    #[must_use]
    pub fn program(&self) -> &P {
        &self.program
    }
}

/// An effect runner that records effect kinds and drops the effects.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    kinds: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingRunner {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the kinds of every effect run so far, in handoff order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.kinds.lock().clone()
    }
}

impl<M> EffectRunner<M> for RecordingRunner {
    fn run(&self, effect: Effect<M>, _dispatch: Dispatch<M>) {
        self.kinds.lock().push(effect.kind());
    }
}
