//! Restore-or-discard.
//!
//! A persisted session restores by replaying its log against the
//! genesis model, the same fold the determinism checks use, so a
//! restored session behaves identically to one that never stopped. A
//! malformed, foreign-versioned, or unreadable asset is discarded with
//! a warning and the caller starts fresh; restore never fails.

use super::asset::SessionAsset;
use super::error::StorageError;
use crate::replay::replay;
use clockwork_program::{MsgLogEntry, Program};
use clockwork_types::canonical;
use tracing::{info, warn};

/// Outcome of a restore attempt.
pub struct Resume<P: Program> {
    /// The model to start the engine with.
    pub model: P::Model,
    /// The log to seed the engine with (empty when starting fresh).
    pub log: Vec<MsgLogEntry<P::Msg>>,
    /// Whether a stored session was actually restored.
    pub restored: bool,
}

/// Restores a session from a load result, falling back to the genesis
/// model on any failure.
///
/// Pass the engine builder the returned log via `initial_log` and the
/// genesis model via `replay_base`, so determinism verification spans
/// the restored history.
///
/// # Example
///
/// ```no_run
/// use clockwork_runtime::session::{resume_or_fresh, LocalFileStore, SessionStore};
/// # use clockwork_program::{Program, UpdateContext, UpdateResult};
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// # struct Model;
/// # #[derive(Debug, Clone, Serialize, Deserialize)]
/// # enum Msg {}
/// # struct App;
/// # impl Program for App {
/// #     type Model = Model;
/// #     type Msg = Msg;
/// #     fn update(&self, m: &Model, _: &Msg, _: &mut UpdateContext<'_>) -> UpdateResult<Model, Msg> {
/// #         UpdateResult::new(m.clone())
/// #     }
/// # }
///
/// # async fn example(store: LocalFileStore) {
/// let loaded = store.load("main").await;
/// let resume = resume_or_fresh(&App, Model, loaded);
/// if resume.restored {
///     println!("restored {} messages", resume.log.len());
/// }
/// # }
/// ```
pub fn resume_or_fresh<P: Program>(
    program: &P,
    genesis: P::Model,
    loaded: Result<SessionAsset<P::Model, P::Msg>, StorageError>,
) -> Resume<P> {
    let asset = match loaded.and_then(|asset| {
        asset.validate()?;
        Ok(asset)
    }) {
        Ok(asset) => asset,
        Err(error) => {
            warn!(%error, "session restore failed, starting fresh");
            return Resume {
                model: genesis,
                log: Vec::new(),
                restored: false,
            };
        }
    };

    let model = replay(program, genesis, &asset.log);

    // The replayed state is authoritative; the stored snapshot is only
    // cross-checked for diagnostics.
    match canonical::canonical_eq(&model, &asset.snapshot) {
        Ok(true) => {}
        Ok(false) => warn!(
            id = %asset.id,
            "replayed session diverges from its stored snapshot, keeping replayed state"
        ),
        Err(error) => warn!(%error, "could not compare replayed state with stored snapshot"),
    }

    info!(id = %asset.id, entries = asset.log.len(), "session restored");
    Resume {
        model,
        log: asset.log,
        restored: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockwork_program::testing::ProgramHarness;
    use clockwork_program::{UpdateContext, UpdateResult};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Model {
        total: i64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum Msg {
        Add(i64),
    }

    struct App;

    impl Program for App {
        type Model = Model;
        type Msg = Msg;

        fn update(
            &self,
            model: &Model,
            msg: &Msg,
            _ctx: &mut UpdateContext<'_>,
        ) -> UpdateResult<Model, Msg> {
            let Msg::Add(n) = msg;
            UpdateResult::new(Model {
                total: model.total + n,
            })
        }
    }

    fn recorded_session() -> SessionAsset<Model, Msg> {
        let mut harness = ProgramHarness::new(App, Model { total: 0 });
        harness.update(Msg::Add(3));
        harness.update(Msg::Add(4));
        let snapshot = harness.model().clone();
        SessionAsset::new("s", harness.into_log(), snapshot)
    }

    #[test]
    fn restores_by_replaying() {
        let resume = resume_or_fresh(&App, Model { total: 0 }, Ok(recorded_session()));
        assert!(resume.restored);
        assert_eq!(resume.model, Model { total: 7 });
        assert_eq!(resume.log.len(), 2);
    }

    #[test]
    fn load_error_falls_back_to_genesis() {
        let resume = resume_or_fresh(
            &App,
            Model { total: 0 },
            Err(StorageError::NotFound("s".into())),
        );
        assert!(!resume.restored);
        assert_eq!(resume.model, Model { total: 0 });
        assert!(resume.log.is_empty());
    }

    #[test]
    fn foreign_version_falls_back_to_genesis() {
        let mut asset = recorded_session();
        asset.version = 42;

        let resume = resume_or_fresh(&App, Model { total: 0 }, Ok(asset));
        assert!(!resume.restored);
        assert_eq!(resume.model, Model { total: 0 });
    }

    #[test]
    fn divergent_snapshot_keeps_replayed_state() {
        let mut asset = recorded_session();
        asset.snapshot = Model { total: 999 };

        let resume = resume_or_fresh(&App, Model { total: 0 }, Ok(asset));
        assert!(resume.restored);
        // Replay is authoritative.
        assert_eq!(resume.model, Model { total: 7 });
    }
}
