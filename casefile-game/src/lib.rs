//! Casefile Game Engine
//!
//! Platform-agnostic core logic for the Casefile data-detective game: case
//! content, report grading, manager feedback and the play-state reducer.
//! This crate has no UI or platform-specific dependencies.

pub mod case;
pub mod config;
pub mod constants;
pub mod narrative;
pub mod numbers;
pub mod record;
pub mod reference;
pub mod report;
pub mod rules;
pub mod seed;
pub mod session;
pub mod state;
pub mod step;

// Re-export commonly used types
pub use case::{
    Briefing, Case, CaseError, CaseResources, DataInsight, DataSet, Evidence, EvidenceKind,
    Hypothesis, InterviewQuestion, Solution, Stakeholder,
};
pub use config::{GradingConfig, NoisePolicy, PointsCfg};
pub use narrative::{LearningCard, Narrative};
pub use record::{
    MemorySessionStore, NewSession, SessionPatch, SessionRecord, SessionResources, SessionStore,
    StoreError,
};
pub use reference::{JustificationItem, ReasonRef, RefKind, RefSet, ReferenceError, normalize};
pub use report::{
    EliminationInput, IssueGroup, IssueKind, ReportEvaluation, ReportInput, ReportOutcome,
    evaluate_report,
};
pub use rules::{Partition, RefClass, RuleProfile, RuleTable, partition};
pub use seed::{PhrasePicker, SeededPicker};
pub use session::CaseSession;
pub use state::{
    Action, ActionError, EliminationRecord, GameState, Phase, ReportGuard, Submission, Transition,
    reduce, reduce_submission,
};
pub use step::{StepKind, StepResult, StepStatus, evaluate_elimination, evaluate_support};

use anyhow::{Context, bail};

/// Trait for abstracting case loading
/// Platform-specific implementations should provide this
pub trait CaseLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load and validate a case by id
    ///
    /// # Errors
    ///
    /// Returns an error if the case is unknown or its content is invalid.
    fn load_case(&self, case_id: &str) -> Result<Case, Self::Error>;

    /// Ids of the cases this loader can provide
    fn case_ids(&self) -> Vec<String>;
}

/// Loader for the case assets compiled into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledCaseLoader;

impl CaseLoader for BundledCaseLoader {
    type Error = CaseError;

    fn load_case(&self, case_id: &str) -> Result<Case, Self::Error> {
        Case::bundled(case_id)
    }

    fn case_ids(&self) -> Vec<String> {
        vec![constants::CASE001_ID.to_string()]
    }
}

/// Main engine for creating, saving and restoring case sessions
pub struct CaseEngine<L, S>
where
    L: CaseLoader,
    S: SessionStore,
{
    loader: L,
    store: S,
    config: GradingConfig,
}

impl<L, S> CaseEngine<L, S>
where
    L: CaseLoader,
    S: SessionStore,
{
    /// Create a new engine with the provided loader and store
    pub fn new(loader: L, store: S) -> Self {
        Self::with_config(loader, store, GradingConfig::default())
    }

    pub const fn with_config(loader: L, store: S, config: GradingConfig) -> Self {
        Self {
            loader,
            store,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &GradingConfig {
        &self.config
    }

    /// Start a new session for `case_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the case cannot be loaded.
    pub fn create_session(&self, case_id: &str) -> Result<CaseSession, L::Error> {
        let case = self.loader.load_case(case_id)?;
        Ok(CaseSession::new(case, self.config.clone()))
    }

    /// Persist a snapshot of `session` as a new record
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be encoded or stored.
    pub fn save_session(&self, session: &CaseSession) -> Result<SessionRecord, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let snapshot = NewSession::snapshot(session).context("encoding session snapshot")?;
        self.store.create(snapshot).map_err(Into::into)
    }

    /// Overwrite record `id` with the current state of `session`
    ///
    /// # Errors
    ///
    /// Returns an error if the record is unknown or the state cannot be encoded.
    pub fn update_session(
        &self,
        id: u64,
        session: &CaseSession,
    ) -> Result<SessionRecord, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let snapshot = NewSession::snapshot(session).context("encoding session snapshot")?;
        self.store
            .update(id, SessionPatch::from_snapshot(snapshot))
            .map_err(Into::into)
    }

    /// Restore a stored session against freshly loaded case content
    ///
    /// # Errors
    ///
    /// Returns an error if the case cannot be loaded or the stored state does
    /// not belong to it.
    pub fn restore_session(&self, id: u64) -> Result<Option<CaseSession>, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let Some(record) = self.store.get(id).map_err(Into::into)? else {
            return Ok(None);
        };
        let case = self.loader.load_case(&record.case_id).map_err(Into::into)?;
        let state = record
            .game_state()
            .with_context(|| format!("decoding state of session {id}"))?;
        if state.case_id != case.id {
            bail!(
                "session {id} holds state for case `{}` but is filed under `{}`",
                state.case_id,
                case.id
            );
        }
        Ok(Some(CaseSession::from_state(case, self.config.clone(), state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl CaseLoader for FixtureLoader {
        type Error = Infallible;

        fn load_case(&self, _case_id: &str) -> Result<Case, Self::Error> {
            Ok(Case::case001().unwrap())
        }

        fn case_ids(&self) -> Vec<String> {
            vec!["fixture".to_string()]
        }
    }

    #[test]
    fn engine_creates_and_roundtrips_session() {
        let engine = CaseEngine::new(FixtureLoader, MemorySessionStore::default());
        let mut session = engine.create_session("case001").unwrap();
        session.start().unwrap();
        session.ask_question("q1_1").unwrap();
        session
            .eliminate("h1", vec![JustificationItem::evidence("ev1")])
            .unwrap();

        let record = engine.save_session(&session).unwrap();
        let restored = engine
            .restore_session(record.id)
            .unwrap()
            .expect("session exists");
        assert_eq!(restored.state(), session.state());
        assert!(engine.restore_session(record.id + 1).unwrap().is_none());
    }

    #[test]
    fn update_overwrites_existing_record() {
        let engine = CaseEngine::new(BundledCaseLoader, MemorySessionStore::default());
        let mut session = engine.create_session("case001").unwrap();
        let record = engine.save_session(&session).unwrap();
        assert_eq!(record.current_room, "briefing");

        session.start().unwrap();
        let updated = engine.update_session(record.id, &session).unwrap();
        assert_eq!(updated.id, record.id);
        assert_eq!(updated.current_room, "investigation");
        assert!(engine.update_session(99, &session).is_err());
    }

    #[test]
    fn bundled_loader_rejects_unknown_case() {
        let engine = CaseEngine::new(BundledCaseLoader, MemorySessionStore::default());
        assert!(matches!(
            engine.create_session("case999"),
            Err(CaseError::UnknownCase(_))
        ));
        assert_eq!(BundledCaseLoader.case_ids(), vec!["case001".to_string()]);
    }

    #[test]
    fn restore_rejects_mismatched_state() {
        let store = MemorySessionStore::default();
        let engine = CaseEngine::new(BundledCaseLoader, store.clone());
        let session = engine.create_session("case001").unwrap();
        let mut snapshot = NewSession::snapshot(&session).unwrap();
        snapshot.state["case_id"] = serde_json::Value::String("case777".to_string());
        let record = store.create(snapshot).unwrap();
        assert!(engine.restore_session(record.id).is_err());
    }
}
