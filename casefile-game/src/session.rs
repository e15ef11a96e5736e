use crate::case::{Case, Hypothesis};
use crate::config::GradingConfig;
use crate::reference::JustificationItem;
use crate::state::{Action, ActionError, GameState, Phase, Submission, reduce, reduce_submission};

/// High-level session wrapper binding a case and its grading configuration
/// to the single mutable game state.
#[derive(Debug, Clone)]
pub struct CaseSession {
    case: Case,
    config: GradingConfig,
    state: GameState,
}

impl CaseSession {
    /// Construct a fresh session in the briefing phase.
    #[must_use]
    pub fn new(case: Case, config: GradingConfig) -> Self {
        let state = GameState::new(&case, &config);
        Self {
            case,
            config,
            state,
        }
    }

    /// Build a session around an existing state.
    #[must_use]
    pub const fn from_state(case: Case, config: GradingConfig, state: GameState) -> Self {
        Self {
            case,
            config,
            state,
        }
    }

    #[must_use]
    pub const fn case(&self) -> &Case {
        &self.case
    }

    #[must_use]
    pub const fn config(&self) -> &GradingConfig {
        &self.config
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Consume the session and return the owned state.
    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Coarse location of the player, as stored on session records.
    #[must_use]
    pub const fn current_room(&self) -> &'static str {
        match (self.state.phase, self.state.visited_office) {
            (Phase::Briefing, false) => "briefing",
            (Phase::Briefing, true) => "office",
            (Phase::Playing, _) => "investigation",
            (Phase::Solved | Phase::Failed, _) => "report",
        }
    }

    #[must_use]
    pub fn remaining_hypotheses(&self) -> Vec<&Hypothesis> {
        self.state.remaining_hypotheses(&self.case)
    }

    /// Apply an action; the state only changes when it succeeds.
    ///
    /// # Errors
    ///
    /// Returns the reducer's [`ActionError`] for illegal actions.
    pub fn apply(&mut self, action: Action) -> Result<Option<Submission>, ActionError> {
        let transition = reduce(&self.case, &self.config, &self.state, action)?;
        self.state = transition.state;
        Ok(transition.submission)
    }

    /// # Errors
    ///
    /// Propagates the reducer's verdict; visiting the office is legal in
    /// every phase.
    pub fn visit_office(&mut self) -> Result<(), ActionError> {
        self.apply(Action::VisitOffice).map(drop)
    }

    /// # Errors
    ///
    /// Fails unless the game is in the briefing phase.
    pub fn start(&mut self) -> Result<(), ActionError> {
        self.apply(Action::StartGame).map(drop)
    }

    /// Start the case over from its initial resources.
    ///
    /// # Errors
    ///
    /// Propagates the reducer's verdict; resetting is legal in every phase.
    pub fn reset(&mut self) -> Result<(), ActionError> {
        self.apply(Action::ResetGame).map(drop)
    }

    /// # Errors
    ///
    /// Fails outside play or for unknown evidence.
    pub fn visit_evidence(&mut self, evidence_id: &str) -> Result<(), ActionError> {
        self.apply(Action::VisitEvidence {
            evidence_id: evidence_id.to_string(),
        })
        .map(drop)
    }

    /// # Errors
    ///
    /// Fails outside play or for unknown questions.
    pub fn ask_question(&mut self, question_id: &str) -> Result<(), ActionError> {
        self.apply(Action::AskQuestion {
            question_id: question_id.to_string(),
        })
        .map(drop)
    }

    /// # Errors
    ///
    /// Fails outside play or for unknown insights.
    pub fn discover_insight(&mut self, insight_id: &str) -> Result<(), ActionError> {
        self.apply(Action::DiscoverInsight {
            insight_id: insight_id.to_string(),
        })
        .map(drop)
    }

    /// Eliminate a hypothesis, stamping the record with the current time.
    ///
    /// # Errors
    ///
    /// See [`ActionError`]; the last standing hypothesis cannot be eliminated.
    pub fn eliminate(
        &mut self,
        hypothesis_id: &str,
        justifications: Vec<JustificationItem>,
    ) -> Result<(), ActionError> {
        self.apply(Action::Eliminate {
            hypothesis_id: hypothesis_id.to_string(),
            justifications,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        })
        .map(drop)
    }

    /// # Errors
    ///
    /// Fails if the hypothesis is not currently eliminated.
    pub fn restore(&mut self, hypothesis_id: &str) -> Result<(), ActionError> {
        self.apply(Action::Restore {
            hypothesis_id: hypothesis_id.to_string(),
        })
        .map(drop)
    }

    /// # Errors
    ///
    /// Fails outside play or for unknown hypotheses.
    pub fn select_final(&mut self, hypothesis_id: &str) -> Result<(), ActionError> {
        self.apply(Action::SelectFinal {
            hypothesis_id: hypothesis_id.to_string(),
        })
        .map(drop)
    }

    /// # Errors
    ///
    /// Fails for more than the allowed number of distinct items.
    pub fn set_final_support(&mut self, items: Vec<JustificationItem>) -> Result<(), ActionError> {
        self.apply(Action::SetFinalSupport { items }).map(drop)
    }

    /// Submit the report.
    ///
    /// # Errors
    ///
    /// Fails when the game is not being played; guard states and exhausted
    /// attempts come back as a [`Submission`] instead.
    pub fn submit_report(&mut self) -> Result<Submission, ActionError> {
        let (state, submission) = reduce_submission(&self.case, &self.config, &self.state)?;
        self.state = state;
        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportOutcome;

    fn session() -> CaseSession {
        let mut session = CaseSession::new(Case::case001().unwrap(), GradingConfig::default());
        session.visit_office().unwrap();
        session.start().unwrap();
        session
    }

    #[test]
    fn rooms_follow_progress() {
        let mut session = CaseSession::new(Case::case001().unwrap(), GradingConfig::default());
        assert_eq!(session.current_room(), "briefing");
        session.visit_office().unwrap();
        assert_eq!(session.current_room(), "office");
        session.start().unwrap();
        assert_eq!(session.current_room(), "investigation");
    }

    #[test]
    fn full_playthrough_is_solved() {
        let mut session = session();
        session.visit_evidence("ev1").unwrap();
        session.visit_evidence("ev2").unwrap();
        session.ask_question("q2_2").unwrap();
        session.ask_question("q2_3").unwrap();
        session.discover_insight("insight_leads_quality_combined").unwrap();

        session
            .eliminate("h1", vec![JustificationItem::evidence("ev1")])
            .unwrap();
        session
            .eliminate("h3", vec![JustificationItem::evidence("ev2")])
            .unwrap();
        session
            .eliminate("h4", vec![JustificationItem::interview("q2_3")])
            .unwrap();
        assert!(session.state().elimination("h1").is_some_and(|e| e.timestamp_ms > 0));
        assert_eq!(session.remaining_hypotheses().len(), 1);

        session.select_final("h2").unwrap();
        session
            .set_final_support(vec![
                JustificationItem::interview("q2_2"),
                JustificationItem::data("insight_leads_quality_combined"),
            ])
            .unwrap();
        let submission = session.submit_report().unwrap();
        let evaluation = submission.evaluation().unwrap();
        assert_eq!(evaluation.outcome, ReportOutcome::Accepted);
        assert_eq!(session.phase(), Phase::Solved);
        assert_eq!(session.current_room(), "report");
        assert_eq!(session.state().attempts_left, 3);
    }

    #[test]
    fn failed_action_leaves_state_untouched() {
        let mut session = session();
        let before = session.state().clone();
        assert!(session.restore("h1").is_err());
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn reset_restores_briefing() {
        let mut session = session();
        session.visit_evidence("ev1").unwrap();
        session.reset().unwrap();
        assert_eq!(session.phase(), Phase::Briefing);
        assert!(session.state().visited_evidence.is_empty());
        assert!(!session.state().visited_office);
        assert_eq!(session.state().time, session.case().resources.initial_time);
        assert_eq!(
            session.state(),
            &GameState::new(session.case(), session.config())
        );
    }

    #[test]
    fn submitting_before_the_case_starts_is_an_error() {
        let mut session = CaseSession::new(Case::case001().unwrap(), GradingConfig::default());
        let err = session.submit_report().unwrap_err();
        assert!(matches!(err, ActionError::WrongPhase { .. }));
        assert_eq!(session.state().attempts_left, 3);
    }
}
