//! Static case content: hypotheses, discoverable information and rule profiles.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::constants::{CASE001_ID, CASE001_JSON};
use crate::reference::{ReasonRef, RefKind};
use crate::rules::{RuleProfile, RuleTable};

#[derive(Debug, Error)]
pub enum CaseError {
    #[error("case asset could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown case `{0}`")]
    UnknownCase(String),
    #[error("case has no hypotheses")]
    NoHypotheses,
    #[error("duplicate hypothesis id `{0}`")]
    DuplicateHypothesis(String),
    #[error("solution names unknown hypothesis `{0}`")]
    UnknownSolution(String),
    #[error("rule table has a profile for unknown hypothesis `{0}`")]
    UnknownRuleHypothesis(String),
    #[error("reference `{reference}` appears in more than one list for `{hypothesis}`")]
    OverlappingRule {
        hypothesis: String,
        reference: ReasonRef,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    #[default]
    Document,
    Email,
    Report,
    Clue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub kind: EvidenceKind,
    #[serde(default)]
    pub cost: u32,
    /// Internal flag, never shown to the player.
    #[serde(default)]
    pub is_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub id: String,
    pub text: String,
    pub response: String,
    #[serde(default)]
    pub cost: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub questions: Vec<InterviewQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataInsight {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub insights: Vec<DataInsight>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Briefing {
    pub sender: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResources {
    pub initial_time: u32,
    pub initial_trust: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub correct_hypothesis_id: String,
    #[serde(default)]
    pub feedback_correct: String,
    #[serde(default)]
    pub feedback_incorrect: String,
}

/// A complete, authored case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub title: String,
    pub briefing: Briefing,
    pub resources: CaseResources,
    pub hypotheses: Vec<Hypothesis>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub stakeholders: Vec<Stakeholder>,
    #[serde(default)]
    pub data_sets: Vec<DataSet>,
    pub solution: Solution,
    #[serde(default)]
    pub rules: RuleTable,
}

impl Case {
    /// Parse and validate a case from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the content violates a
    /// case invariant.
    pub fn from_json(json: &str) -> Result<Self, CaseError> {
        let case: Self = serde_json::from_str(json)?;
        case.validate()?;
        Ok(case)
    }

    /// The bundled first case.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled asset fails to parse or validate.
    pub fn case001() -> Result<Self, CaseError> {
        Self::from_json(CASE001_JSON)
    }

    /// Load a bundled case by id.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::UnknownCase`] for ids that are not bundled.
    pub fn bundled(id: &str) -> Result<Self, CaseError> {
        match id {
            CASE001_ID => Self::case001(),
            other => Err(CaseError::UnknownCase(other.to_string())),
        }
    }

    /// Check structural invariants of the content.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), CaseError> {
        if self.hypotheses.is_empty() {
            return Err(CaseError::NoHypotheses);
        }
        let mut ids = HashSet::new();
        for hypothesis in &self.hypotheses {
            if !ids.insert(hypothesis.id.as_str()) {
                return Err(CaseError::DuplicateHypothesis(hypothesis.id.clone()));
            }
        }
        if !ids.contains(self.solution.correct_hypothesis_id.as_str()) {
            return Err(CaseError::UnknownSolution(self.solution.correct_hypothesis_id.clone()));
        }
        for (hypothesis, profile) in &self.rules {
            if !ids.contains(hypothesis.as_str()) {
                return Err(CaseError::UnknownRuleHypothesis(hypothesis.clone()));
            }
            if let Some(reference) = profile.overlaps().into_iter().next() {
                return Err(CaseError::OverlappingRule {
                    hypothesis: hypothesis.clone(),
                    reference,
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn hypothesis(&self, id: &str) -> Option<&Hypothesis> {
        self.hypotheses.iter().find(|h| h.id == id)
    }

    /// Player-facing title, with a neutral fallback for unknown ids.
    #[must_use]
    pub fn hypothesis_title(&self, id: &str) -> &str {
        self.hypothesis(id)
            .map_or("the hypothesis", |h| h.title.as_str())
    }

    pub fn hypothesis_ids(&self) -> impl Iterator<Item = &str> {
        self.hypotheses.iter().map(|h| h.id.as_str())
    }

    #[must_use]
    pub fn is_correct(&self, hypothesis_id: &str) -> bool {
        self.solution.correct_hypothesis_id == hypothesis_id
    }

    #[must_use]
    pub fn rule_profile(&self, hypothesis_id: &str) -> Option<&RuleProfile> {
        self.rules.get(hypothesis_id)
    }

    #[must_use]
    pub fn evidence_item(&self, id: &str) -> Option<&Evidence> {
        self.evidence.iter().find(|ev| ev.id == id)
    }

    /// Find a question together with the stakeholder who answers it.
    #[must_use]
    pub fn question(&self, id: &str) -> Option<(&Stakeholder, &InterviewQuestion)> {
        self.stakeholders.iter().find_map(|stakeholder| {
            stakeholder
                .questions
                .iter()
                .find(|q| q.id == id)
                .map(|q| (stakeholder, q))
        })
    }

    /// Find an insight together with its data set.
    #[must_use]
    pub fn insight(&self, id: &str) -> Option<(&DataSet, &DataInsight)> {
        self.data_sets.iter().find_map(|set| {
            set.insights
                .iter()
                .find(|insight| insight.id == id)
                .map(|insight| (set, insight))
        })
    }

    /// Whether the reference points at content that exists in this case.
    #[must_use]
    pub fn resolves(&self, reference: &ReasonRef) -> bool {
        match reference.kind() {
            RefKind::Evidence => self.evidence_item(reference.id()).is_some(),
            RefKind::Interview => self.question(reference.id()).is_some(),
            RefKind::Data => self.insight(reference.id()).is_some(),
        }
    }
}
