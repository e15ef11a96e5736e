//! Per-hypothesis rule profiles and reference classification.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::reference::{ReasonRef, RefSet};

/// Diagnostic role of references for one hypothesis.
///
/// `anti` references are valid grounds to eliminate the hypothesis, `pro`
/// references support it as a final answer, and `decoy` references look
/// relevant but are not. Anything else is irrelevant to this hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RuleProfile {
    #[serde(default)]
    pub anti: RefSet,
    #[serde(default)]
    pub pro: RefSet,
    #[serde(default)]
    pub decoy: RefSet,
}

/// Rule profiles keyed by hypothesis id.
pub type RuleTable = BTreeMap<String, RuleProfile>;

/// Classification of a single reference against one hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefClass {
    Anti,
    Pro,
    Decoy,
    Irrelevant,
}

impl RuleProfile {
    #[must_use]
    pub fn classify(&self, reference: &ReasonRef) -> RefClass {
        if self.anti.contains(reference) {
            RefClass::Anti
        } else if self.pro.contains(reference) {
            RefClass::Pro
        } else if self.decoy.contains(reference) {
            RefClass::Decoy
        } else {
            RefClass::Irrelevant
        }
    }

    /// References listed in more than one of the three sets.
    #[must_use]
    pub fn overlaps(&self) -> Vec<ReasonRef> {
        let mut out: Vec<ReasonRef> = self
            .anti
            .intersection(&self.pro)
            .chain(self.anti.intersection(&self.decoy))
            .chain(self.pro.intersection(&self.decoy))
            .cloned()
            .collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn all_refs(&self) -> impl Iterator<Item = &ReasonRef> {
        self.anti.iter().chain(&self.pro).chain(&self.decoy)
    }
}

/// A reference set split by its role for one hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partition {
    pub in_anti: Vec<ReasonRef>,
    pub in_pro: Vec<ReasonRef>,
    pub in_decoy: Vec<ReasonRef>,
    pub rest: Vec<ReasonRef>,
}

impl Partition {
    #[must_use]
    pub fn total(&self) -> usize {
        self.in_anti.len() + self.in_pro.len() + self.in_decoy.len() + self.rest.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Split `refs` into anti/pro/decoy/irrelevant for `hypothesis_id`.
///
/// A hypothesis without a profile treats every reference as irrelevant.
#[must_use]
pub fn partition(rules: &RuleTable, hypothesis_id: &str, refs: &RefSet) -> Partition {
    let Some(profile) = rules.get(hypothesis_id) else {
        return Partition {
            rest: refs.iter().cloned().collect(),
            ..Partition::default()
        };
    };
    let mut out = Partition::default();
    for reference in refs {
        let bucket = match profile.classify(reference) {
            RefClass::Anti => &mut out.in_anti,
            RefClass::Pro => &mut out.in_pro,
            RefClass::Decoy => &mut out.in_decoy,
            RefClass::Irrelevant => &mut out.rest,
        };
        bucket.push(reference.clone());
    }
    out
}
