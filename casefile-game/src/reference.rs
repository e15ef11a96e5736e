//! Typed references to discoverable information items.
//!
//! A reference is written `"{evidence|interview|data}:{id}"` and is the unit
//! of justification everywhere in grading.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Category of an information item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Evidence,
    Interview,
    Data,
}

impl RefKind {
    pub const ALL: [Self; 3] = [Self::Evidence, Self::Interview, Self::Data];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Evidence => "evidence",
            Self::Interview => "interview",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefKind {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "evidence" => Ok(Self::Evidence),
            "interview" => Ok(Self::Interview),
            "data" => Ok(Self::Data),
            other => Err(ReferenceError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("reference `{0}` is missing the `type:id` separator")]
    MissingSeparator(String),
    #[error("unknown reference type `{0}`")]
    UnknownKind(String),
    #[error("reference `{0}` has an empty id")]
    EmptyId(String),
}

/// Raw `{type, id}` selection as the player makes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JustificationItem {
    #[serde(rename = "type")]
    pub kind: RefKind,
    pub id: String,
}

impl JustificationItem {
    #[must_use]
    pub fn new(kind: RefKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn evidence(id: impl Into<String>) -> Self {
        Self::new(RefKind::Evidence, id)
    }

    #[must_use]
    pub fn interview(id: impl Into<String>) -> Self {
        Self::new(RefKind::Interview, id)
    }

    #[must_use]
    pub fn data(id: impl Into<String>) -> Self {
        Self::new(RefKind::Data, id)
    }

    #[must_use]
    pub fn to_ref(&self) -> ReasonRef {
        ReasonRef::new(self.kind, self.id.clone())
    }
}

impl From<ReasonRef> for JustificationItem {
    fn from(value: ReasonRef) -> Self {
        Self {
            kind: value.kind,
            id: value.id,
        }
    }
}

/// Canonical `type:id` reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReasonRef {
    kind: RefKind,
    id: String,
}

impl ReasonRef {
    #[must_use]
    pub fn new(kind: RefKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> RefKind {
        self.kind
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ReasonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for ReasonRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| ReferenceError::MissingSeparator(s.to_string()))?;
        let kind = kind.trim().parse::<RefKind>()?;
        let id = id.trim();
        if id.is_empty() {
            return Err(ReferenceError::EmptyId(s.to_string()));
        }
        Ok(Self::new(kind, id))
    }
}

impl TryFrom<String> for ReasonRef {
    type Error = ReferenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReasonRef> for String {
    fn from(value: ReasonRef) -> Self {
        value.to_string()
    }
}

/// Deduplicated reference set; iteration order is canonical, not selection order.
pub type RefSet = BTreeSet<ReasonRef>;

/// Collapse raw selections into a deduplicated reference set.
#[must_use]
pub fn normalize<'a, I>(items: I) -> RefSet
where
    I: IntoIterator<Item = &'a JustificationItem>,
{
    items.into_iter().map(JustificationItem::to_ref).collect()
}

/// Drop repeated `type:id` selections, keeping the first occurrence of each.
#[must_use]
pub fn dedup_items(items: &[JustificationItem]) -> Vec<JustificationItem> {
    let mut seen = RefSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.to_ref()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_references() {
        let r: ReasonRef = "interview:q2_1".parse().unwrap();
        assert_eq!(r.kind(), RefKind::Interview);
        assert_eq!(r.id(), "q2_1");
        assert_eq!(r.to_string(), "interview:q2_1");
    }

    #[test]
    fn rejects_malformed_references() {
        assert_eq!(
            "evidence".parse::<ReasonRef>(),
            Err(ReferenceError::MissingSeparator("evidence".to_string()))
        );
        assert!(matches!(
            "chart:c1".parse::<ReasonRef>(),
            Err(ReferenceError::UnknownKind(kind)) if kind == "chart"
        ));
        assert_eq!(
            "data:".parse::<ReasonRef>(),
            Err(ReferenceError::EmptyId("data:".to_string()))
        );
    }

    #[test]
    fn serializes_as_type_colon_id() {
        let r = ReasonRef::new(RefKind::Data, "insight_leads_quality_combined");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"data:insight_leads_quality_combined\"");
        let back: ReasonRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn justification_item_uses_type_field() {
        let item: JustificationItem =
            serde_json::from_str(r#"{"type":"evidence","id":"ev1"}"#).unwrap();
        assert_eq!(item, JustificationItem::evidence("ev1"));
    }

    #[test]
    fn normalize_collapses_duplicates() {
        let items = vec![
            JustificationItem::evidence("ev1"),
            JustificationItem::interview("q2_2"),
            JustificationItem::evidence("ev1"),
        ];
        let refs = normalize(&items);
        assert_eq!(refs.len(), 2);

        let again: Vec<JustificationItem> = refs.iter().cloned().map(Into::into).collect();
        assert_eq!(normalize(&again), refs);
    }

    #[test]
    fn dedup_items_keeps_first_occurrence_order() {
        let items = vec![
            JustificationItem::interview("q2_2"),
            JustificationItem::evidence("ev1"),
            JustificationItem::interview("q2_2"),
        ];
        assert_eq!(
            dedup_items(&items),
            vec![
                JustificationItem::interview("q2_2"),
                JustificationItem::evidence("ev1"),
            ]
        );
    }
}
