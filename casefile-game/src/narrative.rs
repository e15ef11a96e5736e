//! Manager feedback and learning cards.
//!
//! Text is chosen from fixed pools through a [`PhrasePicker`], so the same
//! evaluation always reads the same way. Feedback stays qualitative: it never
//! names references, hypothesis ids, or the correct hypothesis when the
//! player picked a different one.
use serde::{Deserialize, Serialize};

use crate::case::Case;
use crate::constants::{
    SLOT_CARD_PREFIX, SLOT_CLOSING, SLOT_OPENER, SLOT_STRENGTH, SLOT_TONE, SLOT_WEAKNESS,
};
use crate::report::{IssueGroup, IssueKind, ReportOutcome};
use crate::seed::PhrasePicker;
use crate::step::{StepKind, StepResult, StepStatus};

const TITLE: &str = "{title}";

const OPENERS: [&str; 3] = [
    "Alright. I read your report carefully.",
    "Let me give you my impression after going through the report.",
    "I looked over what you came up with.",
];

const STRENGTHS: [&str; 3] = [
    "I like that you closed the main doubts one by one, especially {title}.",
    "You clearly did not get pulled along by big talk. It shows in how you ruled out {title}.",
    "The overall logic of the report fits the picture we have.",
];

const STRENGTHS_GENERIC: [&str; 2] = [
    "The overall logic of the report fits the picture we have.",
    "Your reasoning holds together from start to finish.",
];

const NOISE_NOTES: [&str; 2] = [
    "Some things were said that did not need saying, but they do not change the decision.",
    "Just keep in mind: the cleaner the justification, the easier the decision.",
];

const ACCEPTED_CLOSINGS: [&str; 2] = [
    "I agree we go with this report. Let's start on the next steps.",
    "Good. We will move in this direction and start what you proposed.",
];

const REVIEW_LINES: [&str; 2] = [
    "I am not against the direction, but I cannot sign off on it like this.",
    "I want a cleaner version of the report. Cut the reasons down to what matters.",
];

const REVIEW_WEAKNESS: &str = "Something about {title} still does not reassure me enough.";
const REVIEW_WEAKNESS_GENERIC: &str = "One of the hypotheses still does not reassure me enough.";

const REVIEW_TONES: [&str; 3] = [
    "Go back, review it quickly and come see me.",
    "When you are done, send it to me again.",
    "Hand in another version and we will see.",
];

const REJECTED_OPENING: &str = "I cannot rely on this report.";
const REJECTED_WEAKNESS: &str =
    "Even if the direction might be close, the way {title} was handled is not reassuring.";
const REJECTED_WEAKNESS_WRONG: &str =
    "The hypothesis you built the decision on does not fit the picture we have.";
const REJECTED_CLOSING: &str = "Go back over what you have and hand in a new report.";

const REJECTED_TONES: [&str; 3] = [
    "Let's take it calmly, but I need a clear reason before I act.",
    "We do not want to move on a hunch. We want a report that reassures us.",
    "Right now I am not reassured, and this is a big decision.",
];

/// A short, reusable lesson attached to a kind of mistake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningCard {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub title: String,
    pub body: String,
}

const INVALID_CARDS: [(&str, &str); 3] = [
    (
        "Match the reason to the claim",
        "A reason only counts if it speaks directly against what you are ruling out. Ask what the item actually shows.",
    ),
    (
        "Direction matters",
        "Information that supports a hypothesis cannot also be the reason to discard it. Check which way each item points.",
    ),
    (
        "No reason, no decision",
        "Every elimination and every conclusion needs at least one piece of information behind it.",
    ),
];

const NOISE_CARDS: [(&str, &str); 2] = [
    (
        "Less is more",
        "One sharp reason beats a sharp reason plus filler. Extra items make a correct argument harder to trust.",
    ),
    (
        "Trim the padding",
        "Before you submit, drop any reason that would not change the decision if it were missing.",
    ),
];

const TRAP_CARDS: [(&str, &str); 2] = [
    (
        "Plausible is not proven",
        "Some information sounds convincing but does not hold up. Cross-check striking claims against the data.",
    ),
    (
        "Beware the loud signal",
        "A dramatic anecdote is not a trend. Look for evidence that is consistent across sources before building on it.",
    ),
];

/// Rendered feedback for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub manager_message: String,
    pub learning_cards: Vec<LearningCard>,
}

/// Canonical seed string for an evaluation.
#[must_use]
pub fn seed_string(outcome: ReportOutcome, correct: bool, ledger: &[StepResult]) -> String {
    let value = serde_json::json!({
        "outcome": outcome,
        "correct": correct,
        "ledger": ledger,
    });
    serde_json::to_string(&value).unwrap_or_default()
}

fn pick_line<P: PhrasePicker>(picker: &P, slot: &str, pool: &[&'static str]) -> &'static str {
    picker.pick(slot, pool).copied().unwrap_or_default()
}

fn with_title(template: &str, title: &str) -> String {
    template.replace(TITLE, title)
}

/// Build the manager's reply.
#[must_use]
pub fn manager_message<P: PhrasePicker>(
    case: &Case,
    picker: &P,
    outcome: ReportOutcome,
    correct: bool,
    ledger: &[StepResult],
) -> String {
    let first_with = |wanted: &[StepStatus]| {
        ledger
            .iter()
            .find(|step| wanted.contains(&step.status))
            .map(|step| case.hypothesis_title(&step.hypothesis_id))
    };
    let mut lines: Vec<String> = vec![pick_line(picker, SLOT_OPENER, &OPENERS).to_string()];

    match outcome {
        ReportOutcome::Accepted => {
            let praised = ledger
                .iter()
                .find(|step| step.kind == StepKind::Elimination && step.status == StepStatus::Ok)
                .map(|step| case.hypothesis_title(&step.hypothesis_id));
            let strength = match praised {
                Some(title) => with_title(pick_line(picker, SLOT_STRENGTH, &STRENGTHS), title),
                None => pick_line(picker, SLOT_STRENGTH, &STRENGTHS_GENERIC).to_string(),
            };
            lines.push(strength);
            if ledger.iter().any(|step| step.status == StepStatus::OkNoisy) {
                lines.push(pick_line(picker, SLOT_WEAKNESS, &NOISE_NOTES).to_string());
            }
            lines.push(pick_line(picker, SLOT_CLOSING, &ACCEPTED_CLOSINGS).to_string());
        }
        ReportOutcome::Review => {
            lines.push(REVIEW_LINES[0].to_string());
            let weakness = match first_with(&[StepStatus::Invalid])
                .or_else(|| first_with(&[StepStatus::OkNoisy]))
            {
                Some(title) if correct => with_title(REVIEW_WEAKNESS, title),
                _ => REVIEW_WEAKNESS_GENERIC.to_string(),
            };
            lines.push(weakness);
            lines.push(REVIEW_LINES[1].to_string());
            lines.push(pick_line(picker, SLOT_TONE, &REVIEW_TONES).to_string());
        }
        ReportOutcome::Rejected => {
            lines.push(REJECTED_OPENING.to_string());
            let weakness = match first_with(&[StepStatus::Trap])
                .or_else(|| first_with(&[StepStatus::Invalid]))
            {
                Some(title) if correct => with_title(REJECTED_WEAKNESS, title),
                _ => REJECTED_WEAKNESS_WRONG.to_string(),
            };
            lines.push(weakness);
            lines.push(REJECTED_CLOSING.to_string());
            lines.push(pick_line(picker, SLOT_TONE, &REJECTED_TONES).to_string());
        }
    }
    lines.join("\n")
}

/// One card per non-empty issue group, in group order.
#[must_use]
pub fn learning_cards<P: PhrasePicker>(picker: &P, issues: &[IssueGroup]) -> Vec<LearningCard> {
    issues
        .iter()
        .filter(|group| !group.items.is_empty())
        .filter_map(|group| {
            let pool: &[(&str, &str)] = match group.kind {
                IssueKind::Invalid => &INVALID_CARDS,
                IssueKind::Noise => &NOISE_CARDS,
                IssueKind::Trap => &TRAP_CARDS,
            };
            let slot = format!("{SLOT_CARD_PREFIX}{}", group.kind.as_str());
            picker.pick(&slot, pool).map(|(title, body)| LearningCard {
                kind: group.kind,
                title: (*title).to_string(),
                body: (*body).to_string(),
            })
        })
        .collect()
}

/// Manager message plus learning cards.
#[must_use]
pub fn compose<P: PhrasePicker>(
    case: &Case,
    picker: &P,
    outcome: ReportOutcome,
    correct: bool,
    ledger: &[StepResult],
    issues: &[IssueGroup],
) -> Narrative {
    Narrative {
        manager_message: manager_message(case, picker, outcome, correct, ledger),
        learning_cards: learning_cards(picker, issues),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::SeededPicker;

    struct FirstPicker;

    impl PhrasePicker for FirstPicker {
        fn index(&self, _slot: &str, _len: usize) -> usize {
            0
        }
    }

    fn step(kind: StepKind, id: &str, status: StepStatus) -> StepResult {
        StepResult {
            step_key: format!("{}:{id}", kind.key_prefix()),
            hypothesis_id: id.to_string(),
            kind,
            status,
            points: 0,
            note: String::new(),
        }
    }

    #[test]
    fn accepted_message_praises_an_elimination() {
        let case = Case::case001().unwrap();
        let ledger = vec![
            step(StepKind::Elimination, "h1", StepStatus::Ok),
            step(StepKind::Support, "h2", StepStatus::Ok),
        ];
        let text = manager_message(&case, &FirstPicker, ReportOutcome::Accepted, true, &ledger);
        assert!(text.contains("Sales team underperformance"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn noisy_accepted_adds_a_note() {
        let case = Case::case001().unwrap();
        let ledger = vec![
            step(StepKind::Elimination, "h1", StepStatus::OkNoisy),
            step(StepKind::Support, "h2", StepStatus::Ok),
        ];
        let text = manager_message(&case, &FirstPicker, ReportOutcome::Accepted, true, &ledger);
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains(NOISE_NOTES[0]));
        assert!(text.contains(STRENGTHS_GENERIC[0]));
    }

    #[test]
    fn wrong_final_never_names_hypotheses() {
        let case = Case::case001().unwrap();
        let ledger = vec![
            step(StepKind::Elimination, "h2", StepStatus::Invalid),
            step(StepKind::Elimination, "h3", StepStatus::Ok),
            step(StepKind::Support, "h1", StepStatus::Invalid),
        ];
        let picker = SeededPicker::from_seed_str("wrong");
        let text = manager_message(&case, &picker, ReportOutcome::Rejected, false, &ledger);
        for h in &case.hypotheses {
            assert!(!text.contains(&h.title));
            assert!(!text.contains(&h.id));
        }
        assert!(text.contains(REJECTED_WEAKNESS_WRONG));
    }

    #[test]
    fn review_mentions_first_problem_step() {
        let case = Case::case001().unwrap();
        let ledger = vec![
            step(StepKind::Elimination, "h1", StepStatus::OkNoisy),
            step(StepKind::Elimination, "h3", StepStatus::Invalid),
            step(StepKind::Support, "h2", StepStatus::Ok),
        ];
        let text = manager_message(&case, &FirstPicker, ReportOutcome::Review, true, &ledger);
        assert!(text.contains("Market slowdown"));
    }

    #[test]
    fn one_card_per_issue_group() {
        let issues = vec![
            IssueGroup {
                kind: IssueKind::Invalid,
                title: String::new(),
                items: vec!["x".to_string()],
            },
            IssueGroup {
                kind: IssueKind::Trap,
                title: String::new(),
                items: vec!["y".to_string()],
            },
        ];
        let cards = learning_cards(&FirstPicker, &issues);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].kind, IssueKind::Invalid);
        assert_eq!(cards[0].title, INVALID_CARDS[0].0);
        assert_eq!(cards[1].kind, IssueKind::Trap);
    }

    #[test]
    fn seed_string_is_stable() {
        let ledger = vec![step(StepKind::Support, "h2", StepStatus::Ok)];
        let a = seed_string(ReportOutcome::Accepted, true, &ledger);
        let b = seed_string(ReportOutcome::Accepted, true, &ledger);
        assert_eq!(a, b);
        assert_ne!(a, seed_string(ReportOutcome::Review, true, &ledger));
    }
}
