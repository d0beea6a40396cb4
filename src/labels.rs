use serde::Serialize;

/// Display text for each index of the scale. Index 1 is a blank slot that
/// no normalized record ever carries.
pub const CONDITION_LABELS: [&str; 5] = [
    "N/A",
    "",
    "Significantly Constrained",
    "Constrained",
    "No Constraints",
];

pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ConditionLabel {
    NotApplicable,
    Reserved,
    SignificantlyConstrained,
    Constrained,
    NoConstraints,
}

impl ConditionLabel {
    pub const ALL: [ConditionLabel; 5] = [
        ConditionLabel::NotApplicable,
        ConditionLabel::Reserved,
        ConditionLabel::SignificantlyConstrained,
        ConditionLabel::Constrained,
        ConditionLabel::NoConstraints,
    ];

    pub fn index(self) -> i64 {
        self as i64
    }

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn label(self) -> &'static str {
        CONDITION_LABELS[self as usize]
    }

    /// Campus-score normalization: trimmed, case-insensitive match. Blank
    /// or unrecognized input has no score at all.
    pub fn parse_campus(raw: &str) -> Option<Self> {
        let cleaned = raw.trim();
        if cleaned.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|label| label.label().eq_ignore_ascii_case(cleaned))
    }

    /// Educational-adequacy normalization: trimmed, exact match, anything
    /// else (blank included) collapses to N/A.
    pub fn parse_adequacy(raw: &str) -> Self {
        let cleaned = raw.trim();
        if cleaned.is_empty() {
            return ConditionLabel::NotApplicable;
        }
        Self::ALL
            .into_iter()
            .find(|label| label.label() == cleaned)
            .unwrap_or(ConditionLabel::NotApplicable)
    }
}

pub fn display_index(index: i64) -> &'static str {
    ConditionLabel::from_index(index)
        .map(ConditionLabel::label)
        .unwrap_or(UNKNOWN_LABEL)
}
