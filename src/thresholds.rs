use std::fmt;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::labels::display_index;
use crate::models::CampusMode;

/// Ordinal thresholds are raw indices into the condition scale and may point
/// outside it; gates still evaluate and captions show "Unknown".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSet {
    /// Percent utilization at or above which a building leaves the
    /// portables band.
    pub utilization: i64,
    pub funding_factor: f64,
    pub renovation_funding_factor: f64,
    pub modified_age: i64,
    /// Expected to sit below `modified_age`; not enforced.
    pub modified_age2: i64,
    pub systems_deficient: i64,
    /// Expected to sit at or below `systems_deficient`; not enforced.
    pub minor_systems_deficient: i64,
    pub campus_score: i64,
    pub ea_index: i64,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            utilization: 105,
            funding_factor: 0.4,
            renovation_funding_factor: 0.4,
            modified_age: 30,
            modified_age2: 20,
            systems_deficient: 3,
            minor_systems_deficient: 1,
            campus_score: 3,
            ea_index: 4,
        }
    }
}

impl ThresholdSet {
    /// Ordering rules that are documented policy but never enforced.
    pub fn policy_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.modified_age2 >= self.modified_age {
            warnings.push(format!(
                "modified_age2 ({}) is not below modified_age ({})",
                self.modified_age2, self.modified_age
            ));
        }
        if self.minor_systems_deficient > self.systems_deficient {
            warnings.push(format!(
                "minor_systems_deficient ({}) exceeds systems_deficient ({})",
                self.minor_systems_deficient, self.systems_deficient
            ));
        }
        warnings
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdField {
    Utilization,
    FundingFactor,
    RenovationFundingFactor,
    ModifiedAge,
    ModifiedAge2,
    SystemsDeficient,
    MinorSystemsDeficient,
    CampusScore,
    EaIndex,
}

impl ThresholdField {
    pub const ALL: [ThresholdField; 9] = [
        ThresholdField::Utilization,
        ThresholdField::FundingFactor,
        ThresholdField::RenovationFundingFactor,
        ThresholdField::ModifiedAge,
        ThresholdField::ModifiedAge2,
        ThresholdField::SystemsDeficient,
        ThresholdField::MinorSystemsDeficient,
        ThresholdField::CampusScore,
        ThresholdField::EaIndex,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ThresholdField::Utilization => "utilization",
            ThresholdField::FundingFactor => "funding_factor",
            ThresholdField::RenovationFundingFactor => "renovation_funding_factor",
            ThresholdField::ModifiedAge => "modified_age",
            ThresholdField::ModifiedAge2 => "modified_age2",
            ThresholdField::SystemsDeficient => "systems_deficient",
            ThresholdField::MinorSystemsDeficient => "minor_systems_deficient",
            ThresholdField::CampusScore => "campus_score",
            ThresholdField::EaIndex => "ea_index",
        }
    }

    pub fn display_value(self, set: &ThresholdSet) -> String {
        match self {
            ThresholdField::Utilization => format!("{}%", set.utilization),
            ThresholdField::FundingFactor => set.funding_factor.to_string(),
            ThresholdField::RenovationFundingFactor => set.renovation_funding_factor.to_string(),
            ThresholdField::ModifiedAge => set.modified_age.to_string(),
            ThresholdField::ModifiedAge2 => set.modified_age2.to_string(),
            ThresholdField::SystemsDeficient => format!("{} systems", set.systems_deficient),
            ThresholdField::MinorSystemsDeficient => {
                format!("{} systems", set.minor_systems_deficient)
            }
            ThresholdField::CampusScore => {
                format!("{} ({})", set.campus_score, display_index(set.campus_score))
            }
            ThresholdField::EaIndex => format!("{} ({})", set.ea_index, display_index(set.ea_index)),
        }
    }
}

impl fmt::Display for ThresholdField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThresholdField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|field| field.name() == wanted)
            .ok_or_else(|| anyhow::anyhow!("unknown threshold '{s}'"))
    }
}

/// Owns the live thresholds and campus mode. Evaluations work from a
/// `snapshot`, so a change made mid-pass never leaks into that pass.
#[derive(Debug, Clone, Default)]
pub struct ThresholdStore {
    current: ThresholdSet,
    campus_mode: CampusMode,
}

impl ThresholdStore {
    pub fn new(current: ThresholdSet, campus_mode: CampusMode) -> Self {
        Self {
            current,
            campus_mode,
        }
    }

    pub fn snapshot(&self) -> ThresholdSet {
        self.current
    }

    pub fn campus_mode(&self) -> CampusMode {
        self.campus_mode
    }

    pub fn set_campus_mode(&mut self, mode: CampusMode) {
        self.campus_mode = mode;
    }

    pub fn set_utilization(&mut self, value: i64) {
        self.current.utilization = value;
    }

    pub fn set_funding_factor(&mut self, value: f64) {
        self.current.funding_factor = value;
    }

    pub fn set_renovation_funding_factor(&mut self, value: f64) {
        self.current.renovation_funding_factor = value;
    }

    pub fn set_modified_age(&mut self, value: i64) {
        self.current.modified_age = value;
        self.warn_on_policy();
    }

    pub fn set_modified_age2(&mut self, value: i64) {
        self.current.modified_age2 = value;
        self.warn_on_policy();
    }

    pub fn set_systems_deficient(&mut self, value: i64) {
        self.current.systems_deficient = value;
        self.warn_on_policy();
    }

    pub fn set_minor_systems_deficient(&mut self, value: i64) {
        self.current.minor_systems_deficient = value;
        self.warn_on_policy();
    }

    pub fn set_campus_score(&mut self, index: i64) {
        self.current.campus_score = index;
    }

    pub fn set_ea_index(&mut self, index: i64) {
        self.current.ea_index = index;
    }

    pub fn apply(&mut self, field: ThresholdField, value: &str) -> anyhow::Result<()> {
        let value = value.trim();
        let int = || {
            value
                .parse::<i64>()
                .with_context(|| format!("{field} expects a whole number, got '{value}'"))
        };
        let ratio = || {
            value
                .parse::<f64>()
                .with_context(|| format!("{field} expects a number, got '{value}'"))
        };

        match field {
            ThresholdField::Utilization => self.set_utilization(int()?),
            ThresholdField::FundingFactor => self.set_funding_factor(ratio()?),
            ThresholdField::RenovationFundingFactor => self.set_renovation_funding_factor(ratio()?),
            ThresholdField::ModifiedAge => self.set_modified_age(int()?),
            ThresholdField::ModifiedAge2 => self.set_modified_age2(int()?),
            ThresholdField::SystemsDeficient => self.set_systems_deficient(int()?),
            ThresholdField::MinorSystemsDeficient => self.set_minor_systems_deficient(int()?),
            ThresholdField::CampusScore => self.set_campus_score(int()?),
            ThresholdField::EaIndex => self.set_ea_index(int()?),
        }
        tracing::debug!(threshold = %field, value, "threshold updated");
        Ok(())
    }

    pub fn apply_assignment(&mut self, assignment: &str) -> anyhow::Result<()> {
        let (name, value) = assignment
            .split_once('=')
            .with_context(|| format!("expected name=value, got '{assignment}'"))?;
        let field: ThresholdField = name.parse()?;
        self.apply(field, value)
    }

    fn warn_on_policy(&self) {
        for warning in self.current.policy_warnings() {
            tracing::warn!("{warning}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_initial_sliders() {
        let t = ThresholdSet::default();
        assert_eq!(t.utilization, 105);
        assert_eq!(t.funding_factor, 0.4);
        assert_eq!(t.renovation_funding_factor, 0.4);
        assert_eq!(t.modified_age, 30);
        assert_eq!(t.modified_age2, 20);
        assert_eq!(t.systems_deficient, 3);
        assert_eq!(t.minor_systems_deficient, 1);
        assert_eq!(t.campus_score, 3);
        assert_eq!(t.ea_index, 4);
        assert!(t.policy_warnings().is_empty());
    }

    #[test]
    fn assignments_route_to_fields() {
        let mut store = ThresholdStore::default();
        store.apply_assignment("utilization=110").unwrap();
        store.apply_assignment("funding-factor=0.55").unwrap();
        store.apply_assignment("EA_INDEX=2").unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.utilization, 110);
        assert_eq!(snapshot.funding_factor, 0.55);
        assert_eq!(snapshot.ea_index, 2);
    }

    #[test]
    fn bad_assignments_are_rejected() {
        let mut store = ThresholdStore::default();
        assert!(store.apply_assignment("utilization").is_err());
        assert!(store.apply_assignment("height=3").is_err());
        assert!(store.apply_assignment("modified_age=old").is_err());
        assert_eq!(store.snapshot(), ThresholdSet::default());
    }

    #[test]
    fn out_of_range_ordinal_is_accepted() {
        let mut store = ThresholdStore::default();
        store.apply(ThresholdField::CampusScore, "9").unwrap();
        assert_eq!(store.snapshot().campus_score, 9);
        assert_eq!(
            ThresholdField::CampusScore.display_value(&store.snapshot()),
            "9 (Unknown)"
        );
    }

    #[test]
    fn snapshot_is_detached_from_later_changes() {
        let mut store = ThresholdStore::default();
        let before = store.snapshot();
        store.set_modified_age(45);
        assert_eq!(before.modified_age, 30);
        assert_eq!(store.snapshot().modified_age, 45);
    }

    #[test]
    fn policy_violations_are_reported_not_enforced() {
        let mut store = ThresholdStore::default();
        store.set_modified_age2(35);
        store.set_minor_systems_deficient(5);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.modified_age2, 35);
        assert_eq!(snapshot.policy_warnings().len(), 2);
    }

    #[test]
    fn every_field_name_round_trips() {
        for field in ThresholdField::ALL {
            assert_eq!(field.name().parse::<ThresholdField>().unwrap(), field);
        }
    }
}
