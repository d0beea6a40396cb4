use serde::{Deserialize, Serialize};

use crate::labels::ConditionLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchoolType {
    Elementary,
    Middle,
    High,
    Other,
}

impl SchoolType {
    pub fn as_str(self) -> &'static str {
        match self {
            SchoolType::Elementary => "elementary",
            SchoolType::Middle => "middle",
            SchoolType::High => "high",
            SchoolType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CampusMode {
    #[default]
    Future,
    Today,
}

impl CampusMode {
    pub fn horizon_label(self) -> &'static str {
        match self {
            CampusMode::Future => "FY34-35",
            CampusMode::Today => "FY24-25",
        }
    }
}

/// Numeric fields keep `None` when the source cell was missing or could not
/// be parsed; a blank funding cell is the one exception and reads as 0. The accessor methods apply the classification defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingRecord {
    pub name: String,
    pub grades_served: String,
    pub current_enrollment: String,
    pub projected_enrollment: String,
    pub state_rated_capacity: String,
    pub utilization: Option<f64>,
    pub utilization_today: Option<f64>,
    pub funding_factor: Option<f64>,
    pub school_type: SchoolType,
    pub campus_score: Option<ConditionLabel>,
    pub campus_score_today: Option<ConditionLabel>,
    pub ea_value: ConditionLabel,
    pub modified_age: Option<i64>,
    pub historic_building: bool,
    pub fair_or_deficient_count: Option<f64>,
}

impl BuildingRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grades_served: String::new(),
            current_enrollment: String::new(),
            projected_enrollment: String::new(),
            state_rated_capacity: String::new(),
            utilization: None,
            utilization_today: None,
            funding_factor: None,
            school_type: SchoolType::Other,
            campus_score: None,
            campus_score_today: None,
            ea_value: ConditionLabel::NotApplicable,
            modified_age: None,
            historic_building: false,
            fair_or_deficient_count: None,
        }
    }

    pub fn modified_age(&self) -> i64 {
        self.modified_age.unwrap_or(0)
    }

    pub fn fair_or_deficient_count(&self) -> f64 {
        self.fair_or_deficient_count.unwrap_or(0.0)
    }

    pub fn campus_score_for(&self, mode: CampusMode) -> Option<ConditionLabel> {
        match mode {
            CampusMode::Future => self.campus_score,
            CampusMode::Today => self.campus_score_today,
        }
    }

    pub fn grade_key(&self) -> String {
        self.grades_served.trim().to_lowercase()
    }

    /// Projected utilization missing or under 100 percent.
    pub fn below_capacity(&self) -> bool {
        self.utilization.map_or(true, |u| u.is_nan() || u < 100.0)
    }
}
