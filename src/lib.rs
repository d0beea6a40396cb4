pub mod addition;
pub mod config;
pub mod flow;
pub mod labels;
pub mod massing;
pub mod models;
pub mod normalize;
pub mod renovation;
pub mod report;
pub mod summary;
pub mod table;
pub mod thresholds;

pub use addition::{determine_outcome, AdditionEvaluation, AdditionOutcome};
pub use flow::{DecisionTrace, Evaluation, Outcome};
pub use models::{BuildingRecord, CampusMode};
pub use renovation::{determine_future_outcome, RenovationEvaluation, RenovationOutcome};
pub use summary::{summarize, GradeFilter};
pub use thresholds::{ThresholdSet, ThresholdStore};
