use std::collections::BTreeSet;

use serde::Serialize;

use crate::flow::{DecisionTrace, Evaluation, Outcome};
use crate::models::BuildingRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GradeFilter {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl GradeFilter {
    /// An empty selection means no filter.
    pub fn from_selection<I, S>(grades: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected: BTreeSet<String> = grades
            .into_iter()
            .map(|grade| grade.as_ref().trim().to_lowercase())
            .filter(|grade| !grade.is_empty())
            .collect();
        if selected.is_empty() {
            GradeFilter::All
        } else {
            GradeFilter::Only(selected)
        }
    }

    pub fn includes(&self, record: &BuildingRecord) -> bool {
        match self {
            GradeFilter::All => true,
            GradeFilter::Only(selected) => selected.contains(&record.grade_key()),
        }
    }

    pub fn apply<'a>(&'a self, records: &'a [BuildingRecord]) -> impl Iterator<Item = &'a BuildingRecord> + 'a {
        records.iter().filter(move |record| self.includes(record))
    }
}

/// Distinct grade levels present in the data, lowercased and sorted.
pub fn grade_levels(records: &[BuildingRecord]) -> Vec<String> {
    records
        .iter()
        .map(BuildingRecord::grade_key)
        .filter(|grade| !grade.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Title-cased grade level for display ("k-5 school" -> "K-5 School").
pub fn grade_display(grade: &str) -> String {
    let mut out = String::with_capacity(grade.len());
    let mut at_word_start = true;
    for c in grade.chars() {
        if at_word_start && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}

pub fn find_building<'a>(
    records: &'a [BuildingRecord],
    name: &str,
    filter: &'a GradeFilter,
) -> Option<&'a BuildingRecord> {
    filter.apply(records).find(|record| record.name == name)
}

pub fn trace_by_name<E: Evaluation>(
    records: &[BuildingRecord],
    name: &str,
    filter: &GradeFilter,
    evaluation: &E,
) -> DecisionTrace {
    find_building(records, name, filter)
        .map(|record| evaluation.trace(record))
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeCount {
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeSummary {
    pub counts: Vec<OutcomeCount>,
    pub total: usize,
}

impl OutcomeSummary {
    pub fn count(&self, label: &str) -> usize {
        self.counts
            .iter()
            .find(|entry| entry.label == label)
            .map_or(0, |entry| entry.count)
    }
}

/// Count outcomes over the included records. Every known outcome gets a row,
/// zero or not; anything unrecognized lands in the not-applicable bucket.
pub fn summarize<E: Evaluation>(
    records: &[BuildingRecord],
    evaluation: &E,
    filter: &GradeFilter,
) -> OutcomeSummary {
    let known = <E::Outcome as Outcome>::ALL;
    let fallback = known
        .iter()
        .position(|outcome| *outcome == E::Outcome::NOT_APPLICABLE)
        .unwrap_or(known.len().saturating_sub(1));
    let mut tallies = vec![0usize; known.len()];
    let mut total = 0;

    for record in filter.apply(records) {
        let outcome = evaluation.classify(record);
        let slot = known
            .iter()
            .position(|candidate| *candidate == outcome)
            .unwrap_or(fallback);
        if let Some(tally) = tallies.get_mut(slot) {
            *tally += 1;
        }
        total += 1;
    }

    OutcomeSummary {
        counts: known
            .iter()
            .zip(tallies)
            .map(|(outcome, count)| OutcomeCount {
                label: outcome.label(),
                count,
            })
            .collect(),
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addition::AdditionEvaluation;
    use crate::labels::ConditionLabel;
    use crate::models::CampusMode;
    use crate::renovation::RenovationEvaluation;
    use crate::thresholds::ThresholdSet;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn building(name: &str, grades: &str, utilization: f64, funding: f64) -> BuildingRecord {
        let mut record = BuildingRecord::named(name);
        record.grades_served = grades.to_string();
        record.utilization = Some(utilization);
        record.funding_factor = Some(funding);
        record
    }

    fn district() -> Vec<BuildingRecord> {
        vec![
            building("Dows Lane", "K-3", 120.0, 0.5),
            building("Main Street", "4-5", 102.0, 0.2),
            building("Irvington Middle", "6-8", 130.0, 0.1),
            building("Irvington High", " 9-12 ", 90.0, 0.9),
        ]
    }

    #[test]
    fn empty_selection_includes_everything() {
        let filter = GradeFilter::from_selection(Vec::<String>::new());
        assert_eq!(filter, GradeFilter::All);
        assert_eq!(filter.apply(&district()).count(), 4);
    }

    #[test]
    fn selection_matches_trimmed_lowercase_grades() {
        let filter = GradeFilter::from_selection(["9-12", "K-3"]);
        let records = district();
        let names: Vec<_> = filter.apply(&records).map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Dows Lane", "Irvington High"]);
    }

    #[test]
    fn addition_summary_counts_each_outcome() {
        let summary = summarize(
            &district(),
            &AdditionEvaluation::new(ThresholdSet::default()),
            &GradeFilter::All,
        );
        assert_eq!(summary.count("Redistrict"), 1);
        assert_eq!(summary.count("Portables"), 1);
        assert_eq!(summary.count("Addition"), 1);
        assert_eq!(summary.count("Not Applicable"), 1);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.counts.len(), 4);
    }

    #[test]
    fn summary_respects_filter() {
        let filter = GradeFilter::from_selection(["6-8"]);
        let summary = summarize(
            &district(),
            &AdditionEvaluation::new(ThresholdSet::default()),
            &filter,
        );
        assert_eq!(summary.total, 1);
        assert_eq!(summary.count("Addition"), 1);
        assert_eq!(summary.count("Redistrict"), 0);
    }

    #[test]
    fn empty_load_summarizes_to_zero() {
        let summary = summarize(
            &[],
            &RenovationEvaluation::new(ThresholdSet::default(), CampusMode::Future),
            &GradeFilter::All,
        );
        assert_eq!(summary.total, 0);
        assert!(summary.counts.iter().all(|entry| entry.count == 0));
    }

    #[test]
    fn counts_always_sum_to_filtered_total() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let grades = ["K-5", "6-8", "9-12", "Admin"];
        let records: Vec<_> = (0..300)
            .map(|i| {
                let mut record = building(
                    &format!("School {i}"),
                    grades[rng.gen_range(0..grades.len())],
                    rng.gen_range(50.0..150.0),
                    rng.gen_range(0.0..1.0),
                );
                record.modified_age = Some(rng.gen_range(0..70));
                record.fair_or_deficient_count = Some(rng.gen_range(0..6) as f64);
                record.campus_score = ConditionLabel::from_index(rng.gen_range(0..5));
                record
            })
            .collect();
        let filter = GradeFilter::from_selection(["k-5", "9-12"]);
        let expected = filter.apply(&records).count();

        let stage_one = summarize(&records, &AdditionEvaluation::new(ThresholdSet::default()), &filter);
        let stage_two = summarize(
            &records,
            &RenovationEvaluation::new(ThresholdSet::default(), CampusMode::Future),
            &filter,
        );
        for summary in [stage_one, stage_two] {
            assert_eq!(summary.total, expected);
            assert_eq!(summary.counts.iter().map(|entry| entry.count).sum::<usize>(), expected);
        }
    }

    #[test]
    fn lookup_miss_gives_empty_trace() {
        let evaluation = AdditionEvaluation::new(ThresholdSet::default());
        let records = district();
        assert!(trace_by_name(&records, "Nowhere", &GradeFilter::All, &evaluation).is_empty());

        let filtered_out = GradeFilter::from_selection(["6-8"]);
        assert!(find_building(&records, "Dows Lane", &filtered_out).is_none());
        assert!(!trace_by_name(&records, "Dows Lane", &GradeFilter::All, &evaluation).is_empty());
    }

    #[test]
    fn grade_levels_are_distinct_and_sorted() {
        let mut records = district();
        records.push(building("Annex", "k-3", 0.0, 0.0));
        records.push(building("Office", "", 0.0, 0.0));
        assert_eq!(grade_levels(&records), vec!["4-5", "6-8", "9-12", "k-3"]);
        assert_eq!(grade_display("k-3 elementary"), "K-3 Elementary");
    }
}
