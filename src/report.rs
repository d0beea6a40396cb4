use std::fmt::Write;

use chrono::NaiveDate;

use crate::addition::AdditionEvaluation;
use crate::models::{BuildingRecord, CampusMode};
use crate::renovation::RenovationEvaluation;
use crate::summary::{self, GradeFilter, OutcomeSummary};
use crate::table;
use crate::thresholds::{ThresholdField, ThresholdSet};

fn write_summary(output: &mut String, title: &str, summary: &OutcomeSummary) {
    let _ = writeln!(output, "## {title}");
    if summary.total == 0 {
        let _ = writeln!(output, "No buildings in view.");
        return;
    }
    for entry in &summary.counts {
        let _ = writeln!(output, "- {}: {}", entry.label, entry.count);
    }
    let _ = writeln!(output, "- Total: {}", summary.total);
}

pub fn build_report(
    records: &[BuildingRecord],
    thresholds: &ThresholdSet,
    mode: CampusMode,
    filter: &GradeFilter,
    generated: NaiveDate,
) -> String {
    let addition = AdditionEvaluation::new(*thresholds);
    let renovation = RenovationEvaluation::new(*thresholds, mode);
    let addition_summary = summary::summarize(records, &addition, filter);
    let renovation_summary = summary::summarize(records, &renovation, filter);

    let mut output = String::new();
    let scope = match filter {
        GradeFilter::All => "all grade levels".to_string(),
        GradeFilter::Only(grades) => grades
            .iter()
            .map(|grade| summary::grade_display(grade))
            .collect::<Vec<_>>()
            .join(", "),
    };

    let _ = writeln!(output, "# Facility Decision Report");
    let _ = writeln!(
        output,
        "Generated {} for {} ({} campus horizon)",
        generated,
        scope,
        mode.horizon_label()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Thresholds");
    for field in ThresholdField::ALL {
        let _ = writeln!(output, "- {}: {}", field, field.display_value(thresholds));
    }

    let _ = writeln!(output);
    write_summary(&mut output, "Addition Evaluation", &addition_summary);
    let _ = writeln!(output);
    write_summary(&mut output, "Renovation or Replacement", &renovation_summary);

    let rows = table::build_rows(records, filter, &addition, &renovation);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Building Decisions");

    if rows.is_empty() {
        let _ = writeln!(output, "No buildings in view.");
    } else {
        let _ = writeln!(output, "| Building | Grades | Addition | Decision |");
        let _ = writeln!(output, "| --- | --- | --- | --- |");
        for row in rows {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                row.name, row.grades_served, row.addition, row.decision
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<BuildingRecord> {
        let mut dows = BuildingRecord::named("Dows Lane");
        dows.grades_served = "K-3".to_string();
        dows.utilization = Some(120.0);
        dows.funding_factor = Some(0.6);
        dows.modified_age = Some(12);

        let mut high = BuildingRecord::named("Irvington High");
        high.grades_served = "9-12".to_string();
        high.utilization = Some(80.0);
        high.modified_age = Some(55);
        high.fair_or_deficient_count = Some(5.0);

        vec![dows, high]
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date")
    }

    #[test]
    fn report_lists_thresholds_summaries_and_rows() {
        let report = build_report(
            &sample(),
            &ThresholdSet::default(),
            CampusMode::Future,
            &GradeFilter::All,
            date(),
        );

        assert!(report.starts_with("# Facility Decision Report"));
        assert!(report.contains("Generated 2026-03-02 for all grade levels (FY34-35 campus horizon)"));
        assert!(report.contains("- utilization: 105%"));
        assert!(report.contains("- ea_index: 4 (No Constraints)"));
        assert!(report.contains("- Redistrict: 1"));
        assert!(report.contains("- Repurpose: 1"));
        assert!(report.contains("- Total: 2"));
        assert!(report.contains("| Dows Lane | K-3 | Redistrict | Relocate |"));
        assert!(report.contains("| Irvington High | 9-12 | Not Applicable | Repurpose |"));
    }

    #[test]
    fn empty_view_says_so() {
        let filter = GradeFilter::from_selection(["6-8"]);
        let report = build_report(&sample(), &ThresholdSet::default(), CampusMode::Today, &filter, date());
        assert!(report.contains("for 6-8 (FY24-25 campus horizon)"));
        assert!(report.contains("No buildings in view."));
        assert!(!report.contains("| Building |"));
    }
}
