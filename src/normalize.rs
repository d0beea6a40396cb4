use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;

use crate::labels::ConditionLabel;
use crate::models::{BuildingRecord, SchoolType};

pub type RawRow = HashMap<String, String>;

const NAME_COLUMNS: [&str; 2] = ["School Name", "School (Full) Name"];
const GRADES: &str = "Grades Served";
const CURRENT_ENROLLMENT: &str = "Current Enrollment (SY 24-25)";
const PROJECTED_ENROLLMENT: &str = "Projected Enrollment (SY 33-34)";
const CAPACITY: &str = "State Rated Capacity";
const UTILIZATION: &str = "Utilization (SY33-34) (Percent)";
const UTILIZATION_TODAY: &str = "Utilization (SY24-25) (Percent)";
const FUNDING: &str = "State Funding Score";
const CAMPUS_GRADE: &str = "FCA Campus Grade (34/35)";
const SIZE_ADEQUACY: &str = "Building Size Adequacy";
const EA_VALUE: &str = "EA Value";
const MODIFIED_AGE: &str = "Modified Building Age";
const HISTORIC: &str = "Historic Building";
const SYSTEMS: &str = "System";

/// Grade markers checked in priority order; the first hit decides.
const SCHOOL_TYPE_RULES: [(SchoolType, &[&str]); 3] = [
    (SchoolType::Elementary, &["K", "1", "2", "3", "4", "5"]),
    (SchoolType::Middle, &["6", "7", "8"]),
    (SchoolType::High, &["9", "10", "11", "12"]),
];

fn field<'a>(row: &'a RawRow, key: &str) -> &'a str {
    row.get(key).map(String::as_str).unwrap_or("")
}

fn first_present<'a>(row: &'a RawRow, keys: &[&str]) -> &'a str {
    keys.iter()
        .map(|key| field(row, key))
        .find(|value| !value.is_empty())
        .unwrap_or("")
}

/// Longest numeric prefix, ignoring leading whitespace ("120%" reads as 120).
pub fn parse_leading_float(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start || has_digits {
            has_digits |= frac_end > frac_start;
            end = frac_end;
        }
    }
    if !has_digits {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].trim_end_matches('.').parse::<f64>().ok()
}

/// Leading integer digits, ignoring leading whitespace ("30.7" reads as 30).
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse::<i64>().ok()
}

/// Funding score as a ratio: "45%" and "45" both become 0.45. A blank cell
/// reads as 0; only unreadable text is absent.
pub fn parse_funding_factor(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    let without_percent = trimmed.strip_suffix('%').unwrap_or(trimmed);
    parse_leading_float(without_percent).map(|value| value / 100.0)
}

pub fn school_type(grades_served: &str) -> SchoolType {
    SCHOOL_TYPE_RULES
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| grades_served.contains(m)))
        .map(|(school_type, _)| *school_type)
        .unwrap_or(SchoolType::Other)
}

pub fn normalize_row(row: &RawRow) -> BuildingRecord {
    let grades_served = field(row, GRADES).to_string();

    BuildingRecord {
        name: first_present(row, &NAME_COLUMNS).to_string(),
        school_type: school_type(&grades_served),
        grades_served,
        current_enrollment: field(row, CURRENT_ENROLLMENT).to_string(),
        projected_enrollment: field(row, PROJECTED_ENROLLMENT).to_string(),
        state_rated_capacity: field(row, CAPACITY).to_string(),
        utilization: parse_leading_float(field(row, UTILIZATION)),
        utilization_today: parse_leading_float(field(row, UTILIZATION_TODAY)),
        funding_factor: parse_funding_factor(field(row, FUNDING)),
        campus_score: ConditionLabel::parse_campus(field(row, CAMPUS_GRADE)),
        campus_score_today: ConditionLabel::parse_campus(field(row, SIZE_ADEQUACY)),
        ea_value: ConditionLabel::parse_adequacy(field(row, EA_VALUE)),
        modified_age: parse_leading_int(field(row, MODIFIED_AGE)),
        historic_building: field(row, HISTORIC).trim().eq_ignore_ascii_case("yes"),
        fair_or_deficient_count: parse_leading_float(field(row, SYSTEMS)),
    }
}

pub fn load_reader<R: Read>(reader: R) -> anyhow::Result<Vec<BuildingRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers().context("missing CSV header row")?.clone();
    let mut records = Vec::new();

    for (line, result) in reader.records().enumerate() {
        let fields = result.with_context(|| format!("malformed CSV row {}", line + 1))?;
        // Short rows simply lack the trailing columns.
        let row: RawRow = headers
            .iter()
            .zip(fields.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        if row.values().all(|value| value.trim().is_empty()) {
            continue;
        }
        let record = normalize_row(&row);
        if record.name.is_empty() {
            tracing::warn!(row = line + 1, "building row has no name column value");
        }
        records.push(record);
    }

    Ok(records)
}

pub fn load_csv(path: &Path) -> anyhow::Result<Vec<BuildingRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open building data {}", path.display()))?;
    let records = load_reader(file)
        .with_context(|| format!("failed to read building data {}", path.display()))?;
    tracing::info!(count = records.len(), source = %path.display(), "loaded building records");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn permissive_float_reads_numeric_prefix() {
        assert_eq!(parse_leading_float("120"), Some(120.0));
        assert_eq!(parse_leading_float(" 98.5%"), Some(98.5));
        assert_eq!(parse_leading_float("1e2x"), Some(100.0));
        assert_eq!(parse_leading_float(".5"), Some(0.5));
        assert_eq!(parse_leading_float("abc"), None);
        assert_eq!(parse_leading_float(""), None);
    }

    #[test]
    fn permissive_int_truncates() {
        assert_eq!(parse_leading_int("30.7"), Some(30));
        assert_eq!(parse_leading_int(" 45 years"), Some(45));
        assert_eq!(parse_leading_int("n/a"), None);
    }

    #[test]
    fn funding_factor_strips_percent() {
        assert_eq!(parse_funding_factor("45%"), Some(0.45));
        assert_eq!(parse_funding_factor("80"), Some(0.8));
        assert_eq!(parse_funding_factor("unknown"), None);
        assert_eq!(parse_funding_factor(""), Some(0.0));
        assert_eq!(parse_funding_factor("  "), Some(0.0));
    }

    #[test]
    fn missing_funding_cell_counts_as_zero_funding() {
        use crate::addition::{determine_outcome, AdditionOutcome};
        use crate::models::CampusMode;
        use crate::renovation::RenovationGates;
        use crate::thresholds::ThresholdSet;

        let record = normalize_row(&row(&[
            ("School Name", "Annex"),
            ("Utilization (SY33-34) (Percent)", "120"),
        ]));
        assert_eq!(record.funding_factor, Some(0.0));

        let thresholds = ThresholdSet {
            funding_factor: 0.0,
            ..ThresholdSet::default()
        };
        assert_eq!(determine_outcome(&record, &thresholds), AdditionOutcome::Redistrict);
        assert_eq!(
            determine_outcome(&record, &ThresholdSet::default()),
            AdditionOutcome::Addition
        );

        let below_zero = ThresholdSet {
            renovation_funding_factor: -0.1,
            ..ThresholdSet::default()
        };
        assert!(RenovationGates::evaluate(&record, &below_zero, CampusMode::Future).funding);
        assert!(!RenovationGates::evaluate(&record, &thresholds, CampusMode::Future).funding);
    }

    #[test]
    fn school_type_first_match_wins() {
        assert_eq!(school_type("K-5"), SchoolType::Elementary);
        assert_eq!(school_type("6-8"), SchoolType::Middle);
        assert_eq!(school_type("9"), SchoolType::High);
        // "10" carries a "1", which the elementary rule sees first.
        assert_eq!(school_type("10-12"), SchoolType::Elementary);
        assert_eq!(school_type("Admin"), SchoolType::Other);
    }

    #[test]
    fn name_falls_back_to_full_name_column() {
        let record = normalize_row(&row(&[
            ("School Name", ""),
            ("School (Full) Name", "Dows Lane Elementary"),
        ]));
        assert_eq!(record.name, "Dows Lane Elementary");
    }

    #[test]
    fn full_row_normalizes() {
        let record = normalize_row(&row(&[
            ("School Name", "Main Street School"),
            ("Grades Served", "6-8"),
            ("Utilization (SY33-34) (Percent)", "112.5"),
            ("Utilization (SY24-25) (Percent)", "97"),
            ("State Funding Score", "52%"),
            ("FCA Campus Grade (34/35)", "constrained"),
            ("Building Size Adequacy", "No Constraints"),
            ("EA Value", " Significantly Constrained "),
            ("Modified Building Age", "41"),
            ("Historic Building", " YES "),
            ("System", "4"),
        ]));

        assert_eq!(record.school_type, SchoolType::Middle);
        assert_eq!(record.utilization, Some(112.5));
        assert_eq!(record.utilization_today, Some(97.0));
        assert_eq!(record.funding_factor, Some(0.52));
        assert_eq!(record.campus_score, Some(ConditionLabel::Constrained));
        assert_eq!(record.campus_score_today, Some(ConditionLabel::NoConstraints));
        assert_eq!(record.ea_value, ConditionLabel::SignificantlyConstrained);
        assert_eq!(record.modified_age, Some(41));
        assert!(record.historic_building);
        assert_eq!(record.fair_or_deficient_count, Some(4.0));
    }

    #[test]
    fn missing_columns_fall_back_to_defaults() {
        let record = normalize_row(&row(&[("School Name", "Annex")]));
        assert_eq!(record.utilization, None);
        assert_eq!(record.funding_factor, Some(0.0));
        assert_eq!(record.campus_score, None);
        assert_eq!(record.ea_value, ConditionLabel::NotApplicable);
        assert_eq!(record.modified_age(), 0);
        assert!(!record.historic_building);
        assert_eq!(record.school_type, SchoolType::Other);
    }

    #[test]
    fn loads_csv_and_skips_blank_rows() {
        let data = "\
School Name,Grades Served,Utilization (SY33-34) (Percent),EA Value
Dows Lane,K-3,101,Constrained
,,,
Irvington Middle,6-8,88,Bogus
";
        let records = load_reader(data.as_bytes()).expect("csv loads");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Dows Lane");
        assert_eq!(records[0].ea_value, ConditionLabel::Constrained);
        assert_eq!(records[1].ea_value, ConditionLabel::NotApplicable);
    }

    #[test]
    fn short_rows_are_tolerated() {
        let data = "School Name,Grades Served,System\nAnnex\n";
        let records = load_reader(data.as_bytes()).expect("csv loads");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fair_or_deficient_count, None);
    }

    #[test]
    fn load_csv_reports_missing_file() {
        let err = load_csv(Path::new("/nonexistent/decision_flow.csv")).unwrap_err();
        assert!(err.to_string().contains("failed to open building data"));
    }
}
