use serde::Serialize;

use crate::addition::AdditionEvaluation;
use crate::flow::{Evaluation, Outcome};
use crate::models::BuildingRecord;
use crate::renovation::RenovationEvaluation;
use crate::summary::GradeFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TableColumn {
    All,
    Name,
    Grades,
    SchoolType,
    Addition,
    Decision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub name: String,
    pub grades_served: String,
    pub school_type: &'static str,
    pub addition: &'static str,
    pub decision: &'static str,
}

impl SummaryRow {
    fn cells(&self) -> [&str; 5] {
        [
            self.name.as_str(),
            self.grades_served.as_str(),
            self.school_type,
            self.addition,
            self.decision,
        ]
    }

    fn cell(&self, column: TableColumn) -> Option<&str> {
        match column {
            TableColumn::All => None,
            TableColumn::Name => Some(self.name.as_str()),
            TableColumn::Grades => Some(self.grades_served.as_str()),
            TableColumn::SchoolType => Some(self.school_type),
            TableColumn::Addition => Some(self.addition),
            TableColumn::Decision => Some(self.decision),
        }
    }
}

pub fn build_rows(
    records: &[BuildingRecord],
    filter: &GradeFilter,
    addition: &AdditionEvaluation,
    renovation: &RenovationEvaluation,
) -> Vec<SummaryRow> {
    filter
        .apply(records)
        .map(|record| SummaryRow {
            name: record.name.clone(),
            grades_served: record.grades_served.clone(),
            school_type: record.school_type.as_str(),
            addition: addition.classify(record).label(),
            decision: renovation.classify(record).label(),
        })
        .collect()
}

pub fn filter_rows(rows: Vec<SummaryRow>, text: &str, column: TableColumn) -> Vec<SummaryRow> {
    let needle = text.to_lowercase();
    if needle.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|row| match row.cell(column) {
            Some(cell) => cell.to_lowercase().contains(&needle),
            None => row
                .cells()
                .iter()
                .any(|cell| cell.to_lowercase().contains(&needle)),
        })
        .collect()
}

/// Stable sort on one column. Sorting on `All` keeps source order.
pub fn sort_rows(rows: &mut [SummaryRow], column: TableColumn, descending: bool) {
    if column == TableColumn::All {
        return;
    }
    rows.sort_by(|a, b| {
        let ordering = a
            .cell(column)
            .unwrap_or_default()
            .to_lowercase()
            .cmp(&b.cell(column).unwrap_or_default().to_lowercase());
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}
