use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

const CLASSROOM_ADDITION: &str = "Classroom Addition";
const ASSEMBLY_TYPES: [&str; 3] = ["Gym", "Cafeteria", "Auditorium"];
/// Smallest assembly footprint (total area) that earns the assembly bonus.
const ASSEMBLY_MIN_AREA_SQFT: f64 = 5000.0;
const CLASSROOM_BONUS_AREA_SQFT: f64 = 2000.0;
const ASSEMBLY_BONUS: f64 = 25.0;
const COMMUNITY_BONUS: f64 = 15.0;
const EXT_LEARNING_PENALTY_AREA_SQFT: f64 = 5000.0;
const EXT_LEARNING_PENALTY: f64 = 7.0;
const METERS_PER_FOOT: f64 = 0.3048;

const BASE_SCORES: [(&str, f64); 7] = [
    ("Classrooms", 56.0),
    ("Ext. Learning", 60.0),
    ("Safety/Security", 90.0),
    ("Organization", 75.0),
    ("Assembly", 34.0),
    ("Community", 60.0),
    ("Presence", 65.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MassingParams {
    pub initial_capacity: u32,
    pub students: u32,
    pub sqft_per_capacity_unit: f64,
    pub seats_per_capacity_unit: u32,
    pub feet_per_story: f64,
    pub cost_per_sqft: f64,
    /// Share of capital cost counted as hard cost; the rest is soft cost.
    pub hard_cost_share: f64,
}

impl Default for MassingParams {
    fn default() -> Self {
        Self {
            initial_capacity: 500,
            students: 490,
            sqft_per_capacity_unit: 2000.0,
            seats_per_capacity_unit: 24,
            feet_per_story: 12.0,
            cost_per_sqft: 1200.0,
            hard_cost_share: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Footprint {
    pub building_type: String,
    #[serde(default)]
    pub stories: Option<u32>,
    pub base_area_sqft: f64,
}

impl Footprint {
    pub fn stories(&self) -> u32 {
        self.stories.filter(|s| *s > 0).unwrap_or(1)
    }

    pub fn total_area_sqft(&self) -> f64 {
        self.base_area_sqft * f64::from(self.stories())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootprintLine {
    pub building_type: String,
    pub stories: u32,
    pub total_area_sqft: f64,
    pub height_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectScore {
    pub subject: &'static str,
    pub score: f64,
    pub full_mark: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MassingSummary {
    pub footprints: Vec<FootprintLine>,
    pub total_area_sqft: f64,
    pub total_stories: u32,
    pub area_by_type: BTreeMap<String, f64>,
    pub capacity: u32,
    pub students: u32,
    pub utilization_percent: f64,
    pub capital_cost: f64,
    pub hard_cost: f64,
    pub soft_cost: f64,
    pub scores: Vec<SubjectScore>,
}

pub fn capacity(classroom_area_sqft: f64, params: &MassingParams) -> u32 {
    if classroom_area_sqft <= 0.0 || params.sqft_per_capacity_unit <= 0.0 {
        return params.initial_capacity;
    }
    // The float-to-int cast saturates, so huge areas pin at u32::MAX seats.
    let units = (classroom_area_sqft / params.sqft_per_capacity_unit).floor() as u32;
    params
        .initial_capacity
        .saturating_add(units.saturating_mul(params.seats_per_capacity_unit))
}

pub fn adequacy_scores(footprints: &[Footprint]) -> Vec<SubjectScore> {
    let classroom_area: f64 = footprints
        .iter()
        .filter(|f| f.building_type == CLASSROOM_ADDITION)
        .map(Footprint::total_area_sqft)
        .sum();
    let qualifying_assembly = footprints.iter().any(|f| {
        ASSEMBLY_TYPES.contains(&f.building_type.as_str())
            && f.total_area_sqft() >= ASSEMBLY_MIN_AREA_SQFT
    });
    let base_area: f64 = footprints.iter().map(|f| f.base_area_sqft).sum();

    BASE_SCORES
        .iter()
        .map(|&(subject, base)| {
            let score = match subject {
                "Classrooms" => base + (classroom_area / CLASSROOM_BONUS_AREA_SQFT).floor(),
                "Assembly" if qualifying_assembly => base + ASSEMBLY_BONUS,
                "Community" if qualifying_assembly => base + COMMUNITY_BONUS,
                "Ext. Learning" => {
                    base - (base_area / EXT_LEARNING_PENALTY_AREA_SQFT).floor()
                        * EXT_LEARNING_PENALTY
                }
                _ => base,
            };
            SubjectScore {
                subject,
                score: score.clamp(0.0, 100.0),
                full_mark: 100.0,
            }
        })
        .collect()
}

pub fn summarize(footprints: &[Footprint], params: &MassingParams) -> MassingSummary {
    let mut area_by_type = BTreeMap::new();
    let lines: Vec<FootprintLine> = footprints
        .iter()
        .map(|f| {
            *area_by_type.entry(f.building_type.clone()).or_insert(0.0) += f.total_area_sqft();
            FootprintLine {
                building_type: f.building_type.clone(),
                stories: f.stories(),
                total_area_sqft: f.total_area_sqft(),
                height_m: f64::from(f.stories()) * params.feet_per_story * METERS_PER_FOOT,
            }
        })
        .collect();

    let total_area_sqft: f64 = lines.iter().map(|line| line.total_area_sqft).sum();
    let classroom_area = area_by_type.get(CLASSROOM_ADDITION).copied().unwrap_or(0.0);
    let capacity = capacity(classroom_area, params);
    let capital_cost = total_area_sqft * params.cost_per_sqft;

    MassingSummary {
        total_stories: lines
            .iter()
            .fold(0u32, |total, line| total.saturating_add(line.stories)),
        footprints: lines,
        total_area_sqft,
        area_by_type,
        capacity,
        students: params.students,
        utilization_percent: if capacity > 0 {
            f64::from(params.students) / f64::from(capacity) * 100.0
        } else {
            0.0
        },
        capital_cost,
        hard_cost: capital_cost * params.hard_cost_share,
        soft_cost: capital_cost * (1.0 - params.hard_cost_share),
        scores: adequacy_scores(footprints),
    }
}

pub fn load_reader<R: Read>(reader: R) -> anyhow::Result<Vec<Footprint>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut footprints = Vec::new();
    for (line, result) in reader.deserialize::<Footprint>().enumerate() {
        footprints.push(result.with_context(|| format!("invalid footprint row {}", line + 1))?);
    }
    Ok(footprints)
}

pub fn load_footprints(path: &Path) -> anyhow::Result<Vec<Footprint>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open footprints {}", path.display()))?;
    let footprints = load_reader(file)?;
    tracing::info!(count = footprints.len(), source = %path.display(), "loaded footprints");
    Ok(footprints)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn footprint(building_type: &str, stories: Option<u32>, base: f64) -> Footprint {
        Footprint {
            building_type: building_type.to_string(),
            stories,
            base_area_sqft: base,
        }
    }

    fn score(summary: &MassingSummary, subject: &str) -> f64 {
        summary
            .scores
            .iter()
            .find(|s| s.subject == subject)
            .map(|s| s.score)
            .unwrap_or(f64::NAN)
    }

    #[test]
    fn nothing_drawn_keeps_baseline() {
        let summary = summarize(&[], &MassingParams::default());
        assert_eq!(summary.capacity, 500);
        assert_eq!(summary.total_area_sqft, 0.0);
        assert_eq!(summary.capital_cost, 0.0);
        assert!((summary.utilization_percent - 98.0).abs() < 1e-9);
        assert_eq!(score(&summary, "Classrooms"), 56.0);
        assert_eq!(score(&summary, "Assembly"), 34.0);
    }

    #[test]
    fn classroom_addition_adds_seats_in_whole_units() {
        let params = MassingParams::default();
        let summary = summarize(&[footprint("Classroom Addition", Some(2), 2500.0)], &params);
        // 5000 sq ft is two full 2000 sq ft units.
        assert_eq!(summary.capacity, 548);
        assert_eq!(summary.total_area_sqft, 5000.0);
        assert_eq!(score(&summary, "Classrooms"), 58.0);
        assert_eq!(score(&summary, "Ext. Learning"), 60.0);
    }

    #[test]
    fn costs_split_seventy_thirty() {
        let summary = summarize(&[footprint("Gym", None, 1000.0)], &MassingParams::default());
        assert_eq!(summary.total_stories, 1);
        assert_eq!(summary.capital_cost, 1_200_000.0);
        assert!((summary.hard_cost - 840_000.0).abs() < 1e-6);
        assert!((summary.soft_cost - 360_000.0).abs() < 1e-6);
    }

    #[test]
    fn large_assembly_space_lifts_assembly_and_community() {
        let summary = summarize(
            &[footprint("Auditorium", Some(1), 6000.0)],
            &MassingParams::default(),
        );
        assert_eq!(score(&summary, "Assembly"), 59.0);
        assert_eq!(score(&summary, "Community"), 75.0);
        assert_eq!(score(&summary, "Ext. Learning"), 53.0);
        assert_eq!(summary.capacity, 500);
    }

    #[test]
    fn scores_clamp_to_range() {
        let summary = summarize(
            &[footprint("Classroom Addition", Some(1), 60_000.0)],
            &MassingParams::default(),
        );
        assert_eq!(score(&summary, "Classrooms"), 86.0);
        assert_eq!(score(&summary, "Ext. Learning"), 0.0);
    }

    #[test]
    fn enormous_footprints_saturate_instead_of_overflowing() {
        let summary = summarize(
            &[
                footprint("Classroom Addition", Some(u32::MAX), 1e12),
                footprint("Gym", Some(u32::MAX), 100.0),
            ],
            &MassingParams::default(),
        );
        assert_eq!(summary.capacity, u32::MAX);
        assert_eq!(summary.total_stories, u32::MAX);
        assert!(summary.utilization_percent < 1.0);
        assert_eq!(score(&summary, "Classrooms"), 100.0);
    }

    #[test]
    fn heights_follow_story_count() {
        let summary = summarize(
            &[footprint("Cafeteria", Some(3), 100.0)],
            &MassingParams::default(),
        );
        let height = summary.footprints[0].height_m;
        assert!((height - 3.0 * 12.0 * 0.3048).abs() < 1e-9);
        assert_eq!(summary.area_by_type.get("Cafeteria"), Some(&300.0));
    }

    #[test]
    fn reads_footprint_csv() {
        let data = "building_type,stories,base_area_sqft\nGym, 2 ,3000\nClassroom Addition,,1500\n";
        let footprints = load_reader(data.as_bytes()).unwrap();
        assert_eq!(footprints.len(), 2);
        assert_eq!(footprints[0].stories(), 2);
        assert_eq!(footprints[1].stories, None);
        assert_eq!(footprints[1].stories(), 1);
    }

    #[test]
    fn bad_footprint_row_is_reported() {
        let data = "building_type,stories,base_area_sqft\nGym,2,lots\n";
        let err = load_reader(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("invalid footprint row 1"));
    }
}
