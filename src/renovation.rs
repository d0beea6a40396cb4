use serde::Serialize;

use crate::flow::{DecisionTrace, EdgeKind, Evaluation, FlowEdge, FlowGraph, FlowNode, Outcome};
use crate::labels::{display_index, ConditionLabel};
use crate::models::{BuildingRecord, CampusMode};
use crate::thresholds::ThresholdSet;

pub mod node {
    pub const CAMPUS: &str = "campus";
    pub const ED_ADEQ: &str = "edAdeq";
    pub const FUNDING: &str = "funding";
    pub const MOD_AGE: &str = "modAge";
    pub const HISTORIC: &str = "historic";
    pub const KEEP: &str = "keep";
    pub const UPGRADE: &str = "upgrade";
    pub const MOD_AGE2: &str = "modAge2";
    pub const MINOR_SYSTEMS: &str = "minorSystems";
    pub const SYSTEMS: &str = "systems";
    pub const RELOCATE: &str = "noMajor";
    pub const SELL: &str = "MinorSystemic";
    pub const REPURPOSE: &str = "renovation";
}

pub const LINKS: [FlowEdge; 16] = [
    FlowEdge::new(node::CAMPUS, node::ED_ADEQ, EdgeKind::Yes),
    FlowEdge::new(node::ED_ADEQ, node::FUNDING, EdgeKind::Yes),
    FlowEdge::new(node::FUNDING, node::MOD_AGE, EdgeKind::Yes),
    FlowEdge::new(node::MOD_AGE, node::HISTORIC, EdgeKind::Yes),
    FlowEdge::new(node::HISTORIC, node::UPGRADE, EdgeKind::Yes),
    FlowEdge::new(node::HISTORIC, node::KEEP, EdgeKind::No),
    FlowEdge::new(node::MOD_AGE2, node::MINOR_SYSTEMS, EdgeKind::Yes),
    FlowEdge::new(node::MOD_AGE2, node::RELOCATE, EdgeKind::No),
    FlowEdge::new(node::SYSTEMS, node::SELL, EdgeKind::No),
    FlowEdge::new(node::SYSTEMS, node::REPURPOSE, EdgeKind::Yes),
    FlowEdge::new(node::MINOR_SYSTEMS, node::RELOCATE, EdgeKind::No),
    FlowEdge::new(node::MINOR_SYSTEMS, node::SYSTEMS, EdgeKind::Yes),
    FlowEdge::new(node::CAMPUS, node::MOD_AGE2, EdgeKind::Fail),
    FlowEdge::new(node::ED_ADEQ, node::MOD_AGE2, EdgeKind::Fail),
    FlowEdge::new(node::FUNDING, node::MOD_AGE2, EdgeKind::Fail),
    FlowEdge::new(node::MOD_AGE, node::MOD_AGE2, EdgeKind::Fail),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RenovationOutcome {
    Keep,
    Upgrade,
    Relocate,
    Sell,
    Repurpose,
    NotApplicable,
}

impl Outcome for RenovationOutcome {
    const ALL: &'static [Self] = &[
        RenovationOutcome::Keep,
        RenovationOutcome::Upgrade,
        RenovationOutcome::Repurpose,
        RenovationOutcome::Sell,
        RenovationOutcome::Relocate,
        RenovationOutcome::NotApplicable,
    ];
    const NOT_APPLICABLE: Self = RenovationOutcome::NotApplicable;

    fn label(self) -> &'static str {
        match self {
            RenovationOutcome::Keep => "Keep",
            RenovationOutcome::Upgrade => "Upgrade",
            RenovationOutcome::Relocate => "Relocate",
            RenovationOutcome::Sell => "Sell",
            RenovationOutcome::Repurpose => "Repurpose",
            RenovationOutcome::NotApplicable => "Not Applicable",
        }
    }
}

impl RenovationOutcome {
    pub fn node(self) -> Option<&'static str> {
        match self {
            RenovationOutcome::Keep => Some(node::KEEP),
            RenovationOutcome::Upgrade => Some(node::UPGRADE),
            RenovationOutcome::Relocate => Some(node::RELOCATE),
            RenovationOutcome::Sell => Some(node::SELL),
            RenovationOutcome::Repurpose => Some(node::REPURPOSE),
            RenovationOutcome::NotApplicable => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenovationGates {
    pub campus: bool,
    pub educational_adequacy: bool,
    pub funding: bool,
    pub age: bool,
}

// Ordinal gates pass at or below their threshold index; funding and age
// must be strictly above theirs.

/// N/A always passes; a missing score never does.
fn passes_campus(score: Option<ConditionLabel>, threshold: i64) -> bool {
    match score {
        None => false,
        Some(ConditionLabel::NotApplicable) => true,
        Some(label) => label.index() <= threshold,
    }
}

fn passes_adequacy(value: ConditionLabel, threshold: i64) -> bool {
    value == ConditionLabel::NotApplicable || value.index() <= threshold
}

impl RenovationGates {
    pub fn evaluate(record: &BuildingRecord, t: &ThresholdSet, mode: CampusMode) -> Self {
        let campus_score = record.campus_score_for(mode);
        let gates = Self {
            campus: passes_campus(campus_score, t.campus_score),
            educational_adequacy: passes_adequacy(record.ea_value, t.ea_index),
            funding: record
                .funding_factor
                .is_some_and(|f| f > t.renovation_funding_factor),
            age: record.modified_age() > t.modified_age,
        };

        tracing::debug!(
            building = %record.name,
            campus_index = ?campus_score.map(ConditionLabel::index),
            campus_threshold = t.campus_score,
            ea_index = record.ea_value.index(),
            ea_threshold = t.ea_index,
            funding_factor = ?record.funding_factor,
            funding_threshold = t.renovation_funding_factor,
            modified_age = record.modified_age(),
            age_threshold = t.modified_age,
            ?gates,
            "renovation gates"
        );
        gates
    }

    pub fn all_pass(&self) -> bool {
        self.campus && self.educational_adequacy && self.funding && self.age
    }
}

const GATE_SEQUENCE: [(&str, fn(&RenovationGates) -> bool); 4] = [
    (node::CAMPUS, |g| g.campus),
    (node::ED_ADEQ, |g| g.educational_adequacy),
    (node::FUNDING, |g| g.funding),
    (node::MOD_AGE, |g| g.age),
];

type Guard = fn(&BuildingRecord, &ThresholdSet) -> bool;

fn within_second_age(record: &BuildingRecord, t: &ThresholdSet) -> bool {
    record.modified_age() <= t.modified_age2
}

fn no_deficient_systems(record: &BuildingRecord, _: &ThresholdSet) -> bool {
    record.fair_or_deficient_count() < 1.0
}

fn many_deficient_systems(record: &BuildingRecord, t: &ThresholdSet) -> bool {
    record.fair_or_deficient_count() >= t.systems_deficient as f64
}

/// Fallback branch, first match wins; nothing matching means Sell.
const FALLBACK_RULES: [(Guard, RenovationOutcome); 3] = [
    (within_second_age, RenovationOutcome::Relocate),
    (no_deficient_systems, RenovationOutcome::Relocate),
    (many_deficient_systems, RenovationOutcome::Repurpose),
];

pub fn determine_future_outcome(
    record: &BuildingRecord,
    thresholds: &ThresholdSet,
    mode: CampusMode,
) -> RenovationOutcome {
    if RenovationGates::evaluate(record, thresholds, mode).all_pass() {
        return if record.historic_building {
            RenovationOutcome::Upgrade
        } else {
            RenovationOutcome::Keep
        };
    }

    FALLBACK_RULES
        .iter()
        .find(|(guard, _)| guard(record, thresholds))
        .map(|(_, outcome)| *outcome)
        .unwrap_or(RenovationOutcome::Sell)
}

pub fn trace_future_outcome(
    record: &BuildingRecord,
    thresholds: &ThresholdSet,
    mode: CampusMode,
) -> DecisionTrace {
    let gates = RenovationGates::evaluate(record, thresholds, mode);
    let mut trace = DecisionTrace::starting_at(node::CAMPUS);

    for (i, &(gate_node, passed)) in GATE_SEQUENCE.iter().enumerate() {
        if !passed(&gates) {
            trace.step(FlowEdge::new(gate_node, node::MOD_AGE2, EdgeKind::Fail));
            trace_fallback(&mut trace, record, thresholds);
            return trace;
        }
        let next = GATE_SEQUENCE
            .get(i + 1)
            .map(|(next_node, _)| *next_node)
            .unwrap_or(node::HISTORIC);
        trace.step(FlowEdge::new(gate_node, next, EdgeKind::Yes));
    }

    if record.historic_building {
        trace.step(FlowEdge::new(node::HISTORIC, node::UPGRADE, EdgeKind::Yes));
    } else {
        trace.step(FlowEdge::new(node::HISTORIC, node::KEEP, EdgeKind::No));
    }
    trace
}

fn trace_fallback(trace: &mut DecisionTrace, record: &BuildingRecord, t: &ThresholdSet) {
    if within_second_age(record, t) {
        trace.step(FlowEdge::new(node::MOD_AGE2, node::RELOCATE, EdgeKind::No));
        return;
    }
    trace.step(FlowEdge::new(node::MOD_AGE2, node::MINOR_SYSTEMS, EdgeKind::Yes));

    if no_deficient_systems(record, t) {
        trace.step(FlowEdge::new(node::MINOR_SYSTEMS, node::RELOCATE, EdgeKind::No));
        return;
    }
    trace.step(FlowEdge::new(node::MINOR_SYSTEMS, node::SYSTEMS, EdgeKind::Yes));

    if many_deficient_systems(record, t) {
        trace.step(FlowEdge::new(node::SYSTEMS, node::REPURPOSE, EdgeKind::Yes));
    } else {
        trace.step(FlowEdge::new(node::SYSTEMS, node::SELL, EdgeKind::No));
    }
}

pub fn flow_graph(thresholds: &ThresholdSet, mode: CampusMode) -> FlowGraph {
    let gate = |id, caption: String| FlowNode {
        id,
        caption,
        outcome: false,
    };
    let terminal = |outcome: RenovationOutcome| FlowNode {
        id: outcome.node().unwrap_or_default(),
        caption: outcome.label().to_string(),
        outcome: true,
    };

    FlowGraph {
        nodes: vec![
            gate(
                node::CAMPUS,
                format!(
                    "{} Building\nis {}",
                    mode.horizon_label(),
                    display_index(thresholds.campus_score)
                ),
            ),
            gate(
                node::ED_ADEQ,
                format!(
                    "Space Constraints:\n{}\nor worse",
                    display_index(thresholds.ea_index)
                ),
            ),
            gate(
                node::FUNDING,
                format!("Functional Fit > {:.1}", thresholds.renovation_funding_factor),
            ),
            gate(node::MOD_AGE, format!("Modified Age\n> {}", thresholds.modified_age)),
            gate(node::HISTORIC, "Historic Building".to_string()),
            terminal(RenovationOutcome::Keep),
            terminal(RenovationOutcome::Upgrade),
            gate(node::MOD_AGE2, format!("Modified Age\n> {}", thresholds.modified_age2)),
            gate(
                node::SYSTEMS,
                format!(
                    "{} or more systems\nfair or deficient",
                    thresholds.systems_deficient
                ),
            ),
            gate(
                node::MINOR_SYSTEMS,
                format!(
                    "{} or more systems\nfair or deficient",
                    thresholds.minor_systems_deficient
                ),
            ),
            terminal(RenovationOutcome::Relocate),
            terminal(RenovationOutcome::Sell),
            terminal(RenovationOutcome::Repurpose),
        ],
        edges: LINKS.to_vec(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenovationEvaluation {
    pub thresholds: ThresholdSet,
    pub mode: CampusMode,
}

impl RenovationEvaluation {
    pub fn new(thresholds: ThresholdSet, mode: CampusMode) -> Self {
        Self { thresholds, mode }
    }
}

impl Evaluation for RenovationEvaluation {
    type Outcome = RenovationOutcome;

    fn classify(&self, record: &BuildingRecord) -> RenovationOutcome {
        determine_future_outcome(record, &self.thresholds, self.mode)
    }

    fn trace(&self, record: &BuildingRecord) -> DecisionTrace {
        trace_future_outcome(record, &self.thresholds, self.mode)
    }

    fn graph(&self) -> FlowGraph {
        flow_graph(&self.thresholds, self.mode)
    }
}
