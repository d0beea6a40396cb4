use serde::Serialize;

use crate::flow::{DecisionTrace, EdgeKind, Evaluation, FlowEdge, FlowGraph, FlowNode, Outcome};
use crate::models::BuildingRecord;
use crate::thresholds::ThresholdSet;

pub mod node {
    pub const UTIL: &str = "util";
    pub const FUNDING: &str = "funding";
    pub const ADDITION: &str = "addition";
    pub const REDISTRICT: &str = "redistrict";
    pub const PORTABLES: &str = "portables";
}

pub const LINKS: [FlowEdge; 4] = [
    FlowEdge::new(node::UTIL, node::FUNDING, EdgeKind::Yes),
    FlowEdge::new(node::UTIL, node::PORTABLES, EdgeKind::No),
    FlowEdge::new(node::FUNDING, node::REDISTRICT, EdgeKind::Yes),
    FlowEdge::new(node::FUNDING, node::ADDITION, EdgeKind::No),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdditionOutcome {
    Addition,
    Redistrict,
    Portables,
    NotApplicable,
}

impl Outcome for AdditionOutcome {
    const ALL: &'static [Self] = &[
        AdditionOutcome::Addition,
        AdditionOutcome::Redistrict,
        AdditionOutcome::Portables,
        AdditionOutcome::NotApplicable,
    ];
    const NOT_APPLICABLE: Self = AdditionOutcome::NotApplicable;

    fn label(self) -> &'static str {
        match self {
            AdditionOutcome::Addition => "Addition",
            AdditionOutcome::Redistrict => "Redistrict",
            AdditionOutcome::Portables => "Portables",
            AdditionOutcome::NotApplicable => "Not Applicable",
        }
    }
}

impl AdditionOutcome {
    pub fn node(self) -> Option<&'static str> {
        match self {
            AdditionOutcome::Addition => Some(node::ADDITION),
            AdditionOutcome::Redistrict => Some(node::REDISTRICT),
            AdditionOutcome::Portables => Some(node::PORTABLES),
            AdditionOutcome::NotApplicable => None,
        }
    }
}

type Guard = fn(&BuildingRecord, &ThresholdSet) -> bool;

fn below_capacity(record: &BuildingRecord, _: &ThresholdSet) -> bool {
    record.below_capacity()
}

fn below_threshold(record: &BuildingRecord, t: &ThresholdSet) -> bool {
    record
        .utilization
        .is_some_and(|u| u < t.utilization as f64)
}

fn funding_covers(record: &BuildingRecord, t: &ThresholdSet) -> bool {
    record.funding_factor.is_some_and(|f| f >= t.funding_factor)
}

/// Checked top to bottom; the first guard that holds decides.
const RULES: [(Guard, AdditionOutcome); 3] = [
    (below_capacity, AdditionOutcome::NotApplicable),
    (below_threshold, AdditionOutcome::Portables),
    (funding_covers, AdditionOutcome::Redistrict),
];

pub fn determine_outcome(record: &BuildingRecord, thresholds: &ThresholdSet) -> AdditionOutcome {
    RULES
        .iter()
        .find(|(guard, _)| guard(record, thresholds))
        .map(|(_, outcome)| *outcome)
        .unwrap_or(AdditionOutcome::Addition)
}

pub fn trace_outcome(record: &BuildingRecord, thresholds: &ThresholdSet) -> DecisionTrace {
    if below_capacity(record, thresholds) {
        return DecisionTrace::default();
    }

    let mut trace = DecisionTrace::starting_at(node::UTIL);
    if below_threshold(record, thresholds) {
        trace.step(LINKS[1]);
        return trace;
    }

    trace.step(LINKS[0]);
    if funding_covers(record, thresholds) {
        trace.step(LINKS[2]);
    } else {
        trace.step(LINKS[3]);
    }
    trace
}

pub fn flow_graph(thresholds: &ThresholdSet) -> FlowGraph {
    let gate = |id, caption: String| FlowNode {
        id,
        caption,
        outcome: false,
    };
    let terminal = |id, caption: &str| FlowNode {
        id,
        caption: caption.to_string(),
        outcome: true,
    };

    FlowGraph {
        nodes: vec![
            gate(node::UTIL, format!("Utilization ≥ {}%", thresholds.utilization)),
            gate(
                node::FUNDING,
                format!("Funding Factor ≥ {}", thresholds.funding_factor),
            ),
            terminal(node::ADDITION, "Addition"),
            terminal(node::REDISTRICT, "Redistrict"),
            terminal(node::PORTABLES, "Portables"),
        ],
        edges: LINKS.to_vec(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdditionEvaluation {
    pub thresholds: ThresholdSet,
}

impl AdditionEvaluation {
    pub fn new(thresholds: ThresholdSet) -> Self {
        Self { thresholds }
    }
}

impl Evaluation for AdditionEvaluation {
    type Outcome = AdditionOutcome;

    fn classify(&self, record: &BuildingRecord) -> AdditionOutcome {
        determine_outcome(record, &self.thresholds)
    }

    fn trace(&self, record: &BuildingRecord) -> DecisionTrace {
        trace_outcome(record, &self.thresholds)
    }

    fn graph(&self) -> FlowGraph {
        flow_graph(&self.thresholds)
    }
}
