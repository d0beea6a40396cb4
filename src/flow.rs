use serde::Serialize;

use crate::models::BuildingRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Yes,
    No,
    /// A gate failure that drops into the fallback branch.
    Fail,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Yes => "yes",
            EdgeKind::No => "no",
            EdgeKind::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowEdge {
    pub from: &'static str,
    pub to: &'static str,
    pub kind: EdgeKind,
}

impl FlowEdge {
    pub const fn new(from: &'static str, to: &'static str, kind: EdgeKind) -> Self {
        Self { from, to, kind }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecisionTrace {
    pub nodes: Vec<&'static str>,
    pub edges: Vec<FlowEdge>,
}

impl DecisionTrace {
    pub fn starting_at(node: &'static str) -> Self {
        Self {
            nodes: vec![node],
            edges: Vec::new(),
        }
    }

    pub fn step(&mut self, edge: FlowEdge) {
        debug_assert_eq!(self.endpoint(), Some(edge.from));
        self.nodes.push(edge.to);
        self.edges.push(edge);
    }

    pub fn endpoint(&self) -> Option<&'static str> {
        self.nodes.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowNode {
    pub id: &'static str,
    pub caption: String,
    pub outcome: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

impl FlowGraph {
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn contains_edge(&self, edge: &FlowEdge) -> bool {
        self.edges.contains(edge)
    }
}

pub trait Outcome: Copy + PartialEq + 'static {
    const ALL: &'static [Self];
    /// Bucket for anything the summary does not recognize.
    const NOT_APPLICABLE: Self;

    fn label(self) -> &'static str;
}

pub trait Evaluation {
    type Outcome: Outcome;

    fn classify(&self, record: &BuildingRecord) -> Self::Outcome;

    fn trace(&self, record: &BuildingRecord) -> DecisionTrace;

    fn graph(&self) -> FlowGraph;
}
