use std::fmt;

use super::channel::Channel;
use super::curve::CurveError;
use super::powerstation::Powerstation;
use super::reservoir::Reservoir;
use super::scenario::Scenario;

/// Fatal simulation errors. These mean a bug or bad data, never a
/// regulatory violation (those accrue penalty costs instead).
#[derive(Debug)]
pub enum SimError {
    Curve { node: usize, source: CurveError },
    NegativeOverflow { node: usize, overflow_mm3: f64 },
    NonPhysicalFilling { node: usize, fraction: f64 },
    NegativeAction { node: usize, timestep: usize, action: f64 },
    BadDownstream { node: usize, downstream: usize },
    TunnelIntoNonPowerstation { node: usize, downstream: usize },
    IdnrMismatch { index: usize, idnr: usize },
    EmptySystem,
    NodeBalance { node: usize, balance_mm3: f64 },
    GlobalBalance { balance_mm3: f64 },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Curve { node, source } => {
                write!(f, "node {}: {}", node, source)
            }
            SimError::NegativeOverflow { node, overflow_mm3 } => {
                write!(f, "node {}: negative overflow of {} Mm3", node, overflow_mm3)
            }
            SimError::NonPhysicalFilling { node, fraction } => {
                write!(f, "node {}: non-physical reservoir fraction {}", node, fraction)
            }
            SimError::NegativeAction { node, timestep, action } => {
                write!(f, "node {}: negative action {} at timestep {}", node, action, timestep)
            }
            SimError::BadDownstream { node, downstream } => {
                write!(
                    f,
                    "node {}: downstream id {} must exist and be greater than the source id",
                    node, downstream
                )
            }
            SimError::TunnelIntoNonPowerstation { node, downstream } => {
                write!(
                    f,
                    "node {}: tunnel outlet points at node {} which is not a powerstation",
                    node, downstream
                )
            }
            SimError::IdnrMismatch { index, idnr } => {
                write!(f, "node at position {} declares idnr {}", index, idnr)
            }
            SimError::EmptySystem => {
                write!(f, "the river system has no nodes")
            }
            SimError::NodeBalance { node, balance_mm3 } => {
                write!(f, "water balance broken at node {}: {} Mm3", node, balance_mm3)
            }
            SimError::GlobalBalance { balance_mm3 } => {
                write!(f, "global water balance broken: {} Mm3", balance_mm3)
            }
        }
    }
}

impl std::error::Error for SimError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Reservoir,
    Powerstation,
    Channel,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Reservoir => "RESERVOIR",
            NodeType::Powerstation => "PSTATION",
            NodeType::Channel => "CHANNEL",
        }
    }
}

/// Type-specific state of a node.
#[derive(Debug)]
pub enum NodeKind {
    Reservoir(Reservoir),
    Channel(Channel),
    Powerstation(Powerstation),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Reservoir(_) => NodeType::Reservoir,
            NodeKind::Channel(_) => NodeType::Channel,
            NodeKind::Powerstation(_) => NodeType::Powerstation,
        }
    }
}

/// One node in the river network.
///
/// `idnr` equals the node's position in the system's node array and its
/// topological rank: every downstream link points at a strictly greater id,
/// which is what makes the per-timestep in-order sweep sound.
#[derive(Debug)]
pub struct Node {
    pub idnr: usize,
    pub name: String,
    /// Primary downstream link, used for rest-value propagation. For a
    /// reservoir this is the tunnel target when present, otherwise the
    /// overflow target.
    pub downstream: Option<usize>,
    pub scenario: Scenario,
    /// Water above dead storage left in the node after the run [Mm3].
    pub remaining_available_mm3: f64,
    /// Available water accumulated from everything upstream [Mm3].
    pub upstream_remaining_available_mm3: f64,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(
        idnr: usize,
        name: String,
        downstream: Option<usize>,
        scenario: Scenario,
        kind: NodeKind,
    ) -> Node {
        Node {
            idnr,
            name,
            downstream,
            scenario,
            remaining_available_mm3: 0.0,
            upstream_remaining_available_mm3: 0.0,
            kind,
        }
    }

    /// Stored water before the run [Mm3]. Powerstations never store water.
    pub fn start_water_mm3(&self) -> f64 {
        match &self.kind {
            NodeKind::Reservoir(r) => r.start_water_mm3(),
            NodeKind::Channel(c) => c.start_water_mm3(),
            NodeKind::Powerstation(_) => 0.0,
        }
    }

    /// Stored water after the run [Mm3].
    pub fn end_water_mm3(&self) -> f64 {
        match &self.kind {
            NodeKind::Reservoir(r) => r.res_mm3,
            NodeKind::Channel(c) => c.end_water_mm3(),
            NodeKind::Powerstation(_) => 0.0,
        }
    }
}

/// Mutable window over the nodes strictly downstream of the one being
/// stepped. Restricting writes to strictly greater indices keeps the
/// borrow on the stepping node disjoint from its targets.
pub struct Downstream<'a> {
    base: usize,
    nodes: &'a mut [Node],
}

impl<'a> Downstream<'a> {
    /// `base` is the idnr of the first node in `nodes`.
    pub fn new(base: usize, nodes: &'a mut [Node]) -> Downstream<'a> {
        Downstream { base, nodes }
    }

    pub fn node_mut(&mut self, idnr: usize, from: usize) -> Result<&mut Node, SimError> {
        if idnr < self.base || idnr - self.base >= self.nodes.len() {
            return Err(SimError::BadDownstream {
                node: from,
                downstream: idnr,
            });
        }
        Ok(&mut self.nodes[idnr - self.base])
    }

    /// Add `q_m3s` to the target node's upstream inflow for timestep `t`.
    pub fn push_up_inflow(
        &mut self,
        idnr: usize,
        from: usize,
        t: usize,
        q_m3s: f64,
    ) -> Result<(), SimError> {
        let node = self.node_mut(idnr, from)?;
        node.scenario.up_inflow[t] += q_m3s;
        Ok(())
    }
}
