use tracing::{debug, info};

use crate::data::dataset::Dataset;
use crate::data::topology::NodeBuild;
use crate::models::node::{Downstream, Node, NodeKind, SimError};
use crate::models::scenario::Scenario;

/// The whole river network: node ownership, stepping order and the
/// aggregate passes that run after the horizon.
///
/// Nodes are stored in topological order and `idnr` equals the array
/// index. Stepping walks nodes in index order within each timestep, so a
/// node's accumulated upstream inflow is complete by the time it runs;
/// every downstream write targets a strictly greater index.
#[derive(Debug)]
pub struct RiverSystem {
    pub nodes: Vec<Node>,
    pub dt: f64,
    pub stps: usize,
}

impl RiverSystem {
    pub fn new(nodes: Vec<Node>, dt: f64, stps: usize) -> Result<RiverSystem, SimError> {
        let rs = RiverSystem { nodes, dt, stps };
        rs.validate()?;
        Ok(rs)
    }

    /// Assemble the system from parsed topology and input series.
    pub fn from_inputs(
        builds: Vec<NodeBuild>,
        data: &Dataset,
        dt: f64,
    ) -> Result<RiverSystem, SimError> {
        let stps = data.stps;
        let mut nodes = Vec::with_capacity(builds.len());
        for (index, build) in builds.into_iter().enumerate() {
            if build.idnr != index {
                return Err(SimError::IdnrMismatch {
                    index,
                    idnr: build.idnr,
                });
            }
            let mut scenario = Scenario::new(stps, dt);
            scenario.inflow.copy_from_slice(&data.inflow[index]);
            scenario.action.copy_from_slice(&data.action[index]);
            scenario.price.copy_from_slice(&data.price);
            scenario.year.copy_from_slice(&data.year);
            scenario.month.copy_from_slice(&data.month);
            scenario.day.copy_from_slice(&data.day);
            scenario.hour.copy_from_slice(&data.hour);
            nodes.push(Node::new(
                build.idnr,
                build.name,
                build.downstream,
                scenario,
                build.kind,
            ));
        }
        RiverSystem::new(nodes, dt, stps)
    }

    /// Check the structural invariants the stepping order relies on.
    fn validate(&self) -> Result<(), SimError> {
        let nr_nodes = self.nodes.len();
        if nr_nodes == 0 {
            return Err(SimError::EmptySystem);
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if node.idnr != index {
                return Err(SimError::IdnrMismatch {
                    index,
                    idnr: node.idnr,
                });
            }

            let check_link = |downstream: usize| -> Result<(), SimError> {
                if downstream <= node.idnr || downstream >= nr_nodes {
                    return Err(SimError::BadDownstream {
                        node: node.idnr,
                        downstream,
                    });
                }
                Ok(())
            };

            if let Some(ds) = node.downstream {
                check_link(ds)?;
            }

            if let NodeKind::Reservoir(r) = &node.kind {
                check_link(r.overflow_downstream)?;
                if let Some(h) = &r.hatch {
                    check_link(h.downstream)?;
                }
                if let Some(a) = &r.auto_qmin {
                    check_link(a.downstream)?;
                }
                if let Some(ds) = r.tunnel_downstream {
                    check_link(ds)?;
                    if !matches!(self.nodes[ds].kind, NodeKind::Powerstation(_)) {
                        return Err(SimError::TunnelIntoNonPowerstation {
                            node: node.idnr,
                            downstream: ds,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Run the full horizon. Safe to call repeatedly: all mutable state is
    /// re-derived from the initial conditions first, so two runs over the
    /// same inputs produce identical trajectories.
    pub fn simulate(&mut self) -> Result<(), SimError> {
        self.reset()?;

        // The serial order is load-bearing: a node's upstream inflow for
        // timestep t is assembled by the nodes before it in the same sweep.
        for t in 0..self.stps {
            for n in 0..self.nodes.len() {
                self.step_node(n, t)?;
            }
        }

        self.propagate_rest_value();
        self.calc_adjustment_costs();
        debug!("simulation finished, {} timesteps", self.stps);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), SimError> {
        for node in self.nodes.iter_mut() {
            node.scenario.reset_accumulators();
            node.remaining_available_mm3 = 0.0;
            node.upstream_remaining_available_mm3 = 0.0;
            match &mut node.kind {
                NodeKind::Reservoir(r) => r.init(node.idnr)?,
                NodeKind::Channel(c) => c.reset(),
                NodeKind::Powerstation(_) => {}
            }
        }
        Ok(())
    }

    fn step_node(&mut self, n: usize, t: usize) -> Result<(), SimError> {
        let (head, tail) = self.nodes[n..].split_at_mut(1);
        let node = &mut head[0];
        let idnr = node.idnr;
        let downstream = node.downstream;
        let scenario = &mut node.scenario;
        let mut down = Downstream::new(idnr + 1, tail);

        let remaining = match &mut node.kind {
            NodeKind::Reservoir(r) => r.step(idnr, scenario, &mut down, t)?,
            NodeKind::Channel(c) => c.step(idnr, scenario, &mut down, downstream, t)?,
            NodeKind::Powerstation(p) => p.step(idnr, scenario, &mut down, downstream, t)?,
        };
        node.remaining_available_mm3 = remaining;
        Ok(())
    }

    /// Push each node's available (above dead storage) water down the
    /// primary links. One ascending pass suffices because links only point
    /// forward, so by the time a node is visited its own accumulator is
    /// complete.
    fn propagate_rest_value(&mut self) {
        for n in 0..self.nodes.len() {
            let Some(ds) = self.nodes[n].downstream else {
                continue;
            };
            let carried = self.nodes[n].remaining_available_mm3
                + self.nodes[n].upstream_remaining_available_mm3;
            self.nodes[ds].upstream_remaining_available_mm3 += carried;
        }
    }

    fn calc_adjustment_costs(&mut self) {
        for node in self.nodes.iter_mut() {
            if let NodeKind::Powerstation(p) = &node.kind {
                let total = p.adjustment_costs(&mut node.scenario);
                if total > 0.0 {
                    info!(node = node.idnr, cost = total, "daily adjustment penalty charged");
                }
            }
        }
    }

    /// The most downstream node; its outflow is what leaves the system.
    pub fn outfall(&self) -> &Node {
        // validate() rejects empty systems at construction.
        self.nodes.last().expect("river system has nodes")
    }

    pub fn reservoirs(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Reservoir(_)))
    }

    pub fn powerstations(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Powerstation(_)))
    }

    pub fn channels(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Channel(_)))
    }
}
