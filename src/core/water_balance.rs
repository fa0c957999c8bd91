use tracing::debug;

use crate::config::constants::{m3s_to_mm3, WATER_BALANCE_TOLERANCE_MM3};
use crate::core::river_system::RiverSystem;
use crate::models::node::{NodeKind, SimError};

/// Aggregate volumes for the whole system over one run [Mm3].
#[derive(Debug, Clone, Copy)]
pub struct GlobalBalance {
    pub start_water_mm3: f64,
    pub end_water_mm3: f64,
    pub inflow_volume_mm3: f64,
    pub outgoing_mm3: f64,
    pub waterbalance_mm3: f64,
}

/// Verify conservation for every node individually.
///
/// Storage nodes must satisfy start + inflows - outflows - end = 0; a
/// powerstation stores nothing, so its inflows and outflows must cancel
/// exactly. Any residual beyond the tolerance is a hard failure.
pub fn check_node_balances(rs: &RiverSystem) -> Result<(), SimError> {
    for node in &rs.nodes {
        let scen = &node.scenario;
        let mut sum_inflow_mm3 = 0.0;
        let mut sum_outflow_mm3 = 0.0;
        for t in 0..rs.stps {
            sum_inflow_mm3 += m3s_to_mm3(scen.inflow[t] + scen.up_inflow[t], rs.dt);
            sum_outflow_mm3 += m3s_to_mm3(scen.tot_outflow[t], rs.dt);
        }

        let balance = match &node.kind {
            NodeKind::Powerstation(_) => sum_inflow_mm3 - sum_outflow_mm3,
            _ => {
                node.start_water_mm3() + sum_inflow_mm3 - node.end_water_mm3() - sum_outflow_mm3
            }
        };

        debug!(
            node = node.idnr,
            balance_mm3 = balance,
            "node water balance"
        );
        if balance.abs() > WATER_BALANCE_TOLERANCE_MM3 {
            return Err(SimError::NodeBalance {
                node: node.idnr,
                balance_mm3: balance,
            });
        }
    }
    Ok(())
}

/// Verify conservation for the system as a whole: everything that was in
/// storage or flowed in must still be in storage or have left through the
/// outfall. Note that reservoirs may hold dead water below LRW; it counts
/// here even though it cannot be turned into energy.
pub fn global_balance(rs: &RiverSystem) -> Result<GlobalBalance, SimError> {
    let mut start_water_mm3 = 0.0;
    let mut end_water_mm3 = 0.0;
    let mut inflow_volume_mm3 = 0.0;
    for node in &rs.nodes {
        start_water_mm3 += node.start_water_mm3();
        end_water_mm3 += node.end_water_mm3();
        for t in 0..rs.stps {
            inflow_volume_mm3 += m3s_to_mm3(node.scenario.inflow[t], rs.dt);
        }
    }

    let outfall = rs.outfall();
    let mut outgoing_mm3 = 0.0;
    for t in 0..rs.stps {
        outgoing_mm3 += m3s_to_mm3(outfall.scenario.tot_outflow[t], rs.dt);
    }

    let waterbalance_mm3 =
        start_water_mm3 + inflow_volume_mm3 - end_water_mm3 - outgoing_mm3;

    if waterbalance_mm3.abs() > WATER_BALANCE_TOLERANCE_MM3 {
        return Err(SimError::GlobalBalance {
            balance_mm3: waterbalance_mm3,
        });
    }

    Ok(GlobalBalance {
        start_water_mm3,
        end_water_mm3,
        inflow_volume_mm3,
        outgoing_mm3,
        waterbalance_mm3,
    })
}
