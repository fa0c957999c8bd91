use serde::Serialize;

use crate::core::river_system::RiverSystem;
use crate::core::water_balance::GlobalBalance;
use crate::models::node::NodeKind;

/// Aggregate economics and water accounting for one simulation run.
///
/// The value function is the realised profit over the horizon plus the
/// rest-value of the storable water left in the system.
#[derive(Debug, Clone, Serialize)]
pub struct SystemSummary {
    pub systemname: String,

    pub avg_price_eur_mwh: f64,
    pub restprice_eur_mwh: f64,

    pub remaining_available_mm3: f64,
    pub remaining_available_mwh: f64,
    pub remaining_available_eur: f64,

    pub sum_production_mwh: f64,
    pub tot_income_eur: f64,
    pub avg_achieved_price_eur_mwh: f64,

    pub sum_qmin_cost_eur: f64,
    pub sum_lrw_cost_eur: f64,
    pub sum_startstop_cost_eur: f64,
    pub sum_adjustment_cost_eur: f64,
    pub tot_cost_eur: f64,
    pub tot_profit_eur: f64,
    pub value_function_eur: f64,

    pub start_water_mm3: f64,
    pub inflow_volume_mm3: f64,
    pub outgoing_mm3: f64,
    pub end_water_mm3: f64,
    pub waterbalance_mm3: f64,
}

pub fn build_summary(
    rs: &RiverSystem,
    systemname: &str,
    restprice: f64,
    balance: &GlobalBalance,
) -> SystemSummary {
    // All storable water collects at the outfall accumulator; dead water
    // below LRW is excluded on the way.
    let outfall = rs.outfall();
    let remaining_available_mm3 =
        outfall.remaining_available_mm3 + outfall.upstream_remaining_available_mm3;

    // Each powerstation values the water parked above it through its local
    // energy equivalent [kWh/m3]; stations store nothing themselves.
    let mut remaining_available_mwh = 0.0;
    let mut sum_production_mwh = 0.0;
    let mut sum_startstop_cost_eur = 0.0;
    let mut sum_adjustment_cost_eur = 0.0;
    let mut sum_qmin_cost_eur = 0.0;
    let mut sum_lrw_cost_eur = 0.0;
    let mut tot_income_eur = 0.0;
    let mut tot_cost_eur = 0.0;

    for node in &rs.nodes {
        let scen = &node.scenario;
        for t in 0..rs.stps {
            tot_income_eur += scen.income[t];
            tot_cost_eur += scen.cost[t];
        }
        match &node.kind {
            NodeKind::Powerstation(p) => {
                remaining_available_mwh += p.local_energy_equivalent
                    * node.upstream_remaining_available_mm3
                    * 1.0e6
                    / 1000.0;
                for t in 0..rs.stps {
                    sum_production_mwh += scen.power_mwh[t];
                    sum_startstop_cost_eur += scen.cost[t] - scen.adjust_cost[t];
                    sum_adjustment_cost_eur += scen.adjust_cost[t];
                }
            }
            NodeKind::Channel(_) => {
                for t in 0..rs.stps {
                    sum_qmin_cost_eur += scen.cost[t];
                }
            }
            NodeKind::Reservoir(_) => {
                for t in 0..rs.stps {
                    sum_lrw_cost_eur += scen.cost[t];
                }
            }
        }
    }

    let avg_price_eur_mwh = if rs.stps > 0 {
        rs.nodes[0].scenario.price.iter().sum::<f64>() / rs.stps as f64
    } else {
        0.0
    };

    let remaining_available_eur = remaining_available_mwh * restprice;
    let tot_profit_eur = tot_income_eur - tot_cost_eur;
    let value_function_eur = tot_profit_eur + remaining_available_eur;
    let avg_achieved_price_eur_mwh = if sum_production_mwh > 0.0 {
        tot_income_eur / sum_production_mwh
    } else {
        0.0
    };

    SystemSummary {
        systemname: systemname.to_string(),
        avg_price_eur_mwh,
        restprice_eur_mwh: restprice,
        remaining_available_mm3,
        remaining_available_mwh,
        remaining_available_eur,
        sum_production_mwh,
        tot_income_eur,
        avg_achieved_price_eur_mwh,
        sum_qmin_cost_eur,
        sum_lrw_cost_eur,
        sum_startstop_cost_eur,
        sum_adjustment_cost_eur,
        tot_cost_eur,
        tot_profit_eur,
        value_function_eur,
        start_water_mm3: balance.start_water_mm3,
        inflow_volume_mm3: balance.inflow_volume_mm3,
        outgoing_mm3: balance.outgoing_mm3,
        end_water_mm3: balance.end_water_mm3,
        waterbalance_mm3: balance.waterbalance_mm3,
    }
}
