use crate::config::constants::{
    m3s_to_mm3, ACTION_OFF_THRESHOLD, GRAVITY, POWER_ON_THRESHOLD_MWH,
    SIGNIFICANT_POWER_CHANGE_MW,
};
use crate::models::curve::{Curve, CurveError};
use crate::models::node::{Downstream, SimError};
use crate::models::scenario::Scenario;

/// Hydroelectric powerstation fed through a tunnel from an upstream
/// reservoir. Stations never store water; whatever enters leaves the same
/// timestep through the tailrace.
#[derive(Debug)]
pub struct Powerstation {
    /// Turbine efficiency by discharge [m3/s -> percent].
    pub turbine_curve: Curve,
    pub static_gen_efficiency: f64,
    /// Quadratic hydraulic loss coefficient: headloss = coef * Q^2.
    pub headloss_coef: f64,
    /// Tailrace elevation [masl].
    pub tailrace_masl: f64,
    pub min_discharge_m3s: f64,
    pub max_discharge_m3s: f64,
    /// Full cost of one start/stop cycle, charged half at each transition.
    pub startstop_cost: f64,
    /// Energy content of upstream water [kWh/m3], used for rest-valuation.
    pub local_energy_equivalent: f64,
    /// Baseline release that fires regardless of the action [m3/s].
    pub auto_qmin_m3s: f64,
    /// Allowed output adjustments per calendar day. Negative disables.
    pub max_adjustment_pr_day: i32,
    pub max_adjustment_cost: f64,
    /// Output in the timestep before the horizon started [MWh].
    pub init_power_mwh: f64,

    // Head sampling handed over by the upstream reservoir while it steps.
    pub start_of_stp_masl: f64,
    pub end_of_stp_masl: f64,
    pub up_res_mm3: f64,
}

#[allow(clippy::too_many_arguments)]
impl Powerstation {
    pub fn new(
        turbine_points: &[(f64, f64)],
        static_gen_efficiency: f64,
        headloss_coef: f64,
        tailrace_masl: f64,
        min_discharge_m3s: f64,
        max_discharge_m3s: f64,
        startstop_cost: f64,
        local_energy_equivalent: f64,
        auto_qmin_m3s: f64,
    ) -> Result<Powerstation, CurveError> {
        Ok(Powerstation {
            turbine_curve: Curve::new(turbine_points)?,
            static_gen_efficiency,
            headloss_coef,
            tailrace_masl,
            min_discharge_m3s,
            max_discharge_m3s,
            startstop_cost,
            local_energy_equivalent,
            auto_qmin_m3s,
            max_adjustment_pr_day: -1,
            max_adjustment_cost: 0.0,
            init_power_mwh: 0.0,
            start_of_stp_masl: 0.0,
            end_of_stp_masl: 0.0,
            up_res_mm3: 0.0,
        })
    }

    /// Discharge the station wants to draw through the tunnel this
    /// timestep [m3/s]. Called by the upstream reservoir after it has set
    /// `start_of_stp_masl` and `up_res_mm3` from its post-inflow state.
    pub fn tunnel_flow(
        &mut self,
        idnr: usize,
        scen: &mut Scenario,
        t: usize,
    ) -> Result<f64, SimError> {
        scen.auto_qmin_m3s[t] = 0.0;

        let action = scen.action[t];
        if action < -1.0e-6 {
            return Err(SimError::NegativeAction {
                node: idnr,
                timestep: t,
                action,
            });
        }

        let mut flow = if action < ACTION_OFF_THRESHOLD {
            0.0
        } else {
            self.min_discharge_m3s + action * (self.max_discharge_m3s - self.min_discharge_m3s)
        };

        if self.auto_qmin_m3s > 0.0 && flow < self.auto_qmin_m3s {
            flow = self.auto_qmin_m3s;
            scen.auto_qmin_m3s[t] = flow;
        }

        // Shut down production and the baseline release when the reservoir
        // is dry or the level has dropped below the intake.
        if m3s_to_mm3(flow, scen.dt) > self.up_res_mm3 {
            flow = 0.0;
        }

        Ok(flow)
    }

    /// Advance one timestep. The tunnel flow decided earlier this timestep
    /// has already been accumulated into `up_inflow`.
    pub fn step(
        &mut self,
        idnr: usize,
        scen: &mut Scenario,
        down: &mut Downstream,
        downstream: Option<usize>,
        t: usize,
    ) -> Result<f64, SimError> {
        let dt = scen.dt;
        let previous_power = if t == 0 {
            self.init_power_mwh
        } else {
            scen.power_mwh[t - 1]
        };

        let q = scen.up_inflow[t];

        let headloss = self.headloss_coef * q * q;
        let h_brutto = (self.start_of_stp_masl + self.end_of_stp_masl) / 2.0 - self.tailrace_masl;
        let h_netto = h_brutto - headloss;

        let turbine_efficiency = self
            .turbine_curve
            .x2y(q)
            .map_err(|source| SimError::Curve { node: idnr, source })?
            / 100.0;

        let p_watt = turbine_efficiency * 1000.0 * GRAVITY * h_netto * q;
        let p_mw = p_watt / 1.0e6 * self.static_gen_efficiency;
        let mut power_mwh = p_mw * dt / 3600.0;

        if q < self.min_discharge_m3s {
            power_mwh = 0.0;
        }

        let income = power_mwh * scen.price[t];

        // Half the cycle cost at each on/off transition.
        let was_on = previous_power >= POWER_ON_THRESHOLD_MWH;
        let is_on = power_mwh >= POWER_ON_THRESHOLD_MWH;
        let startstop_cost = if was_on != is_on {
            self.startstop_cost / 2.0
        } else {
            0.0
        };

        if let Some(ds) = downstream {
            down.push_up_inflow(ds, idnr, t, q)?;
        }

        scen.income[t] = income;
        scen.cost[t] = startstop_cost;
        scen.profit[t] = income - startstop_cost;
        scen.h_brutto[t] = h_brutto;
        scen.h_netto[t] = h_netto;
        scen.power_mwh[t] = power_mwh;
        scen.tot_inflow[t] = q;
        scen.tot_outflow[t] = q;

        // A powerstation never stores water.
        Ok(0.0)
    }

    /// Post-run pass charging the daily adjustment penalty. A calendar day
    /// closes at its last timestep; if the day saw more significant output
    /// changes than allowed, the full penalty lands on the closing step.
    pub fn adjustment_costs(&self, scen: &mut Scenario) -> f64 {
        if self.max_adjustment_pr_day < 0 {
            return 0.0;
        }

        let mut prev_power = self.init_power_mwh;
        let mut changes_this_day: i32 = 0;
        let mut sum_cost = 0.0;

        for t in 0..scen.stps {
            if (scen.power_mwh[t] - prev_power).abs() > SIGNIFICANT_POWER_CHANGE_MW {
                changes_this_day += 1;
            }

            let day_closes = t + 1 == scen.stps
                || (scen.year[t + 1], scen.month[t + 1], scen.day[t + 1])
                    != (scen.year[t], scen.month[t], scen.day[t]);

            if day_closes {
                if changes_this_day > self.max_adjustment_pr_day {
                    sum_cost += self.max_adjustment_cost;
                    scen.adjust_cost[t] = self.max_adjustment_cost;
                    scen.cost[t] += self.max_adjustment_cost;
                    scen.profit[t] -= self.max_adjustment_cost;
                }
                changes_this_day = 0;
            }
            prev_power = scen.power_mwh[t];
        }
        sum_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::node::Downstream;

    fn assert_approx(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() < tol,
            "expected {expected} ± {tol}, got {actual}"
        );
    }

    fn flat_efficiency_station() -> Powerstation {
        // 90 % efficiency across the whole discharge range, no head loss.
        let mut ps = Powerstation::new(
            &[(0.0, 90.0), (100.0, 90.0)],
            1.0,
            0.0,
            500.0,
            1.0,
            100.0,
            1000.0,
            1.2,
            0.0,
        )
        .unwrap();
        ps.start_of_stp_masl = 600.0;
        ps.end_of_stp_masl = 600.0;
        ps
    }

    #[test]
    fn power_from_head_and_discharge() {
        let mut ps = flat_efficiency_station();
        let mut scen = Scenario::new(1, 3600.0);
        scen.up_inflow[0] = 50.0;
        scen.price[0] = 40.0;

        let mut empty: [crate::models::node::Node; 0] = [];
        let mut down = Downstream::new(1, &mut empty);
        ps.step(0, &mut scen, &mut down, None, 0).unwrap();

        // 0.9 * 1000 * 9.80665 * 100 m * 50 m3/s = 44.129925 MW over one hour
        assert_approx(scen.power_mwh[0], 44.129925, 1e-6);
        assert_approx(scen.income[0], 44.129925 * 40.0, 1e-4);
        assert_approx(scen.h_netto[0], 100.0, 1e-12);
    }

    #[test]
    fn headloss_reduces_net_head() {
        let mut ps = flat_efficiency_station();
        ps.headloss_coef = 0.004;
        let mut scen = Scenario::new(1, 3600.0);
        scen.up_inflow[0] = 50.0;

        let mut empty: [crate::models::node::Node; 0] = [];
        let mut down = Downstream::new(1, &mut empty);
        ps.step(0, &mut scen, &mut down, None, 0).unwrap();

        assert_approx(scen.h_brutto[0], 100.0, 1e-12);
        assert_approx(scen.h_netto[0], 100.0 - 0.004 * 50.0 * 50.0, 1e-12);
    }

    #[test]
    fn below_min_discharge_produces_nothing() {
        let mut ps = flat_efficiency_station();
        ps.min_discharge_m3s = 10.0;
        let mut scen = Scenario::new(1, 3600.0);
        scen.up_inflow[0] = 5.0;

        let mut empty: [crate::models::node::Node; 0] = [];
        let mut down = Downstream::new(1, &mut empty);
        ps.step(0, &mut scen, &mut down, None, 0).unwrap();
        assert_approx(scen.power_mwh[0], 0.0, 1e-12);
    }

    #[test]
    fn start_and_stop_each_cost_half() {
        let mut ps = flat_efficiency_station();
        let mut scen = Scenario::new(5, 3600.0);
        // Off, on, on, off, off.
        scen.up_inflow = vec![0.0, 50.0, 50.0, 0.0, 0.0];

        let mut empty: [crate::models::node::Node; 0] = [];
        for t in 0..5 {
            let mut down = Downstream::new(1, &mut empty);
            ps.step(0, &mut scen, &mut down, None, t).unwrap();
        }

        assert_approx(scen.cost[0], 0.0, 1e-12);
        assert_approx(scen.cost[1], 500.0, 1e-12);
        assert_approx(scen.cost[2], 0.0, 1e-12);
        assert_approx(scen.cost[3], 500.0, 1e-12);
        assert_approx(scen.cost[4], 0.0, 1e-12);
        let total: f64 = scen.cost.iter().sum();
        assert_approx(total, 1000.0, 1e-12);
    }

    #[test]
    fn tunnel_flow_scales_with_action() {
        let mut ps = flat_efficiency_station();
        ps.min_discharge_m3s = 10.0;
        ps.up_res_mm3 = 1000.0;
        let mut scen = Scenario::new(4, 3600.0);
        scen.action = vec![0.0, 0.005, 0.5, 1.0];

        assert_approx(ps.tunnel_flow(1, &mut scen, 0).unwrap(), 0.0, 1e-12);
        // Below the 0.01 threshold still means off.
        assert_approx(ps.tunnel_flow(1, &mut scen, 1).unwrap(), 0.0, 1e-12);
        assert_approx(ps.tunnel_flow(1, &mut scen, 2).unwrap(), 55.0, 1e-12);
        assert_approx(ps.tunnel_flow(1, &mut scen, 3).unwrap(), 100.0, 1e-12);
    }

    #[test]
    fn tunnel_flow_rejects_negative_action() {
        let mut ps = flat_efficiency_station();
        let mut scen = Scenario::new(1, 3600.0);
        scen.action[0] = -0.5;
        assert!(ps.tunnel_flow(1, &mut scen, 0).is_err());
    }

    #[test]
    fn tunnel_flow_shuts_down_on_empty_reservoir() {
        let mut ps = flat_efficiency_station();
        ps.up_res_mm3 = 0.01; // far less than an hour at full discharge
        let mut scen = Scenario::new(1, 3600.0);
        scen.action[0] = 1.0;
        assert_approx(ps.tunnel_flow(1, &mut scen, 0).unwrap(), 0.0, 1e-12);
    }

    #[test]
    fn auto_qmin_raises_small_releases() {
        let mut ps = flat_efficiency_station();
        ps.auto_qmin_m3s = 5.0;
        ps.up_res_mm3 = 1000.0;
        let mut scen = Scenario::new(1, 3600.0);
        scen.action[0] = 0.0;
        let q = ps.tunnel_flow(1, &mut scen, 0).unwrap();
        assert_approx(q, 5.0, 1e-12);
        assert_approx(scen.auto_qmin_m3s[0], 5.0, 1e-12);
    }

    #[test]
    fn adjustment_penalty_lands_on_day_close() {
        let mut ps = flat_efficiency_station();
        ps.max_adjustment_pr_day = 1;
        ps.max_adjustment_cost = 900.0;

        // Two calendar days of four steps each, power toggling twice a day.
        let mut scen = Scenario::new(8, 3600.0);
        scen.power_mwh = vec![10.0, 0.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        for t in 0..8 {
            scen.year[t] = 2023;
            scen.month[t] = 1;
            scen.day[t] = if t < 4 { 1 } else { 2 };
        }

        let total = ps.adjustment_costs(&mut scen);
        // Day 1 has three significant changes (init 0 -> 10, 10 -> 0, 0 -> 10),
        // day 2 has none.
        assert_approx(total, 900.0, 1e-12);
        assert_approx(scen.adjust_cost[3], 900.0, 1e-12);
        assert_approx(scen.adjust_cost[7], 0.0, 1e-12);
    }

    #[test]
    fn adjustment_disabled_when_negative() {
        let mut ps = flat_efficiency_station();
        ps.max_adjustment_pr_day = -1;
        ps.max_adjustment_cost = 900.0;
        let mut scen = Scenario::new(4, 3600.0);
        scen.power_mwh = vec![10.0, 0.0, 10.0, 0.0];
        assert_approx(ps.adjustment_costs(&mut scen), 0.0, 1e-12);
    }
}
