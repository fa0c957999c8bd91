use tracing::warn;

use crate::config::constants::{m3s_to_mm3, mm3_to_m3s};
use crate::models::curve::{Curve, CurveError};
use crate::models::node::{Downstream, NodeKind, SimError};
use crate::models::qmin::QminSchedule;
use crate::models::scenario::Scenario;

/// Operator-controlled regulated release through a hatch gate.
#[derive(Debug, Clone)]
pub struct HatchOutlet {
    pub downstream: usize,
    pub min_q_m3s: f64,
    pub max_q_m3s: f64,
    /// Sill level of the hatch. The gate cannot drain the reservoir below it.
    pub hatch_masl: f64,
}

/// Automatic environmental release mandated by a seasonal schedule.
/// The penalty is charged where the violation is observed (the receiving
/// channel), so the schedule here carries requirement only.
#[derive(Debug, Clone)]
pub struct AutoQminOutlet {
    pub downstream: usize,
    pub schedule: QminSchedule,
}

/// Storage node with up to four prioritised outlets.
///
/// Outlet order within a timestep is tunnel, hatch, auto-qmin, overflow.
/// The tunnel goes first because the downstream powerstation samples the
/// post-inflow level and available volume; overflow goes last because it
/// depends on the final level.
#[derive(Debug)]
pub struct Reservoir {
    pub init_fr: f64,
    pub hrw_masl: f64,
    pub lrw_masl: f64,
    /// Cost per hour while the level sits below LRW [Euro/h].
    pub penalty_per_hour: f64,

    pub masl_to_mm3: Curve,
    pub mm3_to_masl: Curve,
    /// Level to spill discharge [masl -> m3/s].
    pub overflow_curve: Curve,
    pub overflow_downstream: usize,

    pub hatch: Option<HatchOutlet>,
    pub tunnel_downstream: Option<usize>,
    pub auto_qmin: Option<AutoQminOutlet>,

    // Derived at init
    filling_at_lrw_mm3: f64,
    filling_at_hrw_mm3: f64,
    filling_at_hatch_mm3: f64,

    // Mutable state
    pub res_mm3: f64,
    pub res_masl: f64,
}

impl Reservoir {
    /// `level_points` are (masl, Mm3) pairs, `overflow_points` are
    /// (masl, m3/s) pairs, both strictly ascending in x.
    pub fn new(
        hrw_masl: f64,
        lrw_masl: f64,
        penalty_per_hour: f64,
        level_points: &[(f64, f64)],
        overflow_points: &[(f64, f64)],
        overflow_downstream: usize,
    ) -> Result<Reservoir, CurveError> {
        let masl_to_mm3 = Curve::new(level_points)?;
        let inverted: Vec<(f64, f64)> = level_points.iter().map(|&(m, v)| (v, m)).collect();
        let mm3_to_masl = Curve::new(&inverted)?;
        let overflow_curve = Curve::new(overflow_points)?;

        Ok(Reservoir {
            init_fr: 0.0,
            hrw_masl,
            lrw_masl,
            penalty_per_hour,
            masl_to_mm3,
            mm3_to_masl,
            overflow_curve,
            overflow_downstream,
            hatch: None,
            tunnel_downstream: None,
            auto_qmin: None,
            filling_at_lrw_mm3: 0.0,
            filling_at_hrw_mm3: 0.0,
            filling_at_hatch_mm3: 0.0,
            res_mm3: 0.0,
            res_masl: 0.0,
        })
    }

    /// Reset the reservoir to its initial filling. Called before every run
    /// so repeated simulations over the same horizon start identically.
    pub fn init(&mut self, idnr: usize) -> Result<(), SimError> {
        if self.init_fr < -1.0 {
            return Err(SimError::NonPhysicalFilling {
                node: idnr,
                fraction: self.init_fr,
            });
        }

        self.filling_at_lrw_mm3 = self.level_to_volume(idnr, self.lrw_masl)?;
        self.filling_at_hrw_mm3 = self.level_to_volume(idnr, self.hrw_masl)?;
        if let Some(h) = &self.hatch {
            let hatch_masl = h.hatch_masl;
            self.filling_at_hatch_mm3 = self.level_to_volume(idnr, hatch_masl)?;
        }

        // The regulated volume sits between LRW and HRW; dead water below
        // LRW is carried in res_mm3 but is not available for production.
        self.res_mm3 = self.filling_at_lrw_mm3
            + self.init_fr * (self.filling_at_hrw_mm3 - self.filling_at_lrw_mm3);
        self.res_masl = self.volume_to_level(idnr, self.res_mm3)?;
        Ok(())
    }

    pub fn start_water_mm3(&self) -> f64 {
        self.filling_at_lrw_mm3
            + self.init_fr * (self.filling_at_hrw_mm3 - self.filling_at_lrw_mm3)
    }

    pub fn filling_at_lrw_mm3(&self) -> f64 {
        self.filling_at_lrw_mm3
    }

    pub fn filling_at_hrw_mm3(&self) -> f64 {
        self.filling_at_hrw_mm3
    }

    fn level_to_volume(&self, idnr: usize, masl: f64) -> Result<f64, SimError> {
        self.masl_to_mm3
            .x2y(masl)
            .map_err(|source| SimError::Curve { node: idnr, source })
    }

    fn volume_to_level(&self, idnr: usize, mm3: f64) -> Result<f64, SimError> {
        self.mm3_to_masl
            .x2y(mm3)
            .map_err(|source| SimError::Curve { node: idnr, source })
    }

    /// Spill for the current level, clipped so the spillway cannot draw the
    /// reservoir below the HRW filling [Mm3].
    fn calc_overflow_mm3(&self, idnr: usize, dt: f64) -> Result<f64, SimError> {
        if self.res_masl <= self.overflow_curve.xmin {
            return Ok(0.0);
        }
        let q_m3s = self
            .overflow_curve
            .x2y(self.res_masl)
            .map_err(|source| SimError::Curve { node: idnr, source })?;
        let mut overflow_mm3 = m3s_to_mm3(q_m3s, dt);

        // Large timesteps can spill past the crest level in one go.
        let max_overflow = self.res_mm3 - self.filling_at_hrw_mm3;
        if overflow_mm3 > max_overflow {
            overflow_mm3 = max_overflow;
        }
        if overflow_mm3 < 0.0 {
            return Err(SimError::NegativeOverflow {
                node: idnr,
                overflow_mm3,
            });
        }
        Ok(overflow_mm3)
    }

    /// Advance one timestep. Returns the water above dead storage still in
    /// the reservoir [Mm3].
    pub fn step(
        &mut self,
        idnr: usize,
        scen: &mut Scenario,
        down: &mut Downstream,
        t: usize,
    ) -> Result<f64, SimError> {
        let dt = scen.dt;

        let local_mm3 = m3s_to_mm3(scen.inflow[t], dt);
        let up_mm3 = m3s_to_mm3(scen.up_inflow[t], dt);
        self.res_mm3 += local_mm3 + up_mm3;
        scen.sum_local_inflow_mm3 += local_mm3;
        self.res_masl = self.volume_to_level(idnr, self.res_mm3)?;

        // TUNNEL. The downstream powerstation decides the flow from the
        // post-inflow level and the volume actually available.
        let mut tunnelflow_mm3 = 0.0;
        if let Some(ds) = self.tunnel_downstream {
            let target = down.node_mut(ds, idnr)?;
            let target_scen = &mut target.scenario;
            let ps = match &mut target.kind {
                NodeKind::Powerstation(ps) => ps,
                _ => {
                    return Err(SimError::TunnelIntoNonPowerstation {
                        node: idnr,
                        downstream: ds,
                    })
                }
            };
            ps.start_of_stp_masl = self.res_masl;
            ps.up_res_mm3 = self.res_mm3;
            let q_m3s = ps.tunnel_flow(ds, target_scen, t)?;
            target_scen.up_inflow[t] += q_m3s;
            tunnelflow_mm3 = m3s_to_mm3(q_m3s, dt);

            self.res_mm3 -= tunnelflow_mm3;
            self.res_masl = self.volume_to_level(idnr, self.res_mm3)?;
        }

        // HATCH. Regulated release set by the operator action, blocked when
        // the level is at or below the sill.
        let mut hatchflow_mm3 = 0.0;
        if let Some(h) = &self.hatch {
            if self.res_masl > h.hatch_masl {
                let q_m3s = h.min_q_m3s + scen.action[t] * (h.max_q_m3s - h.min_q_m3s);
                hatchflow_mm3 = m3s_to_mm3(q_m3s, dt);
                let max_hatchflow = self.res_mm3 - self.filling_at_hatch_mm3;
                if hatchflow_mm3 > max_hatchflow {
                    hatchflow_mm3 = max_hatchflow;
                }
            }
            down.push_up_inflow(h.downstream, idnr, t, mm3_to_m3s(hatchflow_mm3, dt))?;
            self.res_mm3 -= hatchflow_mm3;
            self.res_masl = self.volume_to_level(idnr, self.res_mm3)?;
        }

        // AUTO QMIN. Automatic release towards a seasonal requirement. The
        // penalty for falling short is charged at the receiving channel.
        let mut auto_qmin_mm3 = 0.0;
        if let Some(a) = &self.auto_qmin {
            let (q_m3s, _) = a.schedule.required(scen.month[t], scen.day[t]);
            down.push_up_inflow(a.downstream, idnr, t, q_m3s)?;
            auto_qmin_mm3 = m3s_to_mm3(q_m3s, dt);
            self.res_mm3 -= auto_qmin_mm3;
            self.res_masl = self.volume_to_level(idnr, self.res_mm3)?;
        }

        // OVERFLOW, always present and evaluated last.
        let overflow_mm3 = self.calc_overflow_mm3(idnr, dt)?;
        down.push_up_inflow(self.overflow_downstream, idnr, t, mm3_to_m3s(overflow_mm3, dt))?;
        self.res_mm3 -= overflow_mm3;
        self.res_masl = self.volume_to_level(idnr, self.res_mm3)?;

        let mut cost_lrw = 0.0;
        if self.res_masl < self.lrw_masl {
            cost_lrw = self.penalty_per_hour * dt / 3600.0;
            warn!(
                node = idnr,
                res_masl = self.res_masl,
                lrw = self.lrw_masl,
                "reservoir below LRW, penalty accrued"
            );
        }

        if let Some(ds) = self.tunnel_downstream {
            let target = down.node_mut(ds, idnr)?;
            if let NodeKind::Powerstation(ps) = &mut target.kind {
                ps.end_of_stp_masl = self.res_masl;
            }
        }

        let span = self.filling_at_hrw_mm3 - self.filling_at_lrw_mm3;
        let fract_filling = (self.res_mm3 - self.filling_at_lrw_mm3) / span;
        if fract_filling < -1.0 {
            return Err(SimError::NonPhysicalFilling {
                node: idnr,
                fraction: fract_filling,
            });
        }
        let remaining_available_mm3 = (self.res_mm3 - self.filling_at_lrw_mm3).max(0.0);

        let tot_out_mm3 = tunnelflow_mm3 + hatchflow_mm3 + auto_qmin_mm3 + overflow_mm3;
        scen.tot_inflow[t] = scen.inflow[t] + scen.up_inflow[t];
        scen.tot_outflow[t] = mm3_to_m3s(tot_out_mm3, dt);
        scen.tunnelflow_m3s[t] = mm3_to_m3s(tunnelflow_mm3, dt);
        scen.hatchflow_m3s[t] = mm3_to_m3s(hatchflow_mm3, dt);
        scen.overflow_m3s[t] = mm3_to_m3s(overflow_mm3, dt);
        scen.auto_qmin_m3s[t] = mm3_to_m3s(auto_qmin_mm3, dt);
        scen.res_mm3[t] = self.res_mm3;
        scen.res_masl[t] = self.res_masl;
        scen.res_fr[t] = fract_filling;
        scen.overflow_mm3[t] = overflow_mm3;
        scen.income[t] = 0.0;
        scen.cost[t] = cost_lrw;

        Ok(remaining_available_mm3)
    }
}
