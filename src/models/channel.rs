use tracing::warn;

use crate::models::node::{Downstream, SimError};
use crate::models::qmin::QminSchedule;
use crate::models::scenario::Scenario;

/// Water-conveyance channel modelled as translation with decay.
///
/// The channel holds `traveltime` cells of stored volume [m3]. Each step,
/// every cell passes the `decay` fraction of its content to the next cell,
/// the last cell's drainage leaves the channel, and cell 0 is charged with
/// the step's upstream inflow. `traveltime = 0` is a pure pass-through.
#[derive(Debug)]
pub struct Channel {
    pub traveltime: usize,
    pub decay: f64,
    pub waterflow_m3: Vec<f64>,
    pub init_waterflow_m3: Vec<f64>,
    pub qmin: Option<QminSchedule>,
}

impl Channel {
    pub fn new(traveltime: usize, decay: f64) -> Channel {
        Channel {
            traveltime,
            decay,
            waterflow_m3: vec![0.0; traveltime],
            init_waterflow_m3: vec![0.0; traveltime],
            qmin: None,
        }
    }

    /// Install the per-cell volumes the channel starts every run from.
    pub fn set_initial_storage(&mut self, cells: &[f64]) {
        self.init_waterflow_m3 = cells.to_vec();
        self.waterflow_m3 = cells.to_vec();
    }

    /// Restore the in-transit water to its initial state.
    pub fn reset(&mut self) {
        self.waterflow_m3.copy_from_slice(&self.init_waterflow_m3);
    }

    pub fn start_water_mm3(&self) -> f64 {
        self.init_waterflow_m3.iter().sum::<f64>() / 1.0e6
    }

    pub fn end_water_mm3(&self) -> f64 {
        self.waterflow_m3.iter().sum::<f64>() / 1.0e6
    }

    /// Advance one timestep. Returns the in-transit water [Mm3], which is
    /// all above dead storage.
    pub fn step(
        &mut self,
        idnr: usize,
        scen: &mut Scenario,
        down: &mut Downstream,
        downstream: Option<usize>,
        t: usize,
    ) -> Result<f64, SimError> {
        let dt = scen.dt;

        if self.traveltime == 0 {
            scen.tot_outflow[t] = scen.up_inflow[t];
            scen.channel_storage_mm3[t] = 0.0;
        } else {
            let tt = self.traveltime;
            let w = &mut self.waterflow_m3;

            // Exit volume drains from the last cell.
            scen.tot_outflow[t] = w[tt - 1] * self.decay / dt;

            // Work out every cell's exchange before mutating any of them,
            // so the transfer uses start-of-step contents throughout.
            let mut inflow = vec![0.0; tt];
            let mut outflow = vec![0.0; tt];
            inflow[0] = scen.up_inflow[t] * dt;
            for s in 1..tt {
                inflow[s] = w[s - 1] * self.decay;
            }
            for s in 0..tt {
                outflow[s] = w[s] * self.decay;
            }
            for s in 0..tt {
                w[s] += inflow[s] - outflow[s];
            }

            scen.channel_storage_mm3[t] = w.iter().sum::<f64>() / 1.0e6;
        }

        if let Some(ds) = downstream {
            down.push_up_inflow(ds, idnr, t, scen.tot_outflow[t])?;
        }

        let mut cost_qmin = 0.0;
        if let Some(q) = &self.qmin {
            let (required_m3s, penalty_per_hour) = q.required(scen.month[t], scen.day[t]);
            if scen.tot_outflow[t] < required_m3s {
                cost_qmin = penalty_per_hour * dt / 3600.0;
                warn!(
                    node = idnr,
                    outflow = scen.tot_outflow[t],
                    required = required_m3s,
                    "minimum discharge violated"
                );
            }
        }

        scen.tot_inflow[t] = scen.up_inflow[t];
        scen.income[t] = 0.0;
        scen.cost[t] = cost_qmin;

        Ok(scen.channel_storage_mm3[t].max(0.0))
    }
}
