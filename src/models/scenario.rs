/// Trajectory buffers owned by one node across the whole horizon.
///
/// Input series (inflow, action, price, dates) are copied in before the run;
/// everything else is written by the node's step. `up_inflow` doubles as an
/// accumulator that upstream nodes add into while stepping the same
/// timestep, so it is re-zeroed at the start of every simulation.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub stps: usize,
    pub dt: f64,

    // Inputs
    pub inflow: Vec<f64>,  // local inflow [m3/s]
    pub action: Vec<f64>,  // operator setpoint [0,1]
    pub price: Vec<f64>,   // market price [Euro/MWh]
    pub year: Vec<i32>,
    pub month: Vec<u32>,
    pub day: Vec<u32>,
    pub hour: Vec<u32>,

    // Flows
    pub up_inflow: Vec<f64>,      // accumulated from upstream [m3/s]
    pub tot_inflow: Vec<f64>,     // local + upstream [m3/s]
    pub tot_outflow: Vec<f64>,    // everything leaving the node [m3/s]
    pub tunnelflow_m3s: Vec<f64>,
    pub hatchflow_m3s: Vec<f64>,
    pub overflow_m3s: Vec<f64>,
    pub auto_qmin_m3s: Vec<f64>,

    // Storage
    pub res_mm3: Vec<f64>,             // reservoir filling [Mm3]
    pub res_masl: Vec<f64>,            // reservoir level [masl]
    pub res_fr: Vec<f64>,              // filling fraction, 0 at LRW, 1 at HRW
    pub overflow_mm3: Vec<f64>,        // spilled volume [Mm3]
    pub channel_storage_mm3: Vec<f64>, // in-transit channel water [Mm3]

    // Power and economy
    pub h_brutto: Vec<f64>,   // gross head [m]
    pub h_netto: Vec<f64>,    // net head after losses [m]
    pub power_mwh: Vec<f64>,  // produced energy [MWh]
    pub income: Vec<f64>,     // [Euro]
    pub cost: Vec<f64>,       // penalties [Euro]
    pub profit: Vec<f64>,     // income - cost [Euro]
    pub adjust_cost: Vec<f64>,

    // Accumulated over the run
    pub sum_local_inflow_mm3: f64,
}

impl Scenario {
    pub fn new(stps: usize, dt: f64) -> Scenario {
        Scenario {
            stps,
            dt,
            inflow: vec![0.0; stps],
            action: vec![0.0; stps],
            price: vec![0.0; stps],
            year: vec![0; stps],
            month: vec![0; stps],
            day: vec![0; stps],
            hour: vec![0; stps],
            up_inflow: vec![0.0; stps],
            tot_inflow: vec![0.0; stps],
            tot_outflow: vec![0.0; stps],
            tunnelflow_m3s: vec![0.0; stps],
            hatchflow_m3s: vec![0.0; stps],
            overflow_m3s: vec![0.0; stps],
            auto_qmin_m3s: vec![0.0; stps],
            res_mm3: vec![0.0; stps],
            res_masl: vec![0.0; stps],
            res_fr: vec![0.0; stps],
            overflow_mm3: vec![0.0; stps],
            channel_storage_mm3: vec![0.0; stps],
            h_brutto: vec![0.0; stps],
            h_netto: vec![0.0; stps],
            power_mwh: vec![0.0; stps],
            income: vec![0.0; stps],
            cost: vec![0.0; stps],
            profit: vec![0.0; stps],
            adjust_cost: vec![0.0; stps],
            sum_local_inflow_mm3: 0.0,
        }
    }

    /// Clear everything a repeated simulation run accumulates into.
    pub fn reset_accumulators(&mut self) {
        for v in self.up_inflow.iter_mut() {
            *v = 0.0;
        }
        for v in self.adjust_cost.iter_mut() {
            *v = 0.0;
        }
        self.sum_local_inflow_mm3 = 0.0;
    }
}
