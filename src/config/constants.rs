// Physical constants and tolerances shared across the simulation.

/// Average Earth gravity [m/s2].
pub const GRAVITY: f64 = 9.80665;

/// Accepted volumetric error in the water balance checks [Mm3],
/// both per node and for the whole system.
pub const WATER_BALANCE_TOLERANCE_MM3: f64 = 1.0e-4;

/// A powerstation counts as running when it produced at least this
/// much energy in a timestep [MWh].
pub const POWER_ON_THRESHOLD_MWH: f64 = 0.001;

/// Power output change that counts as an adjustment [MW].
pub const SIGNIFICANT_POWER_CHANGE_MW: f64 = 0.1;

/// Action values below this are treated as "no production".
pub const ACTION_OFF_THRESHOLD: f64 = 0.01;

/// Sanity bounds for local inflow values read from file [m3/s].
pub const MAX_REASONABLE_INFLOW_M3S: f64 = 5000.0;

/// Sanity bounds for market prices read from file [Euro/MWh].
pub const MAX_REASONABLE_PRICE_EUR: f64 = 5000.0;

/// Convert a flow in m3/s over a timestep of `dt` seconds to a volume in Mm3.
#[inline]
pub fn m3s_to_mm3(q_m3s: f64, dt: f64) -> f64 {
    q_m3s * dt / 1.0e6
}

/// Convert a volume in Mm3 to the equivalent constant flow in m3/s over `dt` seconds.
#[inline]
pub fn mm3_to_m3s(v_mm3: f64, dt: f64) -> f64 {
    v_mm3 * 1.0e6 / dt
}
