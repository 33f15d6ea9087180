use crate::params::DriverParams;

/// The smallest gap passed to the acceleration model, in m.
pub const MIN_GAP: f64 = 1e-9; // m

/// Computes an acceleration using the intelligent driver model.
///
/// # Parameters
/// * `vel` - The velocity of the simulated vehicle (m/s).
/// * `leader_vel` - The velocity of the vehicle ahead (m/s).
/// * `gap` - The distance between this vehicle's front and the rear of the
///   vehicle ahead, in m. Must be positive; see [MIN_GAP].
/// * `params` - The driver's parameters.
pub fn idm(vel: f64, leader_vel: f64, gap: f64, params: &DriverParams) -> f64 {
    debug_assert!(gap > 0.0, "gap must be clamped before calling idm");

    let appr = vel - leader_vel;
    let factor = 1.0 / (2.0 * (params.max_acceleration * params.comf_deceleration).sqrt());
    let ss = params.jam_distance
        + params.jam_distance_dyn * (vel / params.desired_speed).sqrt()
        + params.time_headway * vel
        + (vel + appr) * factor;
    let free = (vel / params.desired_speed).powf(params.exponent);
    let term = ss / gap;
    params.max_acceleration * (1.0 - free - term * term)
}
