//! Signal propagation arithmetic.
//!
//! Latency is proportional to route length: the cost accumulated by the
//! pathfinder is Euclidean distance in meters, divided here by a
//! propagation speed to get seconds.

/// Default propagation speed (m/s). Vacuum light speed; hosts can tune
/// it down for gameplay pacing.
pub const SIGNAL_SPEED_M_S: f64 = 299_792_458.0;

/// One-way latency in seconds for a route of `path_length_m` meters.
pub fn propagation_delay(path_length_m: f64, signal_speed_m_s: f64) -> f64 {
    if signal_speed_m_s <= 0.0 {
        return f64::INFINITY;
    }
    path_length_m / signal_speed_m_s
}
