//! Attitude targeting and burn countdown arithmetic.
//!
//! Pure functions consumed by the flight computer each control tick.
//! Orientation targets are unit direction vectors derived from the live
//! kinematic sample; holds are recomputed every tick, never cached.

use crate::math::Vec3;
use serde::{Deserialize, Serialize};

/// Reference frame an attitude hold is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceFrame {
    /// Orbital velocity frame.
    Orbit,
    /// Surface-relative frame: velocity projected onto the local horizon.
    Surface,
    /// Velocity relative to a tracked target (host supplies the sample).
    TargetVelocity,
    /// World +Z projected onto the local horizon.
    North,
}

/// Which way to point within the reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightAttitude {
    Prograde,
    Retrograde,
    NormalPlus,
    NormalMinus,
    RadialPlus,
    RadialMinus,
}

/// Attitude autopilot mode. `Off` and `KillRotation` need no per-tick
/// recompute; the holds do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AttitudeMode {
    Off,
    KillRotation,
    AttitudeHold {
        frame: ReferenceFrame,
        attitude: FlightAttitude,
    },
    /// Hold a target altitude; steering falls back to radial-out with
    /// the commanded altitude exposed for the host autopilot.
    AltitudeHold { meters: f64 },
}

/// Live kinematic sample for one node, relative to its body of
/// reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Current facing, unit vector.
    pub orientation: Vec3,
    /// Center of the body of reference.
    pub body_position: Vec3,
}

/// Target orientation for the current attitude mode, or `None` when the
/// mode steers nothing (`Off`, `KillRotation`).
pub fn target_orientation(mode: &AttitudeMode, kin: &Kinematics) -> Option<Vec3> {
    match mode {
        AttitudeMode::Off | AttitudeMode::KillRotation => None,
        AttitudeMode::AttitudeHold { frame, attitude } => {
            Some(hold_direction(*frame, *attitude, kin))
        }
        AttitudeMode::AltitudeHold { .. } => Some(radial_out(kin)),
    }
}

fn radial_out(kin: &Kinematics) -> Vec3 {
    (kin.position - kin.body_position).normalize()
}

fn hold_direction(frame: ReferenceFrame, attitude: FlightAttitude, kin: &Kinematics) -> Vec3 {
    let radial = radial_out(kin);
    let forward = match frame {
        ReferenceFrame::Orbit | ReferenceFrame::TargetVelocity => kin.velocity.normalize(),
        ReferenceFrame::Surface => {
            // Strip the vertical component of velocity.
            let v = kin.velocity;
            (v - radial * v.dot(&radial)).normalize()
        }
        ReferenceFrame::North => {
            let up = Vec3::new(0.0, 0.0, 1.0);
            (up - radial * up.dot(&radial)).normalize()
        }
    };
    let normal = radial.cross(&forward).normalize();
    match attitude {
        FlightAttitude::Prograde => forward,
        FlightAttitude::Retrograde => -forward,
        FlightAttitude::NormalPlus => normal,
        FlightAttitude::NormalMinus => -normal,
        FlightAttitude::RadialPlus => radial,
        FlightAttitude::RadialMinus => -radial,
    }
}

/// Remaining-burn condition: wall-clock seconds or velocity change to
/// consume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BurnRemaining {
    Duration(f64),
    DeltaV(f64),
}

/// Advance a burn by one tick. `observed_dv` is the magnitude of the
/// velocity change since the previous tick, used by delta-v burns.
/// Returns `None` when the burn is spent.
pub fn burn_step(remaining: BurnRemaining, dt: f64, observed_dv: f64) -> Option<BurnRemaining> {
    match remaining {
        BurnRemaining::Duration(secs) => {
            let left = secs - dt;
            (left > 0.0).then_some(BurnRemaining::Duration(left))
        }
        BurnRemaining::DeltaV(dv) => {
            let left = dv - observed_dv;
            (left > 0.0).then_some(BurnRemaining::DeltaV(left))
        }
    }
}
