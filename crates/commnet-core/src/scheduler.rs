//! Per-node flight computer: delayed command buffer plus active control
//! slots.
//!
//! Each node owns exactly one `FlightComputer`; there is no cross-node
//! sharing. A control tick pops every due command from the buffer into
//! the matching active slot (attitude, burn, drive) or executes it
//! immediately (action toggles, host events), then produces the tick's
//! control output. Losing the link neutralizes raw pilot input but does
//! not revoke an already-active autopilot command.

use commnet_logic::command::{Command, CommandBuffer, QueuedCommand};
use commnet_logic::flight::{self, AttitudeMode, BurnRemaining, Kinematics};
use commnet_logic::math::Vec3;
use log::warn;

/// An engine burn currently executing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveBurn {
    pub throttle: f64,
    pub remaining: BurnRemaining,
}

/// A drive command currently steering the node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveDrive {
    pub steering: f64,
    pub speed: f64,
}

/// Raw pilot input relayed to the node. Replaced by the neutral default
/// when the node has neither a link nor local control.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManualInput {
    pub throttle: f64,
    pub steering: f64,
}

/// Control outputs produced by one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlOutput {
    /// Main engine throttle, 0..1.
    pub throttle: f64,
    /// Steering input, -1..1.
    pub steering: f64,
    /// Rover cruise target, when a drive command is active.
    pub drive_speed: Option<f64>,
    /// Autopilot pointing target, when an attitude hold is active.
    pub target_orientation: Option<Vec3>,
    /// Action groups toggled this tick.
    pub toggled_groups: Vec<u8>,
    /// Host event handles fired this tick.
    pub fired_events: Vec<u64>,
}

/// Inspection snapshot of a node's pending and active commands.
#[derive(Debug, Clone)]
pub struct CommandSnapshot {
    pub queued: Vec<QueuedCommand>,
    pub attitude: Option<AttitudeMode>,
    pub burn: Option<ActiveBurn>,
    pub drive: Option<ActiveDrive>,
}

/// Delayed command scheduler and autopilot state for one node.
#[derive(Debug, Default)]
pub struct FlightComputer {
    buffer: CommandBuffer,
    attitude: Option<AttitudeMode>,
    burn: Option<ActiveBurn>,
    drive: Option<ActiveDrive>,
    manual: ManualInput,
    last_velocity: Option<Vec3>,
}

impl FlightComputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command that becomes eligible at `effective_at`, holding
    /// `extra_delay` seconds of manual countdown past that.
    pub fn enqueue(&mut self, command: Command, effective_at: f64, extra_delay: f64) {
        self.buffer.enqueue(command, effective_at, extra_delay);
    }

    pub fn set_manual_input(&mut self, input: ManualInput) {
        self.manual = input;
    }

    pub fn queued_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn snapshot(&self) -> CommandSnapshot {
        CommandSnapshot {
            queued: self.buffer.iter().cloned().collect(),
            attitude: self.attitude,
            burn: self.burn,
            drive: self.drive,
        }
    }

    /// One control tick at sim time `now`.
    ///
    /// `input_authorized` is false when the node has neither a link nor
    /// local control; raw pilot input then falls back to neutral while
    /// active autopilot slots keep executing. `resolve_event` executes
    /// opaque host event handles; returning false drops the command
    /// without stalling the buffer.
    pub fn tick(
        &mut self,
        now: f64,
        dt: f64,
        kin: Option<&Kinematics>,
        input_authorized: bool,
        resolve_event: &mut dyn FnMut(u64) -> bool,
    ) -> ControlOutput {
        let mut out = ControlOutput::default();

        for queued in self.buffer.pop_due(now, dt) {
            match queued.command {
                Command::Attitude { mode } => self.attitude = Some(mode),
                Command::Burn { throttle, until } => {
                    self.burn = Some(ActiveBurn {
                        throttle,
                        remaining: until,
                    });
                }
                Command::Drive { steering, speed } => {
                    self.drive = Some(ActiveDrive { steering, speed });
                }
                Command::ActionToggle { group } => out.toggled_groups.push(group),
                Command::Event { handle } => {
                    if resolve_event(handle) {
                        out.fired_events.push(handle);
                    } else {
                        warn!("dropping command with unresolvable event handle {}", handle);
                    }
                }
            }
        }

        if input_authorized {
            out.throttle = self.manual.throttle;
            out.steering = self.manual.steering;
        }

        if let (Some(mode), Some(kin)) = (&self.attitude, kin) {
            out.target_orientation = flight::target_orientation(mode, kin);
        }

        if let Some(burn) = self.burn {
            out.throttle = burn.throttle;
            let observed_dv = match (self.last_velocity, kin) {
                (Some(last), Some(kin)) => (kin.velocity - last).length(),
                _ => 0.0,
            };
            self.burn = flight::burn_step(burn.remaining, dt, observed_dv).map(|remaining| {
                ActiveBurn {
                    throttle: burn.throttle,
                    remaining,
                }
            });
        }

        if let Some(drive) = &self.drive {
            out.steering = drive.steering;
            out.drive_speed = Some(drive.speed);
        }

        self.last_velocity = kin.map(|k| k.velocity);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commnet_logic::flight::{FlightAttitude, ReferenceFrame};

    fn accept_all() -> impl FnMut(u64) -> bool {
        |_| true
    }

    fn kin() -> Kinematics {
        Kinematics {
            position: Vec3::new(1000.0, 0.0, 0.0),
            velocity: Vec3::new(0.0, 10.0, 0.0),
            orientation: Vec3::new(1.0, 0.0, 0.0),
            body_position: Vec3::ZERO,
        }
    }

    #[test]
    fn test_burn_runs_for_duration_then_clears() {
        let mut fc = FlightComputer::new();
        fc.enqueue(
            Command::Burn {
                throttle: 0.8,
                until: BurnRemaining::Duration(5.0),
            },
            0.0,
            0.0,
        );
        let sample = kin();
        let mut resolve = accept_all();
        // Ticks 1..=5 burn, tick 6 is quiet.
        for tick in 1..=6 {
            let out = fc.tick(tick as f64, 1.0, Some(&sample), false, &mut resolve);
            if tick <= 5 {
                assert!(out.throttle > 0.0, "tick {} should burn", tick);
            } else {
                assert_eq!(out.throttle, 0.0, "tick {} should be quiet", tick);
                assert!(fc.snapshot().burn.is_none());
            }
        }
    }

    #[test]
    fn test_delta_v_burn_consumes_velocity_change() {
        let mut fc = FlightComputer::new();
        fc.enqueue(
            Command::Burn {
                throttle: 1.0,
                until: BurnRemaining::DeltaV(25.0),
            },
            0.0,
            0.0,
        );
        let mut sample = kin();
        let mut resolve = accept_all();
        // Prime last_velocity and start the burn.
        fc.tick(1.0, 1.0, Some(&sample), false, &mut resolve);
        // 10 m/s of velocity change per tick: spent after three ticks.
        for tick in 2..=4 {
            sample.velocity.y += 10.0;
            let out = fc.tick(tick as f64, 1.0, Some(&sample), false, &mut resolve);
            assert!(out.throttle > 0.0);
        }
        sample.velocity.y += 10.0;
        let out = fc.tick(5.0, 1.0, Some(&sample), false, &mut resolve);
        assert_eq!(out.throttle, 0.0);
    }

    #[test]
    fn test_attitude_hold_recomputes_each_tick() {
        let mut fc = FlightComputer::new();
        fc.enqueue(
            Command::Attitude {
                mode: AttitudeMode::AttitudeHold {
                    frame: ReferenceFrame::Orbit,
                    attitude: FlightAttitude::Prograde,
                },
            },
            0.0,
            0.0,
        );
        let mut sample = kin();
        let mut resolve = accept_all();
        let out = fc.tick(1.0, 1.0, Some(&sample), false, &mut resolve);
        assert!((out.target_orientation.unwrap() - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-9);
        // Velocity swings; the hold follows without a new command.
        sample.velocity = Vec3::new(-10.0, 0.0, 0.0);
        let out = fc.tick(2.0, 1.0, Some(&sample), false, &mut resolve);
        assert!((out.target_orientation.unwrap() - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_lost_authorization_neutralizes_manual_input_only() {
        let mut fc = FlightComputer::new();
        fc.set_manual_input(ManualInput {
            throttle: 0.5,
            steering: 0.3,
        });
        fc.enqueue(
            Command::Burn {
                throttle: 1.0,
                until: BurnRemaining::Duration(10.0),
            },
            0.0,
            0.0,
        );
        let sample = kin();
        let mut resolve = accept_all();
        let out = fc.tick(1.0, 1.0, Some(&sample), false, &mut resolve);
        // Manual steer suppressed, autopilot burn not.
        assert_eq!(out.steering, 0.0);
        assert_eq!(out.throttle, 1.0);
        // With the link back, manual steering returns.
        let out = fc.tick(2.0, 1.0, Some(&sample), true, &mut resolve);
        assert_eq!(out.steering, 0.3);
    }

    #[test]
    fn test_toggles_and_events_are_one_shot() {
        let mut fc = FlightComputer::new();
        fc.enqueue(Command::ActionToggle { group: 4 }, 0.0, 0.0);
        fc.enqueue(Command::Event { handle: 99 }, 0.0, 0.0);
        let mut resolve = accept_all();
        let out = fc.tick(1.0, 1.0, None, false, &mut resolve);
        assert_eq!(out.toggled_groups, vec![4]);
        assert_eq!(out.fired_events, vec![99]);
        let snapshot = fc.snapshot();
        assert!(snapshot.queued.is_empty());
        assert!(snapshot.attitude.is_none());
        // Nothing recurs next tick.
        let out = fc.tick(2.0, 1.0, None, false, &mut resolve);
        assert!(out.toggled_groups.is_empty());
        assert!(out.fired_events.is_empty());
    }

    #[test]
    fn test_unresolvable_event_dropped_without_stalling() {
        let mut fc = FlightComputer::new();
        fc.enqueue(Command::Event { handle: 1 }, 0.0, 0.0);
        fc.enqueue(Command::ActionToggle { group: 2 }, 0.5, 0.0);
        let mut reject = |_handle: u64| false;
        let out = fc.tick(1.0, 1.0, None, false, &mut reject);
        assert!(out.fired_events.is_empty());
        // The later command still executed this tick.
        assert_eq!(out.toggled_groups, vec![2]);
    }

    #[test]
    fn test_drive_slot_persists() {
        let mut fc = FlightComputer::new();
        fc.enqueue(
            Command::Drive {
                steering: -0.4,
                speed: 12.0,
            },
            0.0,
            0.0,
        );
        let mut resolve = accept_all();
        for tick in 1..=3 {
            let out = fc.tick(tick as f64, 1.0, None, false, &mut resolve);
            assert_eq!(out.steering, -0.4);
            assert_eq!(out.drive_speed, Some(12.0));
        }
    }

    #[test]
    fn test_new_attitude_command_replaces_slot() {
        let mut fc = FlightComputer::new();
        fc.enqueue(
            Command::Attitude {
                mode: AttitudeMode::KillRotation,
            },
            0.0,
            0.0,
        );
        fc.enqueue(
            Command::Attitude {
                mode: AttitudeMode::Off,
            },
            2.0,
            0.0,
        );
        let mut resolve = accept_all();
        fc.tick(1.0, 1.0, None, false, &mut resolve);
        assert_eq!(fc.snapshot().attitude, Some(AttitudeMode::KillRotation));
        fc.tick(2.0, 1.0, None, false, &mut resolve);
        assert_eq!(fc.snapshot().attitude, Some(AttitudeMode::Off));
    }
}
