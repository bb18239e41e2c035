//! Delayed control commands and the time-ordered command buffer.
//!
//! Commands are the only external input to a node's flight computer.
//! The buffer holds commands not yet due, sorted by effective timestamp
//! with insertion order breaking ties — due commands always come out in
//! non-decreasing timestamp order, never reordered by kind or priority.

use crate::flight::{AttitudeMode, BurnRemaining};
use serde::{Deserialize, Serialize};

/// A control command addressed to one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Switch the attitude autopilot.
    Attitude { mode: AttitudeMode },
    /// Main-engine burn at fixed throttle until the condition is spent.
    Burn {
        throttle: f64,
        until: BurnRemaining,
    },
    /// Surface drive steering.
    Drive { steering: f64, speed: f64 },
    /// Toggle an action group. One-shot, no active slot.
    ActionToggle { group: u8 },
    /// Fire an opaque host event handle. One-shot; unresolvable handles
    /// are dropped when popped.
    Event { handle: u64 },
}

/// A command waiting in the buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedCommand {
    pub command: Command,
    /// Sim time at which the command becomes eligible. The ordering key.
    pub effective_at: f64,
    /// Remaining manual hold, consumed in tick-length steps after
    /// `effective_at` passes. Not part of the ordering key.
    pub extra_delay: f64,
    seq: u64,
}

impl QueuedCommand {
    /// Insertion tie-breaker among equal timestamps.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Time-ordered buffer of not-yet-due commands for one node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandBuffer {
    queue: Vec<QueuedCommand>,
    next_seq: u64,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keeping `(effective_at, insertion order)` sort.
    pub fn enqueue(&mut self, command: Command, effective_at: f64, extra_delay: f64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let at = self
            .queue
            .partition_point(|q| q.effective_at <= effective_at);
        self.queue.insert(
            at,
            QueuedCommand {
                command,
                effective_at,
                extra_delay: extra_delay.max(0.0),
                seq,
            },
        );
    }

    /// Pop every command due at `now`.
    ///
    /// A due command still holding manual extra delay burns `dt` from it
    /// instead of executing, and blocks the rest of the buffer — order is
    /// never violated.
    pub fn pop_due(&mut self, now: f64, dt: f64) -> Vec<QueuedCommand> {
        let mut due = Vec::new();
        while let Some(front) = self.queue.first_mut() {
            if front.effective_at > now {
                break;
            }
            if front.extra_delay > 0.0 {
                front.extra_delay -= dt;
                break;
            }
            due.push(self.queue.remove(0));
        }
        due
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedCommand> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle(group: u8) -> Command {
        Command::ActionToggle { group }
    }

    #[test]
    fn test_pops_in_timestamp_order() {
        let mut buffer = CommandBuffer::new();
        buffer.enqueue(toggle(5), 5.0, 0.0);
        buffer.enqueue(toggle(1), 1.0, 0.0);
        buffer.enqueue(toggle(3), 3.0, 0.0);
        let due = buffer.pop_due(6.0, 1.0);
        let times: Vec<f64> = due.iter().map(|q| q.effective_at).collect();
        assert_eq!(times, vec![1.0, 3.0, 5.0]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_not_due_stays_queued() {
        let mut buffer = CommandBuffer::new();
        buffer.enqueue(toggle(1), 10.0, 0.0);
        assert!(buffer.pop_due(9.9, 1.0).is_empty());
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.pop_due(10.0, 1.0).len(), 1);
    }

    #[test]
    fn test_equal_timestamps_keep_insertion_order() {
        let mut buffer = CommandBuffer::new();
        buffer.enqueue(toggle(1), 2.0, 0.0);
        buffer.enqueue(toggle(2), 2.0, 0.0);
        buffer.enqueue(toggle(3), 2.0, 0.0);
        let due = buffer.pop_due(2.0, 1.0);
        let groups: Vec<u8> = due
            .iter()
            .map(|q| match q.command {
                Command::ActionToggle { group } => group,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(groups, vec![1, 2, 3]);
    }

    #[test]
    fn test_extra_delay_counts_down_instead_of_executing() {
        let mut buffer = CommandBuffer::new();
        buffer.enqueue(toggle(1), 1.0, 2.0);
        // Due at t=1 but holding 2s of manual delay: two ticks burn it.
        assert!(buffer.pop_due(1.0, 1.0).is_empty());
        assert!(buffer.pop_due(2.0, 1.0).is_empty());
        assert_eq!(buffer.pop_due(3.0, 1.0).len(), 1);
    }

    #[test]
    fn test_extra_delay_blocks_later_commands() {
        let mut buffer = CommandBuffer::new();
        buffer.enqueue(toggle(1), 1.0, 5.0);
        buffer.enqueue(toggle(2), 2.0, 0.0);
        // The held front command must not be overtaken.
        assert!(buffer.pop_due(3.0, 1.0).is_empty());
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_negative_extra_delay_clamped() {
        let mut buffer = CommandBuffer::new();
        buffer.enqueue(toggle(1), 1.0, -3.0);
        assert_eq!(buffer.pop_due(1.0, 1.0).len(), 1);
    }
}
