//! Save/Load of scheduler state.
//!
//! Bincode snapshot of sim time plus every node's queued commands. Graph
//! rows and routes are cheap to recompute and are not persisted. On
//! load, commands are re-enqueued with their timestamps shifted into the
//! loading session's clock; buffers for nodes not registered in the
//! target engine are skipped.

use crate::engine::CommEngine;
use commnet_logic::antenna::NodeId;
use commnet_logic::command::Command;
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Version number for the snapshot format (increment when it changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of scheduler state
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Snapshot format version
    pub version: u32,
    /// Sim time the snapshot was taken at
    pub sim_time: f64,
    /// Queued commands per node
    pub buffers: Vec<NodeBuffer>,
}

/// One node's queued commands
#[derive(Serialize, Deserialize)]
pub struct NodeBuffer {
    pub node: NodeId,
    pub commands: Vec<SavedCommand>,
}

/// A queued command, stripped to what re-enqueueing needs
#[derive(Serialize, Deserialize)]
pub struct SavedCommand {
    pub command: Command,
    pub effective_at: f64,
    pub extra_delay: f64,
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Snapshot version mismatch: expected {}, found {}",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for SaveError {}

/// Save every node's queued commands to a writer
pub fn save_commands<W: Write>(writer: W, engine: &CommEngine) -> Result<(), SaveError> {
    let buffers = engine
        .command_buffers()
        .into_iter()
        .map(|(node, queued)| NodeBuffer {
            node,
            commands: queued
                .into_iter()
                .map(|q| SavedCommand {
                    effective_at: q.effective_at,
                    extra_delay: q.extra_delay,
                    command: q.command,
                })
                .collect(),
        })
        .collect();

    let save_data = SaveData {
        version: SAVE_VERSION,
        sim_time: engine.sim_time(),
        buffers,
    };

    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Load a snapshot into an engine whose nodes are already registered.
///
/// Timestamps shift by the difference between the engine's clock and
/// the snapshot's, so relative due times survive the reload.
pub fn load_commands<R: Read>(reader: R, engine: &mut CommEngine) -> Result<(), SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let shift = engine.sim_time() - save_data.sim_time;
    for buffer in save_data.buffers {
        if !engine.registry().contains(buffer.node) {
            debug!("skipping saved buffer for unknown node {:?}", buffer.node);
            continue;
        }
        for cmd in buffer.commands {
            engine.restore_command(
                buffer.node,
                cmd.command,
                cmd.effective_at + shift,
                cmd.extra_delay,
            );
        }
    }
    Ok(())
}
