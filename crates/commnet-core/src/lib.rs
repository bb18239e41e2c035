//! CommNet Core - Relay Network Simulation Engine
//!
//! Simulates a communication network among mobile nodes (vessels and one
//! fixed ground station) with finite-range, line-of-sight-limited radio
//! links, and executes control commands under the latency those links
//! imply.
//!
//! # Architecture
//!
//! Node storage is an ECS world via `hecs`; everything else is
//! tick-driven, single-threaded, single-writer:
//! - **Registry**: live node set, stable identities, add/remove
//!   notifications
//! - **Graph updater**: recomputes a bounded batch of adjacency rows per
//!   tick, amortizing the O(n²) sweep over a refresh window
//! - **Path cache**: last known route to the ground station per tracked
//!   origin, with derived signal delay
//! - **Flight computers**: per-node delayed command buffers and the
//!   attitude/burn/drive autopilot slots
//!
//! # Example
//!
//! ```rust,no_run
//! use commnet_core::prelude::*;
//!
//! let mut engine = CommEngine::new(
//!     EngineConfig::default(),
//!     Box::new(TableKinematics::new()),
//!     Box::new(NoLocalControl),
//!     Box::new(AcceptAllEvents),
//! );
//!
//! // Run the simulation
//! loop {
//!     engine.tick(0.02); // one physics step
//! }
//! ```

pub mod components;
pub mod connection;
pub mod engine;
pub mod events;
pub mod generation;
pub mod graph;
pub mod persistence;
pub mod registry;
pub mod scheduler;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::connection::Route;
    pub use crate::engine::{
        AcceptAllEvents, AlwaysLocalControl, CommEngine, ControlAuthority, EngineConfig,
        EventResolver, KinematicsProvider, NoLocalControl, TableKinematics,
    };
    pub use crate::registry::NodeSpec;
    pub use commnet_logic::antenna::{Body, BodyId, DishAntenna, DishTarget, LinkKind, NodeId};
    pub use commnet_logic::command::Command;
    pub use commnet_logic::flight::{AttitudeMode, BurnRemaining, Kinematics};
    pub use commnet_logic::math::Vec3;
}
