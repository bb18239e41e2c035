//! Pure relay-network logic for CommNet.
//!
//! This crate contains all link and command logic that is independent of
//! any ECS, engine, or host. Functions take plain data and return results,
//! making them unit-testable and portable.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`math`] | f64 vector math and ray–sphere occlusion |
//! | [`antenna`] | Antenna data and the directional link classifier |
//! | [`pathfinding`] | Generic A* over any hashable node type |
//! | [`signal`] | Propagation-delay arithmetic |
//! | [`command`] | Delayed command variants and the time-ordered buffer |
//! | [`flight`] | Attitude targeting and burn countdown arithmetic |

pub mod antenna;
pub mod command;
pub mod flight;
pub mod math;
pub mod pathfinding;
pub mod signal;
