//! Component definitions for registered nodes.
//!
//! Components are pure data structs attached to registry entities.
//! They have no behavior - that lives in the graph updater and the
//! flight computers.

mod node;

pub use node::*;
