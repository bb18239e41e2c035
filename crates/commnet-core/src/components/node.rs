//! Node components.

use commnet_logic::antenna::{BodyId, DishAntenna, NodeId};
use serde::{Deserialize, Serialize};

/// Core identity of a registered node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Stable host-supplied id.
    pub id: NodeId,
    pub name: String,
}

/// Radio fit of a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Antennas {
    /// Omnidirectional reach in meters. Zero means no omni antenna.
    pub omni_range: f64,
    pub dishes: Vec<DishAntenna>,
}

/// The body this node orbits or sits on, used for dish body-target
/// matching.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BodyRef(pub Option<BodyId>);

/// Marker for the fixed ground node. Exactly one is expected; with
/// several, the lowest id wins as the route goal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GroundStation;
