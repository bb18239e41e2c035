//! Antenna data and the directional link classifier.
//!
//! `classify_link` is a pure function: it answers "can `a` hear `b`?"
//! from positions and antenna fit alone, with no stored state. The
//! classification is directional — the graph layer ANDs both directions
//! before storing an edge.

use crate::math::{segment_hits_sphere, Vec3};
use serde::{Deserialize, Serialize};

/// Stable identity of a node in the communication graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Stable identity of a celestial body (occluder / dish target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// What a directional dish is pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DishTarget {
    /// A specific node; range is the only constraint.
    Node(NodeId),
    /// A body; any node orbiting it qualifies if inside the cone.
    Body(BodyId),
}

/// A directional antenna: range- and cone-limited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DishAntenna {
    pub target: DishTarget,
    /// Maximum link distance in meters.
    pub range: f64,
    /// Cosine of the cone half-angle. 1.0 is a pencil beam, -1.0 covers
    /// the whole sky. Only consulted for body targets.
    pub cos_half_angle: f64,
}

/// An opaque occluding body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: BodyId,
    pub position: Vec3,
    pub radius: f64,
}

/// Everything the classifier needs to know about one end of a candidate
/// link. Plain owned data so callers can snapshot it per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEnd {
    pub id: NodeId,
    pub position: Vec3,
    pub omni_range: f64,
    pub dishes: Vec<DishAntenna>,
    /// Body of reference, matched against body-targeted dishes.
    pub orbits: Option<BodyId>,
}

/// Kind of link between two nodes. `None` edges are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    None,
    Omni,
    Dish,
}

impl LinkKind {
    pub fn connects(&self) -> bool {
        !matches!(self, LinkKind::None)
    }
}

/// Directional classification: can `a` reach `b`?
///
/// 1. A node never links to itself.
/// 2. Within `a`'s omni range the link is `Omni`.
/// 3. Otherwise a dish of `a` must cover `b`: node-targeted dishes need
///    only range, body-targeted dishes need range plus `b` orbiting the
///    target body inside the cone.
/// 4. Any candidate dies if an opaque body blocks the line of sight.
pub fn classify_link(a: &LinkEnd, b: &LinkEnd, bodies: &[Body]) -> LinkKind {
    if a.id == b.id {
        return LinkKind::None;
    }
    let d = a.position.distance(&b.position);
    let candidate = if d <= a.omni_range {
        LinkKind::Omni
    } else {
        dish_candidate(a, b, d, bodies)
    };
    if candidate.connects() && occluded(a.position, b.position, bodies) {
        return LinkKind::None;
    }
    candidate
}

fn dish_candidate(a: &LinkEnd, b: &LinkEnd, d: f64, bodies: &[Body]) -> LinkKind {
    for dish in &a.dishes {
        if dish.range < d {
            continue;
        }
        match dish.target {
            DishTarget::Node(id) => {
                if id == b.id {
                    return LinkKind::Dish;
                }
            }
            DishTarget::Body(body_id) => {
                if b.orbits != Some(body_id) {
                    continue;
                }
                let Some(body) = bodies.iter().find(|bd| bd.id == body_id) else {
                    continue;
                };
                let to_body = (body.position - a.position).normalize();
                let to_b = (b.position - a.position).normalize();
                if to_body.dot(&to_b) >= dish.cos_half_angle {
                    return LinkKind::Dish;
                }
            }
        }
    }
    LinkKind::None
}

/// Combine the two directional classifications into the stored edge
/// kind: both directions must qualify, and the edge is `Omni` only when
/// both are.
pub fn combine(ab: LinkKind, ba: LinkKind) -> LinkKind {
    match (ab, ba) {
        (LinkKind::None, _) | (_, LinkKind::None) => LinkKind::None,
        (LinkKind::Omni, LinkKind::Omni) => LinkKind::Omni,
        _ => LinkKind::Dish,
    }
}

fn occluded(a: Vec3, b: Vec3, bodies: &[Body]) -> bool {
    bodies
        .iter()
        .any(|body| segment_hits_sphere(a, b, body.position, body.radius))
}
