//! Seeded constellation generation for tests and the headless harness.
//!
//! Produces node specs plus starting positions; callers install them
//! into an engine and a kinematics table. Same seed, same constellation.

use crate::registry::NodeSpec;
use commnet_logic::antenna::NodeId;
use commnet_logic::math::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Parameters for a generated constellation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConstellationConfig {
    pub satellites: u32,
    /// Shell the satellites are scattered over, in meters from the
    /// ground station at the origin.
    pub orbit_radius_min: f64,
    pub orbit_radius_max: f64,
    /// Omni range fitted to every satellite.
    pub omni_range: f64,
    pub seed: u64,
}

impl Default for ConstellationConfig {
    fn default() -> Self {
        Self {
            satellites: 12,
            orbit_radius_min: 100_000.0,
            orbit_radius_max: 150_000.0,
            omni_range: 120_000.0,
            seed: 7,
        }
    }
}

/// A generated node: what to register and where it starts.
#[derive(Debug, Clone)]
pub struct GeneratedNode {
    pub spec: NodeSpec,
    pub position: Vec3,
}

/// Ground station at the origin plus `satellites` nodes scattered
/// uniformly over the configured shell. Ids are sequential, ground
/// first.
pub fn generate_constellation(config: &ConstellationConfig) -> Vec<GeneratedNode> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut nodes = Vec::with_capacity(config.satellites as usize + 1);
    nodes.push(GeneratedNode {
        spec: NodeSpec::ground(NodeId(0), "mission control"),
        position: Vec3::ZERO,
    });
    for i in 0..config.satellites {
        let radius = rng.gen_range(config.orbit_radius_min..=config.orbit_radius_max);
        // Uniform direction on the sphere.
        let z: f64 = rng.gen_range(-1.0..=1.0);
        let theta: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
        let ring = (1.0 - z * z).sqrt();
        let position = Vec3::new(
            radius * ring * theta.cos(),
            radius * ring * theta.sin(),
            radius * z,
        );
        let id = NodeId(i + 1);
        nodes.push(GeneratedNode {
            spec: NodeSpec::satellite(id, &format!("sat-{:02}", i + 1), config.omni_range),
            position,
        });
    }
    nodes
}
