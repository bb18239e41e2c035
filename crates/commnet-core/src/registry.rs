//! Live node registry backed by a hecs world.
//!
//! The registry exclusively owns node identities. Registration is
//! idempotent per id; notifications fire synchronously on the same call
//! stack so dependents can purge state before the mutation returns.

use crate::components::{Antennas, BodyRef, GroundStation, NodeInfo};
use crate::events::{NodeEvent, ObserverSet, SubscriptionId};
use commnet_logic::antenna::{BodyId, DishAntenna, NodeId};
use hecs::{Entity, World};
use std::collections::BTreeMap;

/// Everything needed to register a node.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub id: NodeId,
    pub name: String,
    pub omni_range: f64,
    pub dishes: Vec<DishAntenna>,
    pub orbits: Option<BodyId>,
    pub ground_station: bool,
}

impl NodeSpec {
    /// A plain satellite with an omni antenna.
    pub fn satellite(id: NodeId, name: &str, omni_range: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            omni_range,
            dishes: Vec::new(),
            orbits: None,
            ground_station: false,
        }
    }

    /// The fixed ground node: effectively unlimited omni range, no
    /// dishes.
    pub fn ground(id: NodeId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            omni_range: f64::INFINITY,
            dishes: Vec::new(),
            orbits: None,
            ground_station: true,
        }
    }
}

/// Cloned antenna snapshot for the graph updater.
#[derive(Debug, Clone)]
pub struct LinkProfile {
    pub omni_range: f64,
    pub dishes: Vec<DishAntenna>,
    pub orbits: Option<BodyId>,
}

/// The live set of addressable nodes.
pub struct NodeRegistry {
    world: World,
    by_id: BTreeMap<NodeId, Entity>,
    observers: ObserverSet<NodeEvent>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            by_id: BTreeMap::new(),
            observers: ObserverSet::new(),
        }
    }

    /// Register a node. Re-registering a live id is a no-op that returns
    /// the existing handle and fires no notification.
    pub fn register(&mut self, spec: NodeSpec) -> Entity {
        if let Some(&entity) = self.by_id.get(&spec.id) {
            return entity;
        }
        let id = spec.id;
        let info = NodeInfo {
            id,
            name: spec.name,
        };
        let antennas = Antennas {
            omni_range: spec.omni_range,
            dishes: spec.dishes,
        };
        let entity = if spec.ground_station {
            self.world
                .spawn((info, antennas, BodyRef(spec.orbits), GroundStation))
        } else {
            self.world.spawn((info, antennas, BodyRef(spec.orbits)))
        };
        self.by_id.insert(id, entity);
        self.observers.emit(&NodeEvent::Registered(id));
        entity
    }

    /// Unregister by handle. Unknown handles are a no-op. Fires
    /// `Unregistered` synchronously before returning.
    pub fn unregister(&mut self, entity: Entity) -> bool {
        let Some(id) = self.node_id(entity) else {
            return false;
        };
        self.unregister_id(id)
    }

    /// Unregister by id. Unknown ids are a no-op.
    pub fn unregister_id(&mut self, id: NodeId) -> bool {
        let Some(entity) = self.by_id.remove(&id) else {
            return false;
        };
        let _ = self.world.despawn(entity);
        self.observers.emit(&NodeEvent::Unregistered(id));
        true
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn entity(&self, id: NodeId) -> Option<Entity> {
        self.by_id.get(&id).copied()
    }

    pub fn node_id(&self, entity: Entity) -> Option<NodeId> {
        self.world.get::<&NodeInfo>(entity).ok().map(|info| info.id)
    }

    pub fn name(&self, id: NodeId) -> Option<String> {
        let entity = self.entity(id)?;
        self.world
            .get::<&NodeInfo>(entity)
            .ok()
            .map(|info| info.name.clone())
    }

    /// Live node ids in stable ascending order, for deterministic window
    /// sweeps.
    pub fn ids(&self) -> Vec<NodeId> {
        self.by_id.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Antenna snapshot for one node.
    pub fn link_profile(&self, id: NodeId) -> Option<LinkProfile> {
        let entity = self.entity(id)?;
        let antennas = self.world.get::<&Antennas>(entity).ok()?;
        let orbits = self
            .world
            .get::<&BodyRef>(entity)
            .ok()
            .and_then(|body_ref| body_ref.0);
        Some(LinkProfile {
            omni_range: antennas.omni_range,
            dishes: antennas.dishes.clone(),
            orbits,
        })
    }

    /// The route goal: the ground node with the lowest id.
    pub fn ground_station(&self) -> Option<NodeId> {
        self.world
            .query::<&NodeInfo>()
            .with::<&GroundStation>()
            .iter()
            .map(|(_, info)| info.id)
            .min()
    }

    pub fn on_node_event(&mut self, observer: impl FnMut(&NodeEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
