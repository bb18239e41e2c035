//! Last-known-route cache and connection notifications.
//!
//! A read-mostly projection of the pathfinder's output: one `Route` per
//! tracked origin, replaced on every recompute. The "connection updated"
//! notification fires unconditionally each recompute, changed or not —
//! consumers that only want changes compare against their previous
//! value.

use crate::events::{ObserverSet, SubscriptionId};
use commnet_logic::antenna::NodeId;
use commnet_logic::signal::propagation_delay;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A relay route from an origin node to the ground station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Hop sequence, origin first, ground station last.
    pub hops: Vec<NodeId>,
    /// Accumulated Euclidean length in meters.
    pub cost: f64,
}

impl Route {
    pub fn hop_count(&self) -> usize {
        self.hops.len().saturating_sub(1)
    }

    /// One-way signal latency in seconds at the given propagation speed.
    pub fn delay(&self, signal_speed: f64) -> f64 {
        propagation_delay(self.cost, signal_speed)
    }
}

/// Fired after every route recompute for a tracked origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionEvent {
    pub origin: NodeId,
    /// `None` is the canonical "no connection".
    pub route: Option<Route>,
}

/// Most recent route per tracked origin.
pub struct PathCache {
    routes: BTreeMap<NodeId, Option<Route>>,
    signal_speed: f64,
    observers: ObserverSet<ConnectionEvent>,
}

impl PathCache {
    pub fn new(signal_speed: f64) -> Self {
        Self {
            routes: BTreeMap::new(),
            signal_speed,
            observers: ObserverSet::new(),
        }
    }

    /// Replace the cached route for `origin` and notify observers.
    pub fn store(&mut self, origin: NodeId, route: Option<Route>) {
        self.routes.insert(origin, route.clone());
        self.observers.emit(&ConnectionEvent { origin, route });
    }

    /// The last known route, `None` when unconnected or never computed.
    pub fn route(&self, origin: NodeId) -> Option<&Route> {
        self.routes.get(&origin).and_then(|r| r.as_ref())
    }

    pub fn exists(&self, origin: NodeId) -> bool {
        self.route(origin).is_some()
    }

    /// Route cost in meters, `None` when unconnected.
    pub fn cost(&self, origin: NodeId) -> Option<f64> {
        self.route(origin).map(|r| r.cost)
    }

    /// One-way signal delay in seconds, `None` (undefined) when
    /// unconnected.
    pub fn delay(&self, origin: NodeId) -> Option<f64> {
        self.route(origin).map(|r| r.delay(self.signal_speed))
    }

    /// Drop all state for a removed node.
    pub fn remove(&mut self, origin: NodeId) {
        self.routes.remove(&origin);
    }

    pub fn on_connection_updated(
        &mut self,
        observer: impl FnMut(&ConnectionEvent) + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}
