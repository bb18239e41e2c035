//! CommEngine - main entry point for running the relay network simulation.
//!
//! Owns the registry, graph updater, path cache and flight computers,
//! and drives them from one `tick(dt)` call per physics step. External
//! collaborators (kinematics, control authorization, host events) are
//! injected as trait objects at construction; nothing in the crate is
//! reachable through a global.

use crate::connection::{ConnectionEvent, PathCache, Route};
use crate::events::{NodeEvent, SubscriptionId};
use crate::graph::{EdgeEvent, GraphConfig, GraphUpdater};
use crate::registry::{NodeRegistry, NodeSpec};
use crate::scheduler::{CommandSnapshot, ControlOutput, FlightComputer, ManualInput};
use commnet_logic::antenna::{Body, LinkEnd, NodeId};
use commnet_logic::command::{Command, QueuedCommand};
use commnet_logic::flight::Kinematics;
use commnet_logic::math::Vec3;
use commnet_logic::pathfinding::astar;
use commnet_logic::signal::SIGNAL_SPEED_M_S;
use hecs::Entity;
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Per-node kinematics, supplied by the host on demand. Nothing is
/// cached inside the core.
pub trait KinematicsProvider {
    /// Live sample for a node; `None` when the host no longer tracks it.
    fn kinematics(&self, id: NodeId) -> Option<Kinematics>;
    /// Current occluding bodies, positions refreshed per call.
    fn bodies(&self) -> Vec<Body>;
}

/// Whether un-delayed local control is available for a node this tick
/// (crewed presence, direct line-of-sight override).
pub trait ControlAuthority {
    fn has_local_control(&self, id: NodeId) -> bool;
}

/// Executes opaque host event handles popped from command buffers.
pub trait EventResolver {
    /// False when the handle no longer resolves (target destroyed); the
    /// command is then dropped.
    fn resolve(&mut self, node: NodeId, handle: u64) -> bool;
}

/// Fixed-table kinematics for tests and headless runs. Clones share the
/// same table, so a host can keep one handle and mutate positions while
/// the engine reads through its own.
#[derive(Clone, Default)]
pub struct TableKinematics {
    inner: Rc<RefCell<TableInner>>,
}

#[derive(Default)]
struct TableInner {
    nodes: HashMap<NodeId, Kinematics>,
    bodies: Vec<Body>,
}

impl TableKinematics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a node, keeping zero velocity and default facing.
    pub fn set_position(&self, id: NodeId, position: Vec3) {
        let mut inner = self.inner.borrow_mut();
        let entry = inner.nodes.entry(id).or_insert(Kinematics {
            position,
            velocity: Vec3::ZERO,
            orientation: Vec3::new(1.0, 0.0, 0.0),
            body_position: Vec3::ZERO,
        });
        entry.position = position;
    }

    pub fn set_kinematics(&self, id: NodeId, kin: Kinematics) {
        self.inner.borrow_mut().nodes.insert(id, kin);
    }

    pub fn remove(&self, id: NodeId) {
        self.inner.borrow_mut().nodes.remove(&id);
    }

    pub fn set_bodies(&self, bodies: Vec<Body>) {
        self.inner.borrow_mut().bodies = bodies;
    }
}

impl KinematicsProvider for TableKinematics {
    fn kinematics(&self, id: NodeId) -> Option<Kinematics> {
        self.inner.borrow().nodes.get(&id).copied()
    }

    fn bodies(&self) -> Vec<Body> {
        self.inner.borrow().bodies.clone()
    }
}

/// No node ever has local control: every command rides the link.
pub struct NoLocalControl;

impl ControlAuthority for NoLocalControl {
    fn has_local_control(&self, _id: NodeId) -> bool {
        false
    }
}

/// Every node is directly controlled (zero delay).
pub struct AlwaysLocalControl;

impl ControlAuthority for AlwaysLocalControl {
    fn has_local_control(&self, _id: NodeId) -> bool {
        true
    }
}

/// Accepts every opaque event handle.
pub struct AcceptAllEvents;

impl EventResolver for AcceptAllEvents {
    fn resolve(&mut self, _node: NodeId, _handle: u64) -> bool {
        true
    }
}

/// Engine tunables.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Ticks per full graph refresh window.
    pub refresh_ticks: u32,
    /// Propagation speed used to derive command delay (m/s).
    pub signal_speed: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_ticks: 50,
            signal_speed: SIGNAL_SPEED_M_S,
        }
    }
}

/// The relay network simulation core.
pub struct CommEngine {
    config: EngineConfig,
    registry: NodeRegistry,
    graph: GraphUpdater,
    cache: PathCache,
    computers: BTreeMap<NodeId, FlightComputer>,
    outputs: BTreeMap<NodeId, ControlOutput>,
    kinematics: Box<dyn KinematicsProvider>,
    authority: Box<dyn ControlAuthority>,
    resolver: Box<dyn EventResolver>,
    /// The node currently being controlled; the pathfinder runs for it
    /// whenever its row is refreshed.
    focus: Option<NodeId>,
    sim_time: f64,
}

impl CommEngine {
    pub fn new(
        config: EngineConfig,
        kinematics: Box<dyn KinematicsProvider>,
        authority: Box<dyn ControlAuthority>,
        resolver: Box<dyn EventResolver>,
    ) -> Self {
        Self {
            config,
            registry: NodeRegistry::new(),
            graph: GraphUpdater::new(GraphConfig {
                refresh_ticks: config.refresh_ticks,
            }),
            cache: PathCache::new(config.signal_speed),
            computers: BTreeMap::new(),
            outputs: BTreeMap::new(),
            kinematics,
            authority,
            resolver,
            focus: None,
            sim_time: 0.0,
        }
    }

    // ── Registration ────────────────────────────────────────────────

    /// Register a node. Idempotent per id.
    pub fn register_node(&mut self, spec: NodeSpec) -> Entity {
        let id = spec.id;
        let entity = self.registry.register(spec);
        self.computers.entry(id).or_default();
        entity
    }

    /// Unregister a node, dropping its graph rows, cached route, and
    /// flight computer before the notification returns. Unknown ids are
    /// a no-op.
    pub fn unregister_node(&mut self, id: NodeId) {
        if !self.registry.contains(id) {
            return;
        }
        self.graph.remove_node(id);
        self.cache.remove(id);
        self.computers.remove(&id);
        self.outputs.remove(&id);
        if self.focus == Some(id) {
            self.focus = None;
        }
        self.registry.unregister_id(id);
    }

    /// Designate the actively controlled node and refresh its route
    /// immediately. `None` clears the focus.
    pub fn set_focus(&mut self, focus: Option<NodeId>) {
        self.focus = focus;
        if let Some(id) = focus {
            self.recompute_route(id);
        }
    }

    pub fn focus(&self) -> Option<NodeId> {
        self.focus
    }

    // ── Tick driver ─────────────────────────────────────────────────

    /// One physics step: advance time, refresh a batch of adjacency
    /// rows, re-path the focus node if its row was touched, then run
    /// every flight computer.
    pub fn tick(&mut self, dt: f64) {
        self.sim_time += dt;
        let bodies = self.kinematics.bodies();
        let ends = self.link_snapshot();
        let updated = self.graph.step(&ends, &bodies);
        if let Some(focus) = self.focus {
            if updated.contains(&focus) {
                self.recompute_route(focus);
            }
        }

        let now = self.sim_time;
        let Self {
            computers,
            outputs,
            kinematics,
            authority,
            resolver,
            cache,
            ..
        } = self;
        for (&id, computer) in computers.iter_mut() {
            let kin = kinematics.kinematics(id);
            let authorized = cache.exists(id) || authority.has_local_control(id);
            let out = computer.tick(now, dt, kin.as_ref(), authorized, &mut |handle| {
                resolver.resolve(id, handle)
            });
            outputs.insert(id, out);
        }
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Live nodes with a kinematic sample, in stable id order. Nodes the
    /// host no longer tracks drop out and degrade to "not connected".
    fn link_snapshot(&self) -> Vec<LinkEnd> {
        self.registry
            .ids()
            .into_iter()
            .filter_map(|id| {
                let profile = self.registry.link_profile(id)?;
                let kin = self.kinematics.kinematics(id)?;
                Some(LinkEnd {
                    id,
                    position: kin.position,
                    omni_range: profile.omni_range,
                    dishes: profile.dishes,
                    orbits: profile.orbits,
                })
            })
            .collect()
    }

    // ── Connection queries ──────────────────────────────────────────

    /// Run the pathfinder for `origin` now and publish the result.
    pub fn refresh_connection(&mut self, origin: NodeId) {
        self.recompute_route(origin);
    }

    fn recompute_route(&mut self, origin: NodeId) {
        let route = self.solve_route(origin);
        debug!(
            "route for {:?}: {}",
            origin,
            route
                .as_ref()
                .map(|r| format!("{} hops, {:.0} m", r.hop_count(), r.cost))
                .unwrap_or_else(|| "none".to_string())
        );
        self.cache.store(origin, route);
    }

    fn solve_route(&self, origin: NodeId) -> Option<Route> {
        if !self.registry.contains(origin) {
            return None;
        }
        let goal = self.registry.ground_station()?;
        // Snapshot positions once; a node deleted since its row was
        // computed simply has no entry and is skipped.
        let mut positions: BTreeMap<NodeId, Vec3> = BTreeMap::new();
        for id in self.registry.ids() {
            if let Some(kin) = self.kinematics.kinematics(id) {
                positions.insert(id, kin.position);
            }
        }
        if !positions.contains_key(&origin) || !positions.contains_key(&goal) {
            return None;
        }
        if origin == goal {
            return Some(Route {
                hops: vec![origin],
                cost: 0.0,
            });
        }
        let graph = &self.graph;
        let (hops, cost) = astar(
            origin,
            goal,
            |n| {
                graph
                    .neighbours(*n)
                    .into_iter()
                    .filter(|id| positions.contains_key(id))
                    .collect()
            },
            |a, b| positions[a].distance(&positions[b]),
            |n, goal| positions[n].distance(&positions[goal]),
        )?;
        Some(Route { hops, cost })
    }

    /// Last known route to the ground station, `None` when unconnected.
    pub fn connection_for(&self, id: NodeId) -> Option<&Route> {
        self.cache.route(id)
    }

    /// One-way signal delay in seconds, `None` when unconnected.
    pub fn signal_delay(&self, id: NodeId) -> Option<f64> {
        self.cache.delay(id)
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Queue a command for a node, stamped with the current connection
    /// delay (zero under local control) plus `extra_delay` of manual
    /// hold. Dropped (returning false) for unregistered nodes and for
    /// nodes with neither a link nor local control.
    pub fn enqueue_command(&mut self, id: NodeId, command: Command, extra_delay: f64) -> bool {
        if !self.registry.contains(id) {
            warn!("command for unregistered node {:?} ignored", id);
            return false;
        }
        let delay = if self.authority.has_local_control(id) {
            0.0
        } else if let Some(delay) = self.cache.delay(id) {
            delay
        } else {
            warn!(
                "command for {:?} dropped: no connection and no local control",
                id
            );
            return false;
        };
        let Some(computer) = self.computers.get_mut(&id) else {
            return false;
        };
        computer.enqueue(command, self.sim_time + delay, extra_delay);
        true
    }

    /// Raw pilot input relayed to a node; neutralized each tick the node
    /// has neither a link nor local control.
    pub fn set_manual_input(&mut self, id: NodeId, input: ManualInput) {
        if let Some(computer) = self.computers.get_mut(&id) {
            computer.set_manual_input(input);
        }
    }

    /// Read-only snapshot of a node's queued and active commands.
    pub fn active_commands(&self, id: NodeId) -> Option<CommandSnapshot> {
        self.computers.get(&id).map(FlightComputer::snapshot)
    }

    /// Control output produced by the last tick.
    pub fn control_output(&self, id: NodeId) -> Option<&ControlOutput> {
        self.outputs.get(&id)
    }

    // ── Notifications ───────────────────────────────────────────────

    pub fn on_node_event(&mut self, observer: impl FnMut(&NodeEvent) + 'static) -> SubscriptionId {
        self.registry.on_node_event(observer)
    }

    pub fn unsubscribe_node_event(&mut self, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(id)
    }

    pub fn on_edge_updated(&mut self, observer: impl FnMut(&EdgeEvent) + 'static) -> SubscriptionId {
        self.graph.on_edge_updated(observer)
    }

    pub fn unsubscribe_edge_updated(&mut self, id: SubscriptionId) -> bool {
        self.graph.unsubscribe(id)
    }

    pub fn on_connection_updated(
        &mut self,
        observer: impl FnMut(&ConnectionEvent) + 'static,
    ) -> SubscriptionId {
        self.cache.on_connection_updated(observer)
    }

    pub fn unsubscribe_connection_updated(&mut self, id: SubscriptionId) -> bool {
        self.cache.unsubscribe(id)
    }

    // ── Introspection ───────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &GraphUpdater {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.registry.len()
    }

    // ── Persistence hooks ───────────────────────────────────────────

    /// Queued (not yet due) commands per node, for snapshotting.
    pub(crate) fn command_buffers(&self) -> Vec<(NodeId, Vec<QueuedCommand>)> {
        self.computers
            .iter()
            .map(|(&id, computer)| (id, computer.snapshot().queued))
            .collect()
    }

    /// Re-insert a restored command with an already-computed timestamp,
    /// bypassing delay stamping.
    pub(crate) fn restore_command(
        &mut self,
        id: NodeId,
        command: Command,
        effective_at: f64,
        extra_delay: f64,
    ) {
        if let Some(computer) = self.computers.get_mut(&id) {
            computer.enqueue(command, effective_at, extra_delay);
        }
    }
}
