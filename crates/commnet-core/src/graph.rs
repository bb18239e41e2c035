//! Incremental connectivity graph updater.
//!
//! A full adjacency recompute is O(n²); instead each tick recomputes the
//! rows of a bounded batch of nodes, so every row is refreshed exactly
//! once per `refresh_ticks`-tick window. The window partitions the live
//! node list by count, not by fixed index, so removals mid-window never
//! starve the remaining nodes.
//!
//! Stored edges are symmetric: a row entry exists only when both
//! directional classifications qualify, and the mirror entry is kept in
//! sync on every row replace.

use crate::events::{ObserverSet, SubscriptionId};
use commnet_logic::antenna::{classify_link, combine, Body, LinkEnd, LinkKind, NodeId};
use log::debug;
use std::collections::BTreeMap;

/// Notification payload for a stored-edge change. `kind == None` means
/// the edge was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub a: NodeId,
    pub b: NodeId,
    pub kind: LinkKind,
}

/// Tunables for the updater.
#[derive(Debug, Clone, Copy)]
pub struct GraphConfig {
    /// Window length in ticks over which the full graph is refreshed.
    /// Larger values cost less per tick and tolerate more staleness.
    pub refresh_ticks: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { refresh_ticks: 50 }
    }
}

/// The adjacency table and its rotating refresh state.
pub struct GraphUpdater {
    refresh_ticks: u32,
    /// Position within the current window, `0..refresh_ticks`.
    tick: u32,
    /// Next row index in the id-sorted node list.
    cursor: usize,
    adjacency: BTreeMap<NodeId, BTreeMap<NodeId, LinkKind>>,
    observers: ObserverSet<EdgeEvent>,
}

impl GraphUpdater {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            refresh_ticks: config.refresh_ticks.max(1),
            tick: 0,
            cursor: 0,
            adjacency: BTreeMap::new(),
            observers: ObserverSet::new(),
        }
    }

    /// One tick's worth of recompute. `ends` is the live node snapshot
    /// in stable id order. Returns the ids whose rows were refreshed.
    pub fn step(&mut self, ends: &[LinkEnd], bodies: &[Body]) -> Vec<NodeId> {
        let n = ends.len();
        if n == 0 {
            self.advance_window(0);
            return Vec::new();
        }
        // Remainder-aware partition: tick t covers [t*n/w, (t+1)*n/w),
        // which visits every index exactly once per window.
        let window = self.refresh_ticks as usize;
        let end = (((self.tick as usize + 1) * n) / window).min(n);
        let start = self.cursor.min(end);
        let mut updated = Vec::with_capacity(end - start);
        for idx in start..end {
            self.recompute_row(idx, ends, bodies);
            updated.push(ends[idx].id);
        }
        self.advance_window(end);
        updated
    }

    fn advance_window(&mut self, cursor: usize) {
        self.cursor = cursor;
        self.tick += 1;
        if self.tick >= self.refresh_ticks {
            self.tick = 0;
            self.cursor = 0;
        }
    }

    /// Recompute one node's full row and mirror the changes, emitting an
    /// event per changed edge (removals before the overwrite).
    fn recompute_row(&mut self, idx: usize, ends: &[LinkEnd], bodies: &[Body]) {
        let a = &ends[idx];
        let mut row = BTreeMap::new();
        for b in ends {
            if b.id == a.id {
                continue;
            }
            let kind = combine(classify_link(a, b, bodies), classify_link(b, a, bodies));
            if kind.connects() {
                row.insert(b.id, kind);
            }
        }

        let old = self.adjacency.get(&a.id).cloned().unwrap_or_default();
        // Edges that no longer qualify go out first.
        for (&b_id, _) in &old {
            if row.contains_key(&b_id) {
                continue;
            }
            if let Some(mirror) = self.adjacency.get_mut(&b_id) {
                mirror.remove(&a.id);
            }
            debug!("edge {:?} <-> {:?} removed", a.id, b_id);
            self.observers.emit(&EdgeEvent {
                a: a.id,
                b: b_id,
                kind: LinkKind::None,
            });
        }
        for (&b_id, &kind) in &row {
            if old.get(&b_id) == Some(&kind) {
                continue;
            }
            self.adjacency.entry(b_id).or_default().insert(a.id, kind);
            self.observers.emit(&EdgeEvent {
                a: a.id,
                b: b_id,
                kind,
            });
        }
        self.adjacency.insert(a.id, row);
    }

    /// Drop all state for a removed node, synchronously. Former
    /// neighbours get an edge-removed notification.
    pub fn remove_node(&mut self, id: NodeId) {
        let Some(row) = self.adjacency.remove(&id) else {
            return;
        };
        for (&b_id, _) in &row {
            if let Some(mirror) = self.adjacency.get_mut(&b_id) {
                mirror.remove(&id);
            }
            self.observers.emit(&EdgeEvent {
                a: id,
                b: b_id,
                kind: LinkKind::None,
            });
        }
    }

    /// Stored neighbours of a node.
    pub fn neighbours(&self, id: NodeId) -> Vec<NodeId> {
        self.adjacency
            .get(&id)
            .map(|row| row.keys().copied().collect())
            .unwrap_or_default()
    }

    /// The stored (bidirectionally-qualified) edge kind, `None` when no
    /// edge is stored.
    pub fn edge(&self, a: NodeId, b: NodeId) -> LinkKind {
        self.adjacency
            .get(&a)
            .and_then(|row| row.get(&b).copied())
            .unwrap_or(LinkKind::None)
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|row| row.len()).sum::<usize>() / 2
    }

    pub fn on_edge_updated(&mut self, observer: impl FnMut(&EdgeEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}
