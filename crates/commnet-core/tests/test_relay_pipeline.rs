//! Integration tests for the full relay pipeline.
//!
//! Exercises: registration → incremental edge recompute → pathfinding →
//! delay stamping → command execution, through the public engine API
//! only. No host, no rendering.

use commnet_core::generation::{generate_constellation, ConstellationConfig};
use commnet_core::persistence::{load_commands, save_commands};
use commnet_core::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

// ── Helpers ────────────────────────────────────────────────────────────

fn engine_with(
    refresh_ticks: u32,
    signal_speed: f64,
    authority: Box<dyn ControlAuthority>,
) -> (CommEngine, TableKinematics) {
    let table = TableKinematics::new();
    let engine = CommEngine::new(
        EngineConfig {
            refresh_ticks,
            signal_speed,
        },
        Box::new(table.clone()),
        authority,
        Box::new(AcceptAllEvents),
    );
    (engine, table)
}

fn install_constellation(
    engine: &mut CommEngine,
    table: &TableKinematics,
    config: &ConstellationConfig,
) {
    for node in generate_constellation(config) {
        table.set_position(node.spec.id, node.position);
        engine.register_node(node.spec);
    }
}

// ── Connectivity ───────────────────────────────────────────────────────

#[test]
fn dense_constellation_routes_every_satellite() {
    // Omni range exceeds the shell radius, so every satellite reaches
    // the ground station directly once its row has been refreshed.
    let config = ConstellationConfig {
        satellites: 8,
        omni_range: 200_000.0,
        ..ConstellationConfig::default()
    };
    let (mut engine, table) = engine_with(4, 299_792_458.0, Box::new(NoLocalControl));
    install_constellation(&mut engine, &table, &config);

    for sat in 1..=config.satellites {
        let id = NodeId(sat);
        engine.set_focus(Some(id));
        // One full refresh window guarantees the focus row was rebuilt.
        for _ in 0..4 {
            engine.tick(0.02);
        }
        let route = engine.connection_for(id).expect("satellite should connect");
        assert_eq!(route.hops.first(), Some(&id));
        assert_eq!(route.hops.last(), Some(&NodeId(0)));
        assert!(engine.signal_delay(id).unwrap() > 0.0);
    }
}

#[test]
fn sparse_constellation_never_routes() {
    // Satellite omni range far below the shell radius: the ground hop
    // can never qualify in the satellite direction.
    let config = ConstellationConfig {
        satellites: 6,
        omni_range: 1_000.0,
        ..ConstellationConfig::default()
    };
    let (mut engine, table) = engine_with(4, 299_792_458.0, Box::new(NoLocalControl));
    install_constellation(&mut engine, &table, &config);

    for sat in 1..=config.satellites {
        let id = NodeId(sat);
        engine.set_focus(Some(id));
        for _ in 0..4 {
            engine.tick(0.02);
        }
        assert!(engine.connection_for(id).is_none());
        assert_eq!(engine.signal_delay(id), None);
    }
}

#[test]
fn occluding_body_blocks_and_unblocks() {
    let (mut engine, table) = engine_with(1, 100.0, Box::new(NoLocalControl));
    engine.register_node(NodeSpec::ground(NodeId(0), "ground"));
    engine.register_node(NodeSpec::satellite(NodeId(1), "sat", 1_000.0));
    table.set_position(NodeId(0), Vec3::new(-200.0, 0.0, 0.0));
    table.set_position(NodeId(1), Vec3::new(200.0, 0.0, 0.0));
    table.set_bodies(vec![Body {
        id: BodyId(1),
        position: Vec3::ZERO,
        radius: 50.0,
    }]);

    engine.set_focus(Some(NodeId(1)));
    engine.tick(1.0);
    assert_eq!(engine.graph().edge(NodeId(0), NodeId(1)), LinkKind::None);
    assert!(engine.connection_for(NodeId(1)).is_none());

    // The body moves out of the line of sight.
    table.set_bodies(vec![Body {
        id: BodyId(1),
        position: Vec3::new(0.0, 5_000.0, 0.0),
        radius: 50.0,
    }]);
    engine.tick(1.0);
    assert_eq!(engine.graph().edge(NodeId(0), NodeId(1)), LinkKind::Omni);
    let route = engine.connection_for(NodeId(1)).expect("clear sky connects");
    assert!((route.cost - 400.0).abs() < 1e-9);
}

#[test]
fn dish_satellite_links_from_beyond_omni_range() {
    let (mut engine, table) = engine_with(1, 100.0, Box::new(NoLocalControl));
    engine.register_node(NodeSpec::ground(NodeId(0), "ground"));
    let mut deep_space = NodeSpec::satellite(NodeId(1), "probe", 10.0);
    deep_space.dishes.push(DishAntenna {
        target: DishTarget::Node(NodeId(0)),
        range: 2_000_000.0,
        cos_half_angle: 0.0,
    });
    engine.register_node(deep_space);
    table.set_position(NodeId(0), Vec3::ZERO);
    table.set_position(NodeId(1), Vec3::new(1_000_000.0, 0.0, 0.0));

    engine.set_focus(Some(NodeId(1)));
    engine.tick(1.0);
    assert_eq!(engine.graph().edge(NodeId(1), NodeId(0)), LinkKind::Dish);
    let route = engine.connection_for(NodeId(1)).expect("dish connects");
    assert_eq!(route.hop_count(), 1);
}

#[test]
fn connection_notifications_fire_each_recompute() {
    let (mut engine, table) = engine_with(1, 100.0, Box::new(NoLocalControl));
    engine.register_node(NodeSpec::ground(NodeId(0), "ground"));
    engine.register_node(NodeSpec::satellite(NodeId(1), "sat", 500.0));
    table.set_position(NodeId(0), Vec3::ZERO);
    table.set_position(NodeId(1), Vec3::new(100.0, 0.0, 0.0));

    let updates = Rc::new(RefCell::new(Vec::new()));
    {
        let updates = Rc::clone(&updates);
        engine.on_connection_updated(move |e| {
            updates.borrow_mut().push((e.origin, e.route.is_some()));
        });
    }
    engine.set_focus(Some(NodeId(1)));
    for _ in 0..3 {
        engine.tick(1.0);
    }
    // One recompute at focus change plus one per tick (refresh window
    // of 1 touches the focus row every tick).
    assert_eq!(updates.borrow().len(), 4);
    assert!(updates.borrow().iter().skip(1).all(|&(id, connected)| {
        id == NodeId(1) && connected
    }));
}

// ── Command flow under latency ─────────────────────────────────────────

#[test]
fn burn_command_arrives_after_signal_delay() {
    // 200 m at 100 m/s: two seconds of one-way latency.
    let (mut engine, table) = engine_with(1, 100.0, Box::new(NoLocalControl));
    engine.register_node(NodeSpec::ground(NodeId(0), "ground"));
    engine.register_node(NodeSpec::satellite(NodeId(1), "sat", 500.0));
    table.set_position(NodeId(0), Vec3::ZERO);
    table.set_position(NodeId(1), Vec3::new(200.0, 0.0, 0.0));

    engine.set_focus(Some(NodeId(1)));
    engine.tick(1.0);
    assert!(engine.enqueue_command(
        NodeId(1),
        Command::Burn {
            throttle: 1.0,
            until: BurnRemaining::Duration(3.0),
        },
        0.0,
    ));

    // Sent at t=1, arrives at t=3; burning through t=5.
    engine.tick(1.0); // t=2
    assert_eq!(engine.control_output(NodeId(1)).unwrap().throttle, 0.0);
    for expected_burning_tick in [3.0, 4.0, 5.0] {
        engine.tick(1.0);
        assert!(
            engine.control_output(NodeId(1)).unwrap().throttle > 0.0,
            "should burn at t={}",
            expected_burning_tick
        );
    }
    engine.tick(1.0); // t=6
    assert_eq!(engine.control_output(NodeId(1)).unwrap().throttle, 0.0);
    assert!(engine.active_commands(NodeId(1)).unwrap().burn.is_none());
}

#[test]
fn manual_hold_blocks_later_commands_without_reordering() {
    let (mut engine, table) = engine_with(1, 100.0, Box::new(AlwaysLocalControl));
    engine.register_node(NodeSpec::satellite(NodeId(1), "sat", 10.0));
    table.set_position(NodeId(1), Vec3::ZERO);

    // Both due immediately, but the first holds a 2s manual delay; the
    // second must wait behind it rather than overtake.
    engine.enqueue_command(NodeId(1), Command::ActionToggle { group: 7 }, 2.0);
    engine.enqueue_command(NodeId(1), Command::ActionToggle { group: 8 }, 0.0);

    engine.tick(1.0);
    assert!(engine.control_output(NodeId(1)).unwrap().toggled_groups.is_empty());
    engine.tick(1.0);
    assert!(engine.control_output(NodeId(1)).unwrap().toggled_groups.is_empty());
    // Hold consumed: both pop on the same tick, insertion order kept.
    engine.tick(1.0);
    assert_eq!(
        engine.control_output(NodeId(1)).unwrap().toggled_groups,
        vec![7, 8]
    );
}

// ── Persistence across sessions ────────────────────────────────────────

#[test]
fn pending_commands_survive_save_and_load() {
    let (mut engine, table) = engine_with(1, 100.0, Box::new(NoLocalControl));
    engine.register_node(NodeSpec::ground(NodeId(0), "ground"));
    engine.register_node(NodeSpec::satellite(NodeId(1), "sat", 500.0));
    table.set_position(NodeId(0), Vec3::ZERO);
    table.set_position(NodeId(1), Vec3::new(200.0, 0.0, 0.0));
    engine.set_focus(Some(NodeId(1)));
    engine.tick(1.0);

    engine.enqueue_command(NodeId(1), Command::ActionToggle { group: 2 }, 0.0);
    engine.enqueue_command(NodeId(1), Command::ActionToggle { group: 4 }, 2.0);
    let mut bytes = Vec::new();
    save_commands(&mut bytes, &engine).expect("save");

    // Rebuild the session from scratch and reload.
    let (mut loaded, table) = engine_with(1, 100.0, Box::new(NoLocalControl));
    loaded.register_node(NodeSpec::ground(NodeId(0), "ground"));
    loaded.register_node(NodeSpec::satellite(NodeId(1), "sat", 500.0));
    table.set_position(NodeId(0), Vec3::ZERO);
    table.set_position(NodeId(1), Vec3::new(200.0, 0.0, 0.0));
    load_commands(&bytes[..], &mut loaded).expect("load");

    let mut order = Vec::new();
    for _ in 0..10 {
        loaded.tick(1.0);
        order.extend(
            loaded
                .control_output(NodeId(1))
                .unwrap()
                .toggled_groups
                .iter()
                .copied(),
        );
    }
    assert_eq!(order, vec![2, 4]);
}
