//! CommNet Headless Simulation Harness
//!
//! Validates the relay engine end to end without a host game attached.
//! Runs entirely in-process — no networking, no rendering.
//!
//! Usage:
//!   cargo run -p commnet-simtest
//!   cargo run -p commnet-simtest -- --verbose

use commnet_core::generation::{generate_constellation, ConstellationConfig};
use commnet_core::graph::{GraphConfig, GraphUpdater};
use commnet_core::persistence::{load_commands, save_commands};
use commnet_core::prelude::*;
use commnet_logic::antenna::{classify_link, LinkEnd};
use commnet_logic::command::CommandBuffer;
use commnet_logic::pathfinding::astar;
use serde::Deserialize;

// ── Scenario data (JSON shared with any host tooling) ───────────────────
const SCENARIOS_JSON: &str = include_str!("../../../data/constellation_scenarios.json");

#[derive(Debug, Deserialize)]
struct Scenario {
    name: String,
    config: ConstellationConfig,
    expect_connected: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: String) -> TestResult {
    TestResult {
        name: name.to_string(),
        passed,
        detail,
    }
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== CommNet Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Link classifier sweep
    results.extend(validate_link_classification());

    // 2. Shortest-path search on a synthetic graph
    results.extend(validate_pathfinding());

    // 3. Relay route + signal delay through the engine
    results.extend(validate_relay_engine());

    // 4. Incremental updater window behavior
    results.extend(validate_edge_window());

    // 5. Command buffer ordering and latency stamping
    results.extend(validate_command_flow());

    // 6. JSON constellation scenarios
    results.extend(validate_scenarios(verbose));

    // 7. Command persistence round-trip
    results.extend(validate_persistence());

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Link classification ──────────────────────────────────────────────

fn end_at(id: u32, x: f64, range: f64) -> LinkEnd {
    LinkEnd {
        id: NodeId(id),
        position: Vec3::new(x, 0.0, 0.0),
        omni_range: range,
        dishes: vec![],
        orbits: None,
    }
}

fn validate_link_classification() -> Vec<TestResult> {
    let mut results = Vec::new();

    let a = end_at(1, 0.0, 100.0);
    let b = end_at(2, 50.0, 100.0);
    results.push(check(
        "omni within range",
        classify_link(&a, &b, &[]) == LinkKind::Omni,
        format!("50 m apart, 100 m range → {:?}", classify_link(&a, &b, &[])),
    ));

    let far = end_at(2, 150.0, 100.0);
    results.push(check(
        "omni out of range",
        classify_link(&a, &far, &[]) == LinkKind::None,
        "150 m apart, 100 m range".to_string(),
    ));

    let reach = end_at(1, 0.0, 500.0);
    let weak = end_at(2, 300.0, 100.0);
    let one_way = classify_link(&reach, &weak, &[]).connects()
        && !classify_link(&weak, &reach, &[]).connects();
    results.push(check(
        "asymmetric ranges classify one-way",
        one_way,
        "500 m vs 100 m antennas at 300 m".to_string(),
    ));

    let moon = Body {
        id: BodyId(1),
        position: Vec3::new(100.0, 0.0, 0.0),
        radius: 30.0,
    };
    let behind = end_at(2, 200.0, 1000.0);
    let wide = end_at(1, 0.0, 1000.0);
    results.push(check(
        "occluding body blocks line of sight",
        classify_link(&wide, &behind, &[moon]) == LinkKind::None,
        "body interposed on the segment".to_string(),
    ));

    let mut dish_probe = end_at(1, 0.0, 10.0);
    dish_probe.dishes.push(DishAntenna {
        target: DishTarget::Node(NodeId(2)),
        range: 10_000.0,
        cos_half_angle: 0.0,
    });
    let target = end_at(2, 5_000.0, 10.0);
    results.push(check(
        "node-targeted dish links beyond omni range",
        classify_link(&dish_probe, &target, &[]) == LinkKind::Dish,
        "5 km hop on a 10 km dish".to_string(),
    ));

    results
}

// ── 2. Pathfinding ──────────────────────────────────────────────────────

fn validate_pathfinding() -> Vec<TestResult> {
    let mut results = Vec::new();

    // Diamond with an expensive direct edge: 1-4 costs 10, 1-2-3-4 costs 3.
    let edges: &[(u32, u32, f64)] = &[
        (1, 4, 10.0),
        (1, 2, 1.0),
        (2, 3, 1.0),
        (3, 4, 1.0),
    ];
    let neighbours = |n: &u32| -> Vec<u32> {
        edges
            .iter()
            .filter_map(|&(a, b, _)| {
                if a == *n {
                    Some(b)
                } else if b == *n {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    };
    let cost = |a: &u32, b: &u32| -> f64 {
        edges
            .iter()
            .find(|&&(x, y, _)| (x == *a && y == *b) || (x == *b && y == *a))
            .map(|&(_, _, w)| w)
            .unwrap_or(f64::INFINITY)
    };

    let solved = astar(1u32, 4u32, neighbours, cost, |_, _| 0.0);
    let optimal = solved
        .as_ref()
        .map(|(path, total)| path == &vec![1, 2, 3, 4] && (total - 3.0).abs() < 1e-9)
        .unwrap_or(false);
    results.push(check(
        "astar picks the cheaper detour",
        optimal,
        format!("{:?}", solved),
    ));

    let unreachable = astar(1u32, 99u32, neighbours, cost, |_, _| 0.0);
    results.push(check(
        "astar reports disconnection",
        unreachable.is_none(),
        "goal 99 is not in the graph".to_string(),
    ));

    results
}

// ── 3. Relay engine ─────────────────────────────────────────────────────

fn relay_engine() -> (CommEngine, TableKinematics) {
    let table = TableKinematics::new();
    let mut engine = CommEngine::new(
        EngineConfig {
            refresh_ticks: 1,
            signal_speed: 100.0,
        },
        Box::new(table.clone()),
        Box::new(NoLocalControl),
        Box::new(AcceptAllEvents),
    );
    engine.register_node(NodeSpec::ground(NodeId(0), "mission control"));
    engine.register_node(NodeSpec::satellite(NodeId(1), "relay-a", 200.0));
    engine.register_node(NodeSpec::satellite(NodeId(2), "sat-b", 200.0));
    table.set_position(NodeId(0), Vec3::ZERO);
    table.set_position(NodeId(1), Vec3::new(150.0, 0.0, 0.0));
    table.set_position(NodeId(2), Vec3::new(300.0, 0.0, 0.0));
    (engine, table)
}

fn validate_relay_engine() -> Vec<TestResult> {
    let mut results = Vec::new();

    let (mut engine, table) = relay_engine();
    engine.set_focus(Some(NodeId(2)));
    engine.tick(1.0);

    let route = engine.connection_for(NodeId(2)).cloned();
    let routed = route
        .as_ref()
        .map(|r| r.hops == vec![NodeId(2), NodeId(1), NodeId(0)])
        .unwrap_or(false);
    results.push(check(
        "two-hop relay route",
        routed,
        format!("{:?}", route.map(|r| r.hops)),
    ));

    let delay = engine.signal_delay(NodeId(2));
    results.push(check(
        "delay derives from route length",
        delay.map(|d| (d - 3.0).abs() < 1e-9).unwrap_or(false),
        format!("300 m at 100 m/s → {:?} s", delay),
    ));

    // Out of everyone's reach: canonical no-connection.
    table.set_position(NodeId(2), Vec3::new(50_000.0, 0.0, 0.0));
    engine.tick(1.0);
    results.push(check(
        "drifting away severs the connection",
        engine.connection_for(NodeId(2)).is_none() && engine.signal_delay(NodeId(2)).is_none(),
        "route and delay both gone".to_string(),
    ));

    results
}

// ── 4. Incremental updater window ───────────────────────────────────────

fn validate_edge_window() -> Vec<TestResult> {
    let mut results = Vec::new();

    let refresh_ticks = 5;
    let mut updater = GraphUpdater::new(GraphConfig { refresh_ticks });
    let ends: Vec<LinkEnd> = (0..13).map(|i| end_at(i, i as f64 * 10.0, 15.0)).collect();

    let mut refreshed = Vec::new();
    for _ in 0..refresh_ticks {
        refreshed.extend(updater.step(&ends, &[]));
    }
    let mut ids: Vec<u32> = refreshed.iter().map(|id| id.0).collect();
    ids.sort_unstable();
    let exactly_once = ids == (0..13).collect::<Vec<u32>>();
    results.push(check(
        "window refreshes every row exactly once",
        exactly_once,
        format!("{} rows over {} ticks", refreshed.len(), refresh_ticks),
    ));

    let chained = (0..12).all(|i| updater.edge(NodeId(i), NodeId(i + 1)).connects());
    results.push(check(
        "adjacent nodes in the chain linked",
        chained,
        "10 m spacing, 15 m range".to_string(),
    ));

    results
}

// ── 5. Command flow ─────────────────────────────────────────────────────

fn validate_command_flow() -> Vec<TestResult> {
    let mut results = Vec::new();

    // Timestamp ordering straight on the buffer.
    let mut buffer = CommandBuffer::new();
    for &at in &[5.0, 1.0, 3.0] {
        buffer.enqueue(
            Command::ActionToggle { group: at as u8 },
            at,
            0.0,
        );
    }
    let popped: Vec<f64> = buffer
        .pop_due(6.0, 1.0)
        .iter()
        .map(|q| q.effective_at)
        .collect();
    results.push(check(
        "buffer pops in timestamp order",
        popped == vec![1.0, 3.0, 5.0],
        format!("{:?}", popped),
    ));

    // Latency stamping through the engine: 3 s of link delay + 1 s hold.
    let (mut engine, _table) = relay_engine();
    engine.set_focus(Some(NodeId(2)));
    engine.tick(1.0);
    engine.enqueue_command(NodeId(2), Command::ActionToggle { group: 1 }, 1.0);
    let queued = engine
        .active_commands(NodeId(2))
        .map(|s| s.queued)
        .unwrap_or_default();
    let stamped = queued
        .first()
        .map(|q| (q.effective_at - 4.0).abs() < 1e-9 && (q.extra_delay - 1.0).abs() < 1e-9)
        .unwrap_or(false);
    results.push(check(
        "enqueue stamps connection delay plus manual hold",
        stamped,
        format!(
            "sent at t=1, delay 3 s, hold 1 s → due {:?}",
            queued.first().map(|q| q.effective_at)
        ),
    ));

    // Burn scenario: 5 s duration, 1 s ticks, quiet from tick 6.
    let (mut engine, _table) = relay_engine();
    engine.set_focus(Some(NodeId(1)));
    engine.tick(1.0);
    engine.enqueue_command(
        NodeId(1),
        Command::Burn {
            throttle: 1.0,
            until: BurnRemaining::Duration(5.0),
        },
        0.0,
    );
    let mut throttle_by_tick = Vec::new();
    for _ in 0..8 {
        engine.tick(1.0);
        throttle_by_tick.push(engine.control_output(NodeId(1)).unwrap().throttle);
    }
    // 1.5 s of link delay: due at t=2.5, so burning spans t=3..=7.
    let burn_ok = throttle_by_tick[..1].iter().all(|&t| t == 0.0)
        && throttle_by_tick[1..6].iter().all(|&t| t > 0.0)
        && throttle_by_tick[6..].iter().all(|&t| t == 0.0);
    results.push(check(
        "burn runs its duration then clears",
        burn_ok,
        format!("throttle per tick: {:?}", throttle_by_tick),
    ));

    results
}

// ── 6. JSON scenarios ───────────────────────────────────────────────────

fn validate_scenarios(verbose: bool) -> Vec<TestResult> {
    let mut results = Vec::new();

    let scenarios: Vec<Scenario> = match serde_json::from_str(SCENARIOS_JSON) {
        Ok(s) => s,
        Err(e) => {
            results.push(check(
                "scenario file parses",
                false,
                format!("{}", e),
            ));
            return results;
        }
    };
    results.push(check(
        "scenario file parses",
        true,
        format!("{} scenarios", scenarios.len()),
    ));

    for scenario in &scenarios {
        let table = TableKinematics::new();
        let mut engine = CommEngine::new(
            EngineConfig {
                refresh_ticks: 4,
                signal_speed: 299_792_458.0,
            },
            Box::new(table.clone()),
            Box::new(NoLocalControl),
            Box::new(AcceptAllEvents),
        );
        for node in generate_constellation(&scenario.config) {
            table.set_position(node.spec.id, node.position);
            engine.register_node(node.spec);
        }

        let mut all_match = true;
        for sat in 1..=scenario.config.satellites {
            let id = NodeId(sat);
            engine.set_focus(Some(id));
            for _ in 0..4 {
                engine.tick(0.02);
            }
            let connected = engine.connection_for(id).is_some();
            if connected != scenario.expect_connected {
                all_match = false;
            }
            if verbose {
                println!(
                    "    [{}] sat-{:02}: connected={}",
                    scenario.name, sat, connected
                );
            }
        }
        results.push(check(
            &format!("scenario {}", scenario.name),
            all_match,
            format!(
                "{} satellites, expect_connected={}",
                scenario.config.satellites, scenario.expect_connected
            ),
        ));
    }

    results
}

// ── 7. Persistence ──────────────────────────────────────────────────────

fn validate_persistence() -> Vec<TestResult> {
    let mut results = Vec::new();

    let (mut engine, _table) = relay_engine();
    engine.set_focus(Some(NodeId(1)));
    engine.tick(1.0);
    engine.enqueue_command(NodeId(1), Command::ActionToggle { group: 3 }, 2.0);

    let mut bytes = Vec::new();
    let saved = save_commands(&mut bytes, &engine).is_ok();
    results.push(check(
        "snapshot saves",
        saved,
        format!("{} bytes", bytes.len()),
    ));

    let (mut loaded, _table) = relay_engine();
    let load_ok = load_commands(&bytes[..], &mut loaded).is_ok();
    let restored = loaded
        .active_commands(NodeId(1))
        .map(|s| s.queued.len() == 1)
        .unwrap_or(false);
    results.push(check(
        "snapshot reloads pending commands",
        load_ok && restored,
        "one queued command survives the round-trip".to_string(),
    ));

    results
}
