//! HexForest Headless Simulation Harness
//!
//! Runs the shortest-path forest protocol on fixed scenarios and on a
//! random region, then checks the forest invariants.
//! Runs entirely in-process with no rendering.
//!
//! Usage:
//!   cargo run -p hexforest-simtest
//!   cargo run -p hexforest-simtest -- --verbose
//!   cargo run -p hexforest-simtest -- --config run.json --dump snapshot.json

use std::collections::{HashMap, HashSet, VecDeque};

use hexforest_core::prelude::*;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::FmtSubscriber;

const SCENARIO_BUDGET: u64 = 200_000;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn check(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

struct Args {
    verbose: bool,
    config: Option<String>,
    dump: Option<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };
    Args {
        verbose: args.iter().any(|a| a == "--verbose"),
        config: value_of("--config"),
        dump: value_of("--dump"),
    }
}

fn main() {
    let args = parse_args();
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    println!("=== HexForest Simulation Harness ===\n");

    let config = match &args.config {
        Some(path) => match ForestConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path, e);
                std::process::exit(2);
            }
        },
        None => ForestConfig {
            seed: Some(7),
            ..ForestConfig::default()
        },
    };

    let mut results = Vec::new();

    // 1. Single source in a hexagon
    results.extend(validate_center_source());

    // 2. Two sources, two regions
    results.extend(validate_two_sources());

    // 3. Three sources on one row
    results.extend(validate_three_sources());

    // 4. Tour and pruning
    results.extend(validate_tour());

    // 5. Random region
    results.extend(validate_random_region(&config, args.dump.as_deref()));

    // 6. Save/load
    results.extend(validate_persistence());

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || args.verbose {
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

/// Build and settle, or report why not.
fn settle(name: &str, layout: GridLayout, seed: u64) -> Result<ForestEngine, TestResult> {
    let mut engine = ForestEngine::from_layout(layout, seed)
        .map_err(|e| TestResult::check(name, false, format!("layout rejected: {}", e)))?;
    engine
        .run(SCENARIO_BUDGET)
        .map_err(|e| TestResult::check(name, false, e.to_string()))?;
    Ok(engine)
}

fn region_at(engine: &ForestEngine, hex: Hex) -> Option<u32> {
    engine.view(hex).ok().and_then(|v| v.region)
}

// ── 1. Center source ────────────────────────────────────────────────────

fn validate_center_source() -> Vec<TestResult> {
    println!("--- Center Source ---");
    let engine = match settle(
        "center_settles",
        GridLayout::hexagon(1).with_source(Hex::new(0, 0)),
        1,
    ) {
        Ok(engine) => engine,
        Err(failure) => return vec![failure],
    };

    let wrong: Vec<Hex> = Hex::new(0, 0)
        .neighbors()
        .filter(|&(dir, hex)| {
            engine
                .view(hex)
                .map(|v| v.parent != Some(dir.opposite()) || v.layer_sum() != Some(2))
                .unwrap_or(true)
        })
        .map(|(_, hex)| hex)
        .collect();

    vec![
        TestResult::check(
            "center_settles",
            true,
            format!("{} activations", engine.activations()),
        ),
        TestResult::check(
            "center_parents_all_neighbors",
            wrong.is_empty(),
            if wrong.is_empty() {
                "all 6 neighbors point at the source with layer sum 2".into()
            } else {
                format!("wrong parent or layers at {:?}", wrong)
            },
        ),
    ]
}

// ── 2. Two sources ──────────────────────────────────────────────────────

fn validate_two_sources() -> Vec<TestResult> {
    println!("--- Two Sources ---");
    let layout = GridLayout::parallelogram(9, 9)
        .with_source(Hex::new(4, 2))
        .with_source(Hex::new(4, 6));
    let engine = match settle("two_sources_settle", layout, 2) {
        Ok(engine) => engine,
        Err(failure) => return vec![failure],
    };

    let boundaries = (2..6)
        .filter(|&y| region_at(&engine, Hex::new(4, y)) != region_at(&engine, Hex::new(4, y + 1)))
        .count();

    vec![
        TestResult::check(
            "two_sources_cuts",
            engine.barrier().cuts == 2,
            format!("{} cuts", engine.barrier().cuts),
        ),
        TestResult::check(
            "two_sources_one_boundary",
            boundaries == 1 && engine.barrier().regions() == 2,
            format!(
                "{} regions, {} boundaries between the sources",
                engine.barrier().regions(),
                boundaries
            ),
        ),
    ]
}

// ── 3. Three sources ────────────────────────────────────────────────────

fn validate_three_sources() -> Vec<TestResult> {
    println!("--- Three Sources ---");
    let layout = GridLayout::parallelogram(9, 3)
        .with_source(Hex::new(1, 1))
        .with_source(Hex::new(4, 1))
        .with_source(Hex::new(7, 1));
    let engine = match settle("three_sources_settle", layout, 3) {
        Ok(engine) => engine,
        Err(failure) => return vec![failure],
    };

    let west = region_at(&engine, Hex::new(1, 1));
    let middle = region_at(&engine, Hex::new(4, 1));
    let east = region_at(&engine, Hex::new(7, 1));

    vec![
        TestResult::check(
            "three_sources_middle_shares_once",
            (middle == west) ^ (middle == east),
            format!("regions {:?} / {:?} / {:?}", west, middle, east),
        ),
        TestResult::check(
            "three_sources_outer_apart",
            west != east,
            format!("outer regions {:?} and {:?}", west, east),
        ),
    ]
}

// ── 4. Tour ─────────────────────────────────────────────────────────────

fn validate_tour() -> Vec<TestResult> {
    println!("--- Euler Tour ---");
    let source = Hex::new(0, 1);
    let target = Hex::new(3, 1);
    let layout = GridLayout::parallelogram(5, 3)
        .with_source(source)
        .with_target(target);
    let engine = match settle("tour_settles", layout, 4) {
        Ok(engine) => engine,
        Err(failure) => return vec![failure],
    };

    let views = engine.views();
    let top_label = views
        .iter()
        .flat_map(|v| v.in_edge.iter().chain(v.out_edge.iter()).flatten().copied().collect::<Vec<_>>())
        .max();
    let live_agents = views
        .iter()
        .filter(|v| v.in_edge.iter().chain(v.out_edge.iter()).any(Option::is_some))
        .count();

    vec![
        TestResult::check(
            "tour_single_increment",
            top_label == Some(1),
            format!("highest label {:?}", top_label),
        ),
        TestResult::check(
            "tour_prunes_to_path",
            live_agents == 4,
            format!("{} agents keep live edges (path has 4)", live_agents),
        ),
    ]
}

// ── 5. Random region ────────────────────────────────────────────────────

fn bfs_distances(layout: &GridLayout) -> HashMap<Hex, u32> {
    let occupied: HashSet<Hex> = layout.cells().iter().map(|c| c.hex).collect();
    let mut dist: HashMap<Hex, u32> = layout.sources().map(|h| (h, 0)).collect();
    let mut queue: VecDeque<Hex> = layout.sources().collect();
    while let Some(hex) = queue.pop_front() {
        let d = dist[&hex];
        for (_, next) in hex.neighbors() {
            if occupied.contains(&next) && !dist.contains_key(&next) {
                dist.insert(next, d + 1);
                queue.push_back(next);
            }
        }
    }
    dist
}

fn validate_random_region(config: &ForestConfig, dump: Option<&str>) -> Vec<TestResult> {
    println!("--- Random Region ---");
    let mut results = Vec::new();

    let mut engine = match ForestEngine::generate(config) {
        Ok(engine) => engine,
        Err(e) => {
            results.push(TestResult::check("random_generate", false, e.to_string()));
            return results;
        }
    };
    results.push(TestResult::check(
        "random_generate",
        !engine.layout().has_holes(),
        format!(
            "{} agents, seed {}, hole-free: {}",
            engine.agent_count(),
            engine.seed(),
            !engine.layout().has_holes()
        ),
    ));

    let summary = match engine.run(config.max_activations) {
        Ok(summary) => summary,
        Err(e) => {
            results.push(TestResult::check("random_settles", false, e.to_string()));
            return results;
        }
    };
    results.push(TestResult::check(
        "random_settles",
        true,
        format!(
            "{} rounds, {} activations, {} regions, {} re-rooted",
            summary.rounds, summary.activations, summary.regions, summary.rerooted
        ),
    ));

    let dist = bfs_distances(engine.layout());
    let views: HashMap<Hex, AgentView> = engine.views().into_iter().map(|v| (v.hex, v)).collect();

    let off_distance = views
        .values()
        .filter(|v| v.layer_sum() != dist.get(&v.hex).map(|d| 2 * d))
        .count();
    results.push(TestResult::check(
        "random_layers_match_bfs",
        off_distance == 0,
        format!("{} agents off twice their BFS distance", off_distance),
    ));

    let broken_delta = views
        .values()
        .filter(|v| match (v.parent_hex(), v.layer_sum()) {
            (Some(up), Some(own)) => views.get(&up).and_then(AgentView::layer_sum) != Some(own.wrapping_sub(2)),
            _ => false,
        })
        .count();
    results.push(TestResult::check(
        "random_delta_invariant",
        broken_delta == 0 && summary.orphans == 0,
        format!("{} broken parent edges, {} orphans", broken_delta, summary.orphans),
    ));

    let mut per_region: HashMap<Option<u32>, usize> = HashMap::new();
    for view in views.values().filter(|v| v.source) {
        *per_region.entry(view.region).or_default() += 1;
    }
    let crowded = per_region.values().filter(|&&n| n > 2).count();
    results.push(TestResult::check(
        "random_region_cap",
        crowded == 0,
        format!("{} regions over two sources", crowded),
    ));

    results.push(TestResult::check(
        "random_targets_reached",
        summary.targets_reached == engine.layout().targets().count(),
        format!(
            "{} of {} targets keep live edges",
            summary.targets_reached,
            engine.layout().targets().count()
        ),
    ));

    if let Some(path) = dump {
        let written = engine
            .snapshot()
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
        results.push(TestResult::check(
            "random_dump",
            written.is_ok(),
            match written {
                Ok(()) => format!("snapshot written to {}", path),
                Err(e) => e,
            },
        ));
    }

    results
}

// ── 6. Persistence ──────────────────────────────────────────────────────

fn validate_persistence() -> Vec<TestResult> {
    println!("--- Persistence ---");
    let layout = GridLayout::hexagon(3)
        .with_source(Hex::new(-3, 0))
        .with_source(Hex::new(3, 0))
        .with_target(Hex::new(0, 3));
    let mut engine = match ForestEngine::from_layout(layout, 6) {
        Ok(engine) => engine,
        Err(e) => return vec![TestResult::check("save_load", false, e.to_string())],
    };
    for _ in 0..3 {
        engine.run_round();
    }

    let mut buffer = Vec::new();
    if let Err(e) = engine.save(&mut buffer) {
        return vec![TestResult::check("save_load", false, e.to_string())];
    }
    let mut loaded = match ForestEngine::load(&buffer[..]) {
        Ok(loaded) => loaded,
        Err(e) => return vec![TestResult::check("save_load", false, e.to_string())],
    };

    let same = loaded.views() == engine.views() && loaded.barrier() == engine.barrier();
    let resumed = loaded.run(SCENARIO_BUDGET);
    vec![
        TestResult::check(
            "save_load",
            same,
            format!("{} bytes, state identical: {}", buffer.len(), same),
        ),
        TestResult::check(
            "load_then_settle",
            resumed.is_ok(),
            match resumed {
                Ok(summary) => format!("settled after {} total activations", summary.activations),
                Err(e) => e.to_string(),
            },
        ),
    ]
}
