use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::{GenerationParams, PlannerConfig};
use crate::error::PlanError;
use crate::map::generation::generate_map;
use crate::map::tile::Improvement;
use crate::map::Map;
use crate::planner::{plan_map, PlanReport};
use crate::solver::LpSolver;
use crate::transport::{self, collect_inputs, planned_path, read_map, write_map, ServerState};

/// Run the planning server until Ctrl-C.
pub async fn serve(config: PlannerConfig) -> Result<(), String> {
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| format!("Invalid bind address: {}", e))?;
    let state = Arc::new(ServerState::new(config));

    tokio::select! {
        result = transport::start_server(state, addr) => {
            result.map_err(|e| format!("Server error: {}", e))
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    }
}

/// Result of planning one map file.
#[derive(Debug)]
pub struct PlanOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub result: Result<PlanReport, PlanError>,
}

/// Plan every input map in parallel, writing `<name>.planned.bin` files
/// into `out_dir`. Maps are independent; one failure does not stop the rest.
pub fn plan_files(
    config: &PlannerConfig,
    inputs: &[PathBuf],
    out_dir: &Path,
) -> Result<Vec<PlanOutcome>, String> {
    let inputs = collect_inputs(inputs).map_err(|e| format!("Cannot list inputs: {}", e))?;
    if inputs.is_empty() {
        return Err("No map files to plan".to_string());
    }
    let tables = config.yield_table();

    let outcomes = inputs
        .par_iter()
        .map(|input| {
            let output = planned_path(input, out_dir);
            let result = plan_file(config, &tables, input, &output);
            match &result {
                Ok(report) => info!(
                    input = %input.display(),
                    cities = report.cities,
                    campuses = report.campuses,
                    "Map planned"
                ),
                Err(e) => warn!(input = %input.display(), error = %e, "Map failed"),
            }
            PlanOutcome {
                input: input.clone(),
                output,
                result,
            }
        })
        .collect();
    Ok(outcomes)
}

fn plan_file(
    config: &PlannerConfig,
    tables: &crate::scoring::YieldTable,
    input: &Path,
    output: &Path,
) -> Result<PlanReport, PlanError> {
    let mut map = read_map(input)?;
    let solver = LpSolver::new(config.solver_time_budget());
    let report = plan_map(&mut map, config, tables, &solver)?;
    write_map(&map, output)?;
    Ok(report)
}

pub fn print_plan_summary(outcomes: &[PlanOutcome]) {
    println!(
        "{:<32} {:>7} {:>9} {:>9}  {}",
        "Map", "Cities", "Campuses", "Science", "Result"
    );
    println!("{}", "-".repeat(72));
    for outcome in outcomes {
        let name = outcome
            .input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("?");
        match &outcome.result {
            Ok(report) => {
                let stalled: Vec<String> = report
                    .stages
                    .iter()
                    .filter(|s| !s.applied)
                    .map(|s| s.stage.to_string())
                    .collect();
                let result = if stalled.is_empty() {
                    format!("-> {}", outcome.output.display())
                } else {
                    format!("not applied: {}", stalled.join(", "))
                };
                println!(
                    "{:<32} {:>7} {:>9} {:>9.1}  {}",
                    name, report.cities, report.campuses, report.total_science, result
                );
            }
            Err(e) => println!("{:<32} {:>7} {:>9} {:>9}  error: {}", name, "-", "-", "-", e),
        }
    }
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    println!("\n{} map(s) planned, {} failed", outcomes.len() - failed, failed);
}

/// Generate a demo map and write it to `output`.
pub fn generate(params: &GenerationParams, output: &Path) -> Result<Map, String> {
    params.validate()?;
    let (map, seed) = generate_map(params);
    write_map(&map, output).map_err(|e| format!("Cannot save map: {}", e))?;
    println!("Generated {}x{} map with seed {}", map.rows, map.cols, seed);
    Ok(map)
}

/// Print a map summary, or a single tile when `tile` is given.
pub fn inspect(path: &Path, tile: Option<usize>) -> Result<(), String> {
    let map = read_map(path).map_err(|e| format!("Failed to load map: {}", e))?;
    match tile {
        Some(index) => inspect_tile(&map, index),
        None => {
            print_map_summary(&map);
            Ok(())
        }
    }
}

fn inspect_tile(map: &Map, index: usize) -> Result<(), String> {
    let tile = map
        .tiles
        .get(index)
        .ok_or_else(|| format!("Tile {} not found (map has {} tiles)", index, map.tiles.len()))?;

    println!("=== Tile {} ({}, {}) ===", index, tile.row, tile.col);
    println!("  Terrain: {:?}", tile.base_terrain);
    println!("  Feature: {:?}", tile.feature);
    match tile.resource {
        Some(r) => println!("  Resource: {:?}", r),
        None => println!("  Resource: (none)"),
    }
    println!("  Improvement: {:?}", tile.improvement);
    println!(
        "  Yields: {} food, {} production (value {})",
        tile.food, tile.production, tile.yield_value
    );
    match tile.owner {
        Some(owner) => {
            let (row, col) = map.position(owner);
            println!("  Owner: city {} ({}, {})", owner, row, col);
        }
        None => println!("  Owner: (none)"),
    }
    if tile.improvement == Improvement::Campus {
        println!("  Science: {:.1}", tile.science);
    }
    Ok(())
}

pub fn print_map_summary(map: &Map) {
    println!("=== Map Summary ===");
    println!("Size: {}x{} ({} tiles)", map.rows, map.cols, map.tiles.len());

    let n = map.tiles.len().max(1) as f64;
    let mut terrain_counts: BTreeMap<String, usize> = BTreeMap::new();
    for tile in &map.tiles {
        *terrain_counts
            .entry(format!("{:?}", tile.base_terrain))
            .or_insert(0) += 1;
    }
    println!("\nTerrain:");
    for (name, count) in &terrain_counts {
        let pct = *count as f64 / n * 100.0;
        println!("  {:<22} {:>5} ({:.1}%)", name, count, pct);
    }

    let resources = map.tiles.iter().filter(|t| t.resource.is_some()).count();
    println!("\nResources: {}", resources);

    let cities = map.city_indices();
    let campuses: Vec<_> = map
        .tiles
        .iter()
        .filter(|t| t.improvement == Improvement::Campus)
        .collect();
    println!("Cities: {}", cities.len());
    println!(
        "Campuses: {} (science {:.1})",
        campuses.len(),
        campuses.iter().map(|t| t.science).sum::<f64>()
    );
    for &city in &cities {
        let owned = map.tiles.iter().filter(|t| t.owner == Some(city)).count();
        let (row, col) = map.position(city);
        println!("  City {} ({}, {}): {} tiles", city, row, col, owned);
    }
}
