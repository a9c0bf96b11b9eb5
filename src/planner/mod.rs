//! Placement pipeline: annotate yields, then run the enabled stages in order
//! cities → regions → campuses against one shared [`HexGrid`].

pub mod campuses;
pub mod cities;
pub mod regions;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::map::tile::Improvement;
use crate::map::{HexGrid, Map};
use crate::scoring::{annotate_yields, YieldTable};
use crate::solver::{Model, Solution, SolveStatus, Solver};

use campuses::{CampusOptions, CampusSiting};
use cities::{CitySiting, CitySitingOptions};
use regions::{RegionOptions, RegionPartition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Cities,
    Regions,
    Campuses,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Cities => "City",
            Stage::Regions => "Region",
            Stage::Campuses => "Campus",
        };
        f.write_str(name)
    }
}

/// Outcome of one stage. `status` is `None` when the stage never reached
/// the solver.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: Option<SolveStatus>,
    pub objective: Option<i64>,
    pub applied: bool,
    pub elapsed_ms: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageReport {
    fn skipped(stage: Stage, err: &PlanError) -> Self {
        Self {
            stage,
            status: None,
            objective: None,
            applied: false,
            elapsed_ms: 0.0,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanReport {
    pub stages: Vec<StageReport>,
    pub cities: usize,
    pub campuses: usize,
    pub total_science: f64,
    /// Tiles owned per city tile index.
    pub region_sizes: BTreeMap<usize, usize>,
}

impl PlanReport {
    fn summarize(map: &Map, stages: Vec<StageReport>) -> Self {
        let mut region_sizes = BTreeMap::new();
        for owner in map.tiles.iter().filter_map(|t| t.owner) {
            *region_sizes.entry(owner).or_insert(0) += 1;
        }
        Self {
            stages,
            cities: map.count_improvement(Improvement::City),
            campuses: map.count_improvement(Improvement::Campus),
            total_science: map
                .tiles
                .iter()
                .filter(|t| t.improvement == Improvement::Campus)
                .map(|t| t.science)
                .sum(),
            region_sizes,
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Whether every stage that ran also applied its result.
    pub fn all_applied(&self) -> bool {
        self.stages.iter().all(|s| s.applied)
    }
}

/// Optimal results always apply; feasible ones only when the caller opts in.
pub fn accept(stage: Stage, status: SolveStatus, accept_feasible: bool) -> Result<(), PlanError> {
    match status {
        SolveStatus::Optimal => Ok(()),
        SolveStatus::Feasible if accept_feasible => Ok(()),
        status => Err(PlanError::OptimizationNotOptimal { stage, status }),
    }
}

/// Plan one map in place.
///
/// Map and table errors abort with `Err` before any stage runs. A stage
/// whose solve is not accepted leaves the map as it was and is recorded in
/// the report; later stages still run against whatever the map holds.
pub fn plan_map(
    map: &mut Map,
    config: &PlannerConfig,
    tables: &YieldTable,
    solver: &dyn Solver,
) -> Result<PlanReport, PlanError> {
    map.validate()?;
    let grid = HexGrid::new(map);
    let yield_range = annotate_yields(map, tables, config.strategy)?;
    let mut stages = Vec::new();

    if config.stages.cities {
        let options = CitySitingOptions {
            min_distance: config.min_city_distance,
            strategy: config.strategy,
            yield_range,
        };
        let siting = CitySiting::build(map, &grid, &options);
        stages.push(run_stage(
            Stage::Cities,
            siting.model(),
            solver,
            config.accept_feasible,
            |solution| {
                siting.apply(map, solution);
            },
        ));
    }

    let mut regions_applied = false;
    if config.stages.regions {
        let cities = map.city_indices();
        let report = if cities.is_empty() {
            no_cities(Stage::Regions)
        } else {
            let options = RegionOptions {
                radius: config.region_radius,
            };
            let partition = RegionPartition::build(map, &grid, &cities, &options);
            run_stage(
                Stage::Regions,
                partition.model(),
                solver,
                config.accept_feasible,
                |solution| {
                    partition.apply(map, solution);
                },
            )
        };
        regions_applied = report.applied;
        stages.push(report);
    }

    if config.stages.campuses {
        let cities = map.city_indices();
        let report = if cities.is_empty() {
            no_cities(Stage::Campuses)
        } else {
            let options = CampusOptions {
                scale: config.adjacency_scale,
                neighbor_bonus: config.campus_neighbor_bonus,
                owner_radius: config.campus_owner_radius,
                campus_count: config.campus_count,
                per_city: config.campuses_per_city,
                keep_existing_owners: regions_applied,
            };
            let siting = CampusSiting::build(map, &grid, &cities, &options);
            run_stage(
                Stage::Campuses,
                siting.model(),
                solver,
                config.accept_feasible,
                |solution| {
                    siting.apply(map, solution);
                },
            )
        };
        stages.push(report);
    }

    let report = PlanReport::summarize(map, stages);
    info!(
        tiles = map.tiles.len(),
        cities = report.cities,
        campuses = report.campuses,
        total_science = report.total_science,
        "Map planned"
    );
    Ok(report)
}

fn run_stage(
    stage: Stage,
    model: &Model,
    solver: &dyn Solver,
    accept_feasible: bool,
    apply: impl FnOnce(&Solution),
) -> StageReport {
    let start = Instant::now();
    let solution = solver.solve(model);
    let elapsed_ms = start.elapsed().as_secs_f32() * 1000.0;

    let outcome = accept(stage, solution.status, accept_feasible).and_then(|()| {
        if solution.has_values() {
            Ok(())
        } else {
            Err(PlanError::NoAssignment {
                stage,
                status: solution.status,
            })
        }
    });
    let applied = outcome.is_ok();
    if applied {
        apply(&solution);
    } else {
        warn!(
            stage = %stage,
            status = ?solution.status,
            elapsed_ms,
            "Stage result not applied"
        );
    }

    StageReport {
        stage,
        status: Some(solution.status),
        objective: solution.objective,
        applied,
        elapsed_ms,
        error: outcome.err().map(|e| e.to_string()),
    }
}

fn no_cities(stage: Stage) -> StageReport {
    let err = PlanError::NoCities { stage };
    warn!(stage = %stage, "{}", err);
    StageReport::skipped(stage, &err)
}
