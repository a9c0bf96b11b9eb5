use std::collections::BTreeSet;

use tracing::debug;

use crate::map::tile::Improvement;
use crate::map::{HexGrid, Map};
use crate::scoring::{Strategy, YieldRange};
use crate::solver::{LinearExpr, Model, Solution, VarId};

#[derive(Debug, Clone, Copy)]
pub struct CitySitingOptions {
    /// Cities must be strictly further apart than this many tiles.
    pub min_distance: u32,
    pub strategy: Strategy,
    /// Range of `yield_value` over the map, from annotation.
    pub yield_range: YieldRange,
}

/// City placement: one boolean per tile.
#[derive(Debug)]
pub struct CitySiting {
    model: Model,
    city: Vec<VarId>,
}

impl CitySiting {
    pub fn build(map: &Map, grid: &HexGrid, options: &CitySitingOptions) -> Self {
        let mut model = Model::new();
        let city = (0..map.tiles.len())
            .map(|i| model.new_bool(format!("city_{}", i)))
            .collect();
        let mut siting = Self { model, city };

        siting.pin_existing(map);
        siting.enforce_spacing(map, grid, options.min_distance);
        siting.add_clique_cuts(map, grid, options.min_distance);
        siting.set_objective(map, options);

        debug!(
            vars = siting.model.num_vars(),
            constraints = siting.model.num_constraints(),
            strategy = ?options.strategy,
            "City model built"
        );
        siting
    }

    /// Cities already on the map stay. Unbuildable tiles never get one.
    fn pin_existing(&mut self, map: &Map) {
        for (i, tile) in map.tiles.iter().enumerate() {
            if tile.is_city() {
                self.model.fix(self.city[i], 1);
            } else if tile.base_terrain.is_unbuildable() {
                self.model.fix(self.city[i], 0);
            }
        }
    }

    /// No two cities within `min_distance` of each other. Each pair is
    /// constrained once; a tile is never paired with itself.
    fn enforce_spacing(&mut self, map: &Map, grid: &HexGrid, min_distance: u32) {
        for i in 0..map.tiles.len() {
            if !may_hold_city(map, i) {
                continue;
            }
            for j in grid.cumulative_ring(i, min_distance) {
                if j <= i || !may_hold_city(map, j) {
                    continue;
                }
                self.model
                    .add_le(LinearExpr::sum([self.city[i], self.city[j]]), 1);
            }
        }
    }

    /// At most one city in any set of tiles that are pairwise within
    /// `min_distance`. Implied by the pairwise rows, but much tighter once
    /// the booleans are relaxed.
    ///
    /// For an even distance the sets are balls of radius `d / 2`. For an odd
    /// one they are the union of radius `(d - 1) / 2` balls around three
    /// mutually adjacent tiles.
    fn add_clique_cuts(&mut self, map: &Map, grid: &HexGrid, min_distance: u32) {
        let radius = min_distance / 2;
        let ball = |t: usize| std::iter::once(t).chain(grid.cumulative_ring(t, radius));

        let mut cliques: Vec<BTreeSet<usize>> = Vec::new();
        for a in 0..map.tiles.len() {
            if min_distance % 2 == 0 {
                cliques.push(ball(a).collect());
                continue;
            }
            for b in grid.neighbors(a).filter(|&b| b > a) {
                for c in grid.neighbors(a).filter(|&c| c > b) {
                    if grid.distance(b, c) == 1 {
                        cliques.push(ball(a).chain(ball(b)).chain(ball(c)).collect());
                    }
                }
            }
        }

        for clique in cliques {
            let members: Vec<VarId> = clique
                .into_iter()
                .filter(|&t| may_hold_city(map, t))
                .map(|t| self.city[t])
                .collect();
            if members.len() > 2 {
                self.model.add_le(LinearExpr::sum(members), 1);
            }
        }
    }

    /// The objective is carried by one integer variable, so branch and
    /// bound can split on the objective value itself.
    fn set_objective(&mut self, map: &Map, options: &CitySitingOptions) {
        let n = map.tiles.len() as i64;
        if options.strategy == Strategy::MaxCities {
            let count = self.model.new_int(0, n, "city_count");
            let mut link = LinearExpr::sum(self.city.iter().copied());
            link.add_term(count, -1);
            self.model.add_eq(link, 0);
            self.model.maximize(count);
            return;
        }

        // city_yield[i] = city[i] * yield_value[i]. A tile without a city
        // contributes 0, so the bounds always admit 0.
        let lower = options.yield_range.min.min(0) as i64;
        let upper = options.yield_range.max.max(0) as i64;
        let total = self.model.new_int(lower * n, upper * n, "total_yield");
        let mut link = LinearExpr::new().term(total, -1);
        for (i, tile) in map.tiles.iter().enumerate() {
            let city_yield = self.model.new_real(lower, upper, format!("city_yield_{}", i));
            self.model.add_eq(
                LinearExpr::from(city_yield).term(self.city[i], -(tile.yield_value as i64)),
                0,
            );
            link.add_term(city_yield, 1);
        }
        self.model.add_eq(link, 0);
        self.model.maximize(total);
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Mark chosen tiles as cities. Returns every city tile, including the
    /// ones that were already there.
    pub fn apply(&self, map: &mut Map, solution: &Solution) -> Vec<usize> {
        let mut placed = Vec::new();
        for (i, &var) in self.city.iter().enumerate() {
            if solution.is_true(var) {
                map.tiles[i].improvement = Improvement::City;
                placed.push(i);
            }
        }
        placed
    }
}

/// Existing cities and buildable tiles; everything else is pinned to 0.
fn may_hold_city(map: &Map, t: usize) -> bool {
    let tile = &map.tiles[t];
    tile.is_city() || !tile.base_terrain.is_unbuildable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::tile::BaseTerrain;
    use crate::scoring::{annotate_yields, YieldTable};
    use crate::solver::{LpSolver, SolveStatus, Solver};

    fn solve(map: &mut Map, min_distance: u32, strategy: Strategy) -> (SolveStatus, Vec<usize>) {
        let range = annotate_yields(map, &YieldTable::standard(), strategy).unwrap();
        let grid = HexGrid::new(map);
        let options = CitySitingOptions {
            min_distance,
            strategy,
            yield_range: range,
        };
        let siting = CitySiting::build(map, &grid, &options);
        let solution = LpSolver::unbounded().solve(siting.model());
        let placed = siting.apply(map, &solution);
        (solution.status, placed)
    }

    #[test]
    fn small_plains_map_gets_one_city() {
        let mut map = Map::filled(3, 3, BaseTerrain::Plains);
        let (status, placed) = solve(&mut map, 3, Strategy::MaxCities);
        assert_eq!(status, SolveStatus::Optimal);
        assert_eq!(placed.len(), 1);
        assert_eq!(map.count_improvement(Improvement::City), 1);
    }

    #[test]
    fn cities_respect_minimum_distance() {
        let mut map = Map::filled(5, 8, BaseTerrain::Grassland);
        let (status, placed) = solve(&mut map, 3, Strategy::MaxCities);
        assert_eq!(status, SolveStatus::Optimal);
        assert!(placed.len() >= 2, "expected several cities, got {:?}", placed);
        let grid = HexGrid::new(&map);
        for (n, &a) in placed.iter().enumerate() {
            for &b in &placed[n + 1..] {
                assert!(grid.distance(a, b) > 3, "cities {} and {} too close", a, b);
            }
        }
    }

    #[test]
    fn never_on_ocean_even_with_best_yield() {
        let mut map = Map::filled(3, 3, BaseTerrain::Desert);
        map.tiles[4].base_terrain = BaseTerrain::Ocean;
        map.tiles[4].resource = Some(crate::map::tile::Resource::Fish);
        let (status, placed) = solve(&mut map, 3, Strategy::MaxYield);
        assert_eq!(status, SolveStatus::Optimal);
        assert!(!placed.contains(&4));
        assert_ne!(map.tiles[4].improvement, Improvement::City);
    }

    #[test]
    fn all_water_map_places_nothing() {
        let mut map = Map::filled(2, 3, BaseTerrain::Coast);
        let (status, placed) = solve(&mut map, 3, Strategy::MaxCities);
        assert_eq!(status, SolveStatus::Optimal);
        assert!(placed.is_empty());
    }

    #[test]
    fn yield_strategy_prefers_richest_tile() {
        let mut map = Map::filled(3, 3, BaseTerrain::Desert);
        map.tiles[7].base_terrain = BaseTerrain::PlainsHills;
        let (status, placed) = solve(&mut map, 3, Strategy::MaxProduction);
        assert_eq!(status, SolveStatus::Optimal);
        assert_eq!(placed, vec![7]);
    }

    #[test]
    fn spacing_constraints_never_pair_a_tile_with_itself() {
        let map = Map::filled(4, 4, BaseTerrain::Plains);
        let grid = HexGrid::new(&map);
        let options = CitySitingOptions {
            min_distance: 3,
            strategy: Strategy::MaxCities,
            yield_range: YieldRange { min: 0, max: 0 },
        };
        let siting = CitySiting::build(&map, &grid, &options);
        for c in siting.model().constraints() {
            let vars: Vec<_> = c.expr.terms.iter().map(|(v, _)| *v).collect();
            if vars.len() == 2 {
                assert_ne!(vars[0], vars[1]);
            }
        }
    }

    #[test]
    fn existing_cities_are_kept_and_spaced_against() {
        let mut map = Map::filled(1, 5, BaseTerrain::Plains);
        map.tiles[2].improvement = Improvement::City;
        let (status, placed) = solve(&mut map, 3, Strategy::MaxCities);
        assert_eq!(status, SolveStatus::Optimal);
        // Tiles 0 and 4 are two steps from the existing city.
        assert_eq!(placed, vec![2]);
        assert_eq!(map.city_indices(), vec![2]);
    }

    #[test]
    fn existing_city_on_hills_survives_yield_strategy() {
        let mut map = Map::filled(3, 3, BaseTerrain::Desert);
        map.tiles[7].base_terrain = BaseTerrain::PlainsHills;
        map.tiles[0].improvement = Improvement::City;
        let (status, placed) = solve(&mut map, 3, Strategy::MaxProduction);
        assert_eq!(status, SolveStatus::Optimal);
        assert_eq!(placed, vec![0]);
        assert_ne!(map.tiles[7].improvement, Improvement::City);
    }

    #[test]
    fn clique_rows_only_group_tiles_within_spacing() {
        for min_distance in [2, 3, 4] {
            let map = Map::filled(6, 7, BaseTerrain::Plains);
            let grid = HexGrid::new(&map);
            let options = CitySitingOptions {
                min_distance,
                strategy: Strategy::MaxCities,
                yield_range: YieldRange { min: 0, max: 0 },
            };
            let siting = CitySiting::build(&map, &grid, &options);
            let n = map.tiles.len();
            let mut cliques = 0;
            for c in siting.model().constraints() {
                let tiles: Vec<usize> = c.expr.terms.iter().map(|(v, _)| v.index()).collect();
                if tiles.len() <= 2 || tiles.iter().any(|&t| t >= n) {
                    continue;
                }
                cliques += 1;
                assert_eq!(c.rhs, 1);
                for (k, &a) in tiles.iter().enumerate() {
                    for &b in &tiles[k + 1..] {
                        assert!(grid.distance(a, b) <= min_distance, "{} and {}", a, b);
                    }
                }
            }
            assert!(cliques > 0, "no clique rows for distance {}", min_distance);
        }
    }

    #[test]
    fn medium_map_solves_to_optimality() {
        let mut map = Map::filled(8, 8, BaseTerrain::Plains);
        let range = annotate_yields(&mut map, &YieldTable::standard(), Strategy::MaxCities).unwrap();
        let grid = HexGrid::new(&map);
        let options = CitySitingOptions {
            min_distance: 3,
            strategy: Strategy::MaxCities,
            yield_range: range,
        };
        let siting = CitySiting::build(&map, &grid, &options);
        let solution = LpSolver::new(std::time::Duration::from_secs(30)).solve(siting.model());
        assert_eq!(solution.status, SolveStatus::Optimal);
        let placed = siting.apply(&mut map, &solution);
        assert!(placed.len() >= 4, "{:?}", placed);
        for (k, &a) in placed.iter().enumerate() {
            for &b in &placed[k + 1..] {
                assert!(grid.distance(a, b) > 3);
            }
        }
    }
}
