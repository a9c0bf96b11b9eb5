use tracing::debug;

use crate::map::{HexGrid, Map};
use crate::solver::{LinearExpr, Model, Solution, VarId};

#[derive(Debug, Clone, Copy)]
pub struct RegionOptions {
    /// Tiles further than this from a city cannot belong to it.
    pub radius: u32,
}

/// City region partition with a max-min fairness objective.
///
/// `own[t][k]` is true when tile `t` belongs to the `k`-th city. The
/// objective is `min_size * (tiles + 1) + Σ own`: the smallest region is
/// maximized first, then coverage breaks ties.
#[derive(Debug)]
pub struct RegionPartition {
    model: Model,
    cities: Vec<usize>,
    own: Vec<Vec<VarId>>,
    min_size: VarId,
}

impl RegionPartition {
    /// `cities` must be non-empty; the caller checks.
    pub fn build(map: &Map, grid: &HexGrid, cities: &[usize], options: &RegionOptions) -> Self {
        let n = map.tiles.len();
        let mut model = Model::new();
        let own: Vec<Vec<VarId>> = (0..n)
            .map(|t| {
                cities
                    .iter()
                    .map(|c| model.new_bool(format!("own_{}_{}", t, c)))
                    .collect()
            })
            .collect();
        let min_size = model.new_int(0, n as i64, "min_region_size");

        let mut partition = Self {
            model,
            cities: cities.to_vec(),
            own,
            min_size,
        };
        partition.constrain(grid, options.radius);
        partition.set_objective(n);

        debug!(
            cities = cities.len(),
            vars = partition.model.num_vars(),
            constraints = partition.model.num_constraints(),
            "Region model built"
        );
        partition
    }

    fn constrain(&mut self, grid: &HexGrid, radius: u32) {
        for (k, &city) in self.cities.iter().enumerate() {
            self.model.fix(self.own[city][k], 1);
        }

        for (t, row) in self.own.iter().enumerate() {
            for (k, &city) in self.cities.iter().enumerate() {
                if grid.distance(t, city) > radius {
                    self.model.fix(row[k], 0);
                }
            }
            self.model.add_le(LinearExpr::sum(row.iter().copied()), 1);
        }

        // min_size <= region size of every city
        for k in 0..self.cities.len() {
            let mut expr = LinearExpr::from(self.min_size);
            for row in &self.own {
                expr.add_term(row[k], -1);
            }
            self.model.add_le(expr, 0);
        }
    }

    fn set_objective(&mut self, tiles: usize) {
        let mut objective = LinearExpr::new().term(self.min_size, tiles as i64 + 1);
        for row in &self.own {
            for &var in row {
                objective.add_term(var, 1);
            }
        }
        self.model.maximize(objective);
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Write owners to every tile. Returns the smallest region size.
    pub fn apply(&self, map: &mut Map, solution: &Solution) -> usize {
        for (t, row) in self.own.iter().enumerate() {
            map.tiles[t].owner = row
                .iter()
                .position(|&var| solution.is_true(var))
                .map(|k| self.cities[k]);
        }
        solution.value(self.min_size).max(0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::tile::{BaseTerrain, Improvement};
    use crate::solver::{LpSolver, SolveStatus, Solver};
    use std::collections::HashMap;

    fn partition(map: &mut Map, cities: &[usize], radius: u32) -> (SolveStatus, usize) {
        for &c in cities {
            map.tiles[c].improvement = Improvement::City;
        }
        let grid = HexGrid::new(map);
        let partition = RegionPartition::build(map, &grid, cities, &RegionOptions { radius });
        let solution = LpSolver::unbounded().solve(partition.model());
        let min = partition.apply(map, &solution);
        (solution.status, min)
    }

    #[test]
    fn cities_own_themselves() {
        let mut map = Map::filled(3, 6, BaseTerrain::Plains);
        let cities = [0, 17];
        let (status, _) = partition(&mut map, &cities, 3);
        assert_eq!(status, SolveStatus::Optimal);
        for &c in &cities {
            assert_eq!(map.tiles[c].owner, Some(c));
        }
    }

    #[test]
    fn owners_are_within_radius() {
        let mut map = Map::filled(4, 8, BaseTerrain::Plains);
        let cities = [0, 31];
        let (status, _) = partition(&mut map, &cities, 2);
        assert_eq!(status, SolveStatus::Optimal);
        let grid = HexGrid::new(&map);
        for (t, tile) in map.tiles.iter().enumerate() {
            if let Some(owner) = tile.owner {
                assert!(cities.contains(&owner));
                assert!(grid.distance(t, owner) <= 2);
            }
        }
        // The far corners are more than 2 apart from both cities.
        assert!(map.tiles.iter().any(|t| t.owner.is_none()));
    }

    #[test]
    fn regions_are_balanced() {
        // Two cities on a 1x7 strip, both within reach of every tile between them.
        let mut map = Map::filled(1, 7, BaseTerrain::Plains);
        let cities = [1, 5];
        let (status, min) = partition(&mut map, &cities, 3);
        assert_eq!(status, SolveStatus::Optimal);
        let mut sizes: HashMap<usize, usize> = HashMap::new();
        for tile in &map.tiles {
            if let Some(owner) = tile.owner {
                *sizes.entry(owner).or_insert(0) += 1;
            }
        }
        // All 7 tiles are reachable; the fair split is 4/3 or 3/4.
        assert_eq!(min, 3);
        assert_eq!(sizes.values().sum::<usize>(), 7);
        assert!(sizes.values().all(|&s| s >= 3));
    }

    #[test]
    fn single_city_takes_everything_in_range() {
        let mut map = Map::filled(3, 3, BaseTerrain::Plains);
        let (status, min) = partition(&mut map, &[4], 3);
        assert_eq!(status, SolveStatus::Optimal);
        assert_eq!(min, 9);
        assert!(map.tiles.iter().all(|t| t.owner == Some(4)));
    }
}
