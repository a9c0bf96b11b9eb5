use tracing::debug;

use crate::map::tile::Improvement;
use crate::map::{HexGrid, Map};
use crate::scoring::{base_adjacency, scale_adjacency, unscale_adjacency};
use crate::solver::{LinearExpr, Model, Solution, VarId};

#[derive(Debug, Clone, Copy)]
pub struct CampusOptions {
    /// Solver units per adjacency point.
    pub scale: u32,
    /// Unscaled bonus a campus gets from each adjacent campus.
    pub neighbor_bonus: f64,
    /// A campus's owner must be a city within this many tiles.
    pub owner_radius: u32,
    /// Exact number of campuses, when fixed.
    pub campus_count: Option<u32>,
    /// Campus cap per owning city; 0 disables the cap.
    pub per_city: u32,
    /// Keep owners already on the map (from region partition) instead of
    /// choosing among all cities in range.
    pub keep_existing_owners: bool,
}

/// Owner assignment for one tile: candidate city indices and one boolean each.
#[derive(Debug)]
struct Ownership {
    candidates: Vec<usize>,
    assign: Vec<VarId>,
    owner: VarId,
}

/// Campus placement with chained adjacency and a distance-bounded owner.
///
/// `score[t]` equals the tile's scaled base adjacency plus the scaled bonus
/// of every adjacent campus when `t` hosts a campus, and 0 otherwise. Each
/// pair of neighboring hosts gets a `both` variable bounded by the two
/// campus booleans, so the chaining bonus stays linear without big-M rows.
#[derive(Debug)]
pub struct CampusSiting {
    model: Model,
    scale: u32,
    campus: Vec<VarId>,
    score: Vec<VarId>,
    ownership: Vec<Option<Ownership>>,
    keep_existing_owners: bool,
}

impl CampusSiting {
    pub fn build(map: &Map, grid: &HexGrid, cities: &[usize], options: &CampusOptions) -> Self {
        let n = map.tiles.len();
        let base: Vec<i64> = (0..n)
            .map(|t| scale_adjacency(base_adjacency(map, grid, t), options.scale))
            .collect();
        let bonus = scale_adjacency(options.neighbor_bonus, options.scale);
        let max_score = base.iter().copied().max().unwrap_or(0) + 6 * bonus;

        let mut model = Model::new();
        let campus: Vec<VarId> = (0..n)
            .map(|t| model.new_bool(format!("campus_{}", t)))
            .collect();
        let score: Vec<VarId> = (0..n)
            .map(|t| model.new_real(0, max_score, format!("campus_adj_{}", t)))
            .collect();

        let ownership = (0..n)
            .map(|t| {
                let candidates = owner_candidates(map, grid, cities, t, options);
                if candidates.is_empty() {
                    return None;
                }
                let assign = candidates
                    .iter()
                    .map(|c| model.new_bool(format!("owner_{}_{}", t, c)))
                    .collect();
                let lo = candidates.iter().copied().min().unwrap_or(0) as i64;
                let hi = candidates.iter().copied().max().unwrap_or(0) as i64;
                let owner = model.new_real(lo, hi, format!("owner_{}", t));
                Some(Ownership {
                    candidates,
                    assign,
                    owner,
                })
            })
            .collect();

        let mut siting = Self {
            model,
            scale: options.scale,
            campus,
            score,
            ownership,
            keep_existing_owners: options.keep_existing_owners,
        };
        let hosts: Vec<bool> = (0..n).map(|t| siting.can_host(map, t)).collect();

        siting.exclude_hosts(&hosts);
        siting.link_scores(grid, &hosts, &base, bonus);
        siting.assign_owners();
        if options.per_city > 0 {
            siting.cap_per_city(cities, &hosts, options.per_city);
        }
        if let Some(count) = options.campus_count {
            siting
                .model
                .add_eq(LinearExpr::sum(siting.campus.iter().copied()), count as i64);
        }
        siting
            .model
            .maximize(LinearExpr::sum(siting.score.iter().copied()));

        debug!(
            vars = siting.model.num_vars(),
            constraints = siting.model.num_constraints(),
            hosts = hosts.iter().filter(|&&h| h).count(),
            max_score,
            "Campus model built"
        );
        siting
    }

    /// Buildable, not a city, and some city can own it.
    fn can_host(&self, map: &Map, t: usize) -> bool {
        let tile = &map.tiles[t];
        !tile.base_terrain.is_unbuildable() && !tile.is_city() && self.ownership[t].is_some()
    }

    fn exclude_hosts(&mut self, hosts: &[bool]) {
        for (t, &host) in hosts.iter().enumerate() {
            if !host {
                self.model.fix(self.campus[t], 0);
                self.model.fix(self.score[t], 0);
            }
        }
    }

    /// score = base * campus + bonus * Σ both, with both <= campus on each
    /// side of the edge. Maximizing pushes every `both` up to the AND.
    fn link_scores(&mut self, grid: &HexGrid, hosts: &[bool], base: &[i64], bonus: i64) {
        let mut chained: Vec<Vec<VarId>> = vec![Vec::new(); hosts.len()];
        if bonus > 0 {
            for t in (0..hosts.len()).filter(|&t| hosts[t]) {
                for nb in grid.neighbors(t).filter(|&nb| nb > t && hosts[nb]) {
                    let both = self.model.new_real(0, 1, format!("campus_pair_{}_{}", t, nb));
                    self.model
                        .add_le(LinearExpr::from(both).term(self.campus[t], -1), 0);
                    self.model
                        .add_le(LinearExpr::from(both).term(self.campus[nb], -1), 0);
                    chained[t].push(both);
                    chained[nb].push(both);
                }
            }
        }

        for t in (0..hosts.len()).filter(|&t| hosts[t]) {
            let mut link = LinearExpr::from(self.score[t]).term(self.campus[t], -base[t]);
            for &both in &chained[t] {
                link.add_term(both, -bonus);
            }
            self.model.add_eq(link, 0);
        }
    }

    fn assign_owners(&mut self) {
        for ownership in self.ownership.iter().flatten() {
            self.model
                .add_eq(LinearExpr::sum(ownership.assign.iter().copied()), 1);

            let mut link = LinearExpr::from(ownership.owner);
            for (&city, &var) in ownership.candidates.iter().zip(&ownership.assign) {
                link.add_term(var, -(city as i64));
            }
            self.model.add_eq(link, 0);
        }
    }

    /// Σ campuses hosted per city <= cap. A campus with a single candidate
    /// owner counts against it directly. Otherwise `hosted <= assign` per
    /// candidate with Σ hosted = campus, which puts the campus on exactly
    /// the assigned owner.
    fn cap_per_city(&mut self, cities: &[usize], hosts: &[bool], cap: u32) {
        let mut hosted_by_city: Vec<LinearExpr> = vec![LinearExpr::new(); cities.len()];
        for (t, ownership) in self.ownership.iter().enumerate() {
            let Some(ownership) = ownership else { continue };
            if !hosts[t] {
                continue;
            }
            if let &[city] = ownership.candidates.as_slice() {
                if let Some(k) = cities.iter().position(|&c| c == city) {
                    hosted_by_city[k].add_term(self.campus[t], 1);
                }
                continue;
            }
            let mut split = LinearExpr::new().term(self.campus[t], -1);
            for (&city, &assign) in ownership.candidates.iter().zip(&ownership.assign) {
                let Some(k) = cities.iter().position(|&c| c == city) else {
                    continue;
                };
                let hosted = self.model.new_real(0, 1, format!("hosted_{}_{}", t, city));
                self.model.add_le(LinearExpr::from(hosted).term(assign, -1), 0);
                split.add_term(hosted, 1);
                hosted_by_city[k].add_term(hosted, 1);
            }
            self.model.add_eq(split, 0);
        }
        for expr in hosted_by_city {
            if !expr.terms.is_empty() {
                self.model.add_le(expr, cap as i64);
            }
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Mark campuses, write their science and the chosen owners. Region
    /// owners outside the campus owner radius are left alone.
    /// Returns the indices of the new campuses.
    pub fn apply(&self, map: &mut Map, solution: &Solution) -> Vec<usize> {
        let mut placed = Vec::new();
        for (t, tile) in map.tiles.iter_mut().enumerate() {
            if solution.is_true(self.campus[t]) {
                tile.improvement = Improvement::Campus;
                tile.science = unscale_adjacency(solution.value(self.score[t]), self.scale);
                placed.push(t);
            }
            match &self.ownership[t] {
                Some(o) => tile.owner = Some(solution.value(o.owner) as usize),
                None if !self.keep_existing_owners => tile.owner = None,
                None => {}
            }
        }
        placed
    }
}

/// Cities allowed to own tile `t`.
fn owner_candidates(
    map: &Map,
    grid: &HexGrid,
    cities: &[usize],
    t: usize,
    options: &CampusOptions,
) -> Vec<usize> {
    if options.keep_existing_owners {
        return map.tiles[t]
            .owner
            .filter(|&owner| cities.contains(&owner))
            .filter(|&owner| grid.distance(t, owner) <= options.owner_radius)
            .into_iter()
            .collect();
    }
    cities
        .iter()
        .copied()
        .filter(|&c| grid.distance(t, c) <= options.owner_radius)
        .collect()
}
