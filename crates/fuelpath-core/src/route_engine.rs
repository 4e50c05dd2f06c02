//! Fuel-optimal route search over an elevation surface.
//!
//! Best-first (A*-family) search on a lattice of points spaced `grid_step`
//! apart, priced by [`FuelModel`] in the planning phase. Closed cells are
//! never reopened and superseded open entries are dropped lazily, so this is
//! an approximate best-first search rather than a provably optimal A*.
//! The search never fails hard: when the goal is not reached within the
//! iteration budget the caller gets the most promising partial path.

use crate::error::ConfigError;
use crate::fuel::{CostPhase, FuelModel};
use crate::models::Point;
use crate::surface::ElevationField;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Neighbour pattern used when expanding a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Neighborhood {
    /// Eight grid offsets, `grid_step` apart.
    Grid8,
    /// `directions` evenly spaced points on a circle of `radius`.
    Radial { directions: usize, radius: f64 },
}

impl Neighborhood {
    fn offsets(&self, grid_step: f64) -> Vec<(f64, f64)> {
        match *self {
            Neighborhood::Grid8 => {
                let s = grid_step;
                vec![
                    (s, 0.0),
                    (-s, 0.0),
                    (0.0, s),
                    (0.0, -s),
                    (s, s),
                    (-s, -s),
                    (s, -s),
                    (-s, s),
                ]
            }
            Neighborhood::Radial { directions, radius } => (0..directions)
                .map(|i| {
                    let angle = std::f64::consts::TAU * i as f64 / directions as f64;
                    (radius * angle.cos(), radius * angle.sin())
                })
                .collect(),
        }
    }

    /// Side of the square used to key open/closed cells. Grid8 keys by
    /// lattice index. Radial points closer than `spacing` never occur between
    /// a node, its parent and its siblings; at half that spacing they always
    /// differ by a full cell on some axis.
    fn cell_size(&self, grid_step: f64) -> f64 {
        match *self {
            Neighborhood::Grid8 => grid_step,
            Neighborhood::Radial { directions, radius } => {
                let chord = 2.0 * (std::f64::consts::PI / directions as f64).sin();
                radius * chord.min(1.0) / 2.0
            }
        }
    }

    /// Distance covered by one expansion.
    fn reach(&self, grid_step: f64) -> f64 {
        match *self {
            Neighborhood::Grid8 => grid_step,
            Neighborhood::Radial { radius, .. } => radius,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Lattice spacing; endpoints are snapped to multiples of this
    pub grid_step: f64,
    /// Heuristic weight in [0, 1]; 0 degrades to uniform-cost search
    pub heuristic_weight: f64,
    pub max_iterations: usize,
    pub neighborhood: Neighborhood,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            grid_step: 10.0,
            heuristic_weight: 1.0,
            max_iterations: 100_000,
            neighborhood: Neighborhood::Grid8,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid_step.is_finite() && self.grid_step > 0.0) {
            return Err(ConfigError::out_of_range("grid_step", "positive", self.grid_step));
        }
        if !(0.0..=1.0).contains(&self.heuristic_weight) {
            return Err(ConfigError::out_of_range(
                "heuristic_weight",
                "in [0, 1]",
                self.heuristic_weight,
            ));
        }
        if let Neighborhood::Radial { directions, radius } = self.neighborhood {
            if directions < 3 {
                return Err(ConfigError::out_of_range(
                    "neighborhood.directions",
                    "at least 3",
                    directions as f64,
                ));
            }
            if !(radius.is_finite() && radius > 0.0) {
                return Err(ConfigError::out_of_range("neighborhood.radius", "positive", radius));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    /// A node within one step of the goal was closed.
    GoalReached,
    /// Budget or frontier ran out; the path is a best-effort prefix.
    Exhausted,
    /// Start or goal has no elevation data; the path is empty.
    InvalidEndpoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub outcome: SearchOutcome,
    pub waypoints: Vec<Point>,
    /// Accumulated planning fuel of the last waypoint
    pub total_fuel: f64,
    pub iterations: usize,
    pub nodes_expanded: usize,
}

impl SearchResult {
    pub fn reached_goal(&self) -> bool {
        self.outcome == SearchOutcome::GoalReached
    }

    fn invalid_endpoint() -> Self {
        Self {
            outcome: SearchOutcome::InvalidEndpoint,
            waypoints: Vec::new(),
            total_fuel: 0.0,
            iterations: 0,
            nodes_expanded: 0,
        }
    }
}

type Cell = (i64, i64);

fn cell_of(point: Point, size: f64) -> Cell {
    ((point.x / size).round() as i64, (point.y / size).round() as i64)
}

/// Snap `point` to the nearest multiple of `step` on each axis.
pub fn quantize(point: Point, step: f64) -> Point {
    Point::new(
        (point.x / step).round() * step,
        (point.y / step).round() * step,
    )
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct SearchNode {
    position: Point,
    g: f64,
    parent: Option<usize>,
}

/// Heap entry; `index` doubles as insertion order so equal priorities pop
/// first-in first-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    f_score: FloatOrd,
    index: usize,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.index.cmp(&other.index))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathSearchEngine {
    model: FuelModel,
    config: SearchConfig,
}

impl PathSearchEngine {
    pub fn new(model: FuelModel, config: SearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { model, config })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn model(&self) -> &FuelModel {
        &self.model
    }

    /// Search with the configured iteration budget.
    pub fn find_path<F>(&self, field: &F, start: Point, goal: Point) -> SearchResult
    where
        F: ElevationField + ?Sized,
    {
        self.find_path_with_budget(field, start, goal, self.config.max_iterations)
    }

    pub fn find_path_with_budget<F>(
        &self,
        field: &F,
        start: Point,
        goal: Point,
        max_iterations: usize,
    ) -> SearchResult
    where
        F: ElevationField + ?Sized,
    {
        let step = self.config.grid_step;
        let start = quantize(start, step);
        let goal = quantize(goal, step);

        if field.elevation_at(start).is_none() || field.elevation_at(goal).is_none() {
            tracing::warn!(%start, %goal, "start or goal has no elevation data");
            return SearchResult::invalid_endpoint();
        }

        let offsets = self.config.neighborhood.offsets(step);
        let reach = self.config.neighborhood.reach(step);
        let cell_size = self.config.neighborhood.cell_size(step);
        let cell_key = |point: Point| cell_of(point, cell_size);
        let per_unit = self.model.min_cost_per_unit();
        let weight = self.config.heuristic_weight;
        let heuristic = |point: Point| point.distance(goal) * per_unit;

        let mut nodes = vec![SearchNode {
            position: start,
            g: 0.0,
            parent: None,
        }];
        let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
        open_set.push(Reverse(OpenNode {
            f_score: FloatOrd(heuristic(start) * weight),
            index: 0,
        }));
        let mut best_open_g: HashMap<Cell, f64> = HashMap::from([(cell_key(start), 0.0)]);
        let mut closed_set: HashSet<Cell> = HashSet::new();
        let mut nodes_expanded = 0usize;
        let mut iterations = 0usize;

        while iterations < max_iterations {
            let Some(Reverse(entry)) = open_set.pop() else {
                break;
            };
            iterations += 1;

            let current = nodes[entry.index];
            let current_cell = cell_key(current.position);
            if !closed_set.insert(current_cell) {
                continue;
            }
            best_open_g.remove(&current_cell);
            nodes_expanded += 1;

            if current.position.distance(goal) < reach {
                tracing::debug!(
                    iterations,
                    expanded = nodes_expanded,
                    fuel = current.g,
                    "route search reached goal"
                );
                return SearchResult {
                    outcome: SearchOutcome::GoalReached,
                    waypoints: reconstruct(&nodes, entry.index),
                    total_fuel: current.g,
                    iterations,
                    nodes_expanded,
                };
            }

            for (dx, dy) in &offsets {
                let next = current.position.offset(*dx, *dy);
                let next_cell = cell_key(next);
                if closed_set.contains(&next_cell) {
                    continue;
                }
                let Some(cost) =
                    self.model
                        .step_cost(field, current.position, next, CostPhase::Planning)
                else {
                    continue;
                };

                let tentative_g = current.g + cost.fuel;
                if best_open_g
                    .get(&next_cell)
                    .is_some_and(|known| *known <= tentative_g)
                {
                    continue;
                }
                best_open_g.insert(next_cell, tentative_g);

                let index = nodes.len();
                nodes.push(SearchNode {
                    position: next,
                    g: tentative_g,
                    parent: Some(entry.index),
                });
                open_set.push(Reverse(OpenNode {
                    f_score: FloatOrd(tentative_g + heuristic(next) * weight),
                    index,
                }));
            }
        }

        // Furthest progress among live open entries, else the start itself.
        let fallback = open_set
            .iter()
            .map(|Reverse(entry)| entry.index)
            .filter(|&index| {
                let node = &nodes[index];
                let cell = cell_key(node.position);
                !closed_set.contains(&cell)
                    && best_open_g.get(&cell).map_or(true, |best| node.g <= *best)
            })
            .max_by(|&a, &b| nodes[a].g.total_cmp(&nodes[b].g).then_with(|| b.cmp(&a)))
            .unwrap_or(0);

        tracing::warn!(
            iterations,
            open = open_set.len(),
            expanded = nodes_expanded,
            "route search did not reach goal, returning partial path"
        );

        SearchResult {
            outcome: SearchOutcome::Exhausted,
            waypoints: reconstruct(&nodes, fallback),
            total_fuel: nodes[fallback].g,
            iterations,
            nodes_expanded,
        }
    }
}

fn reconstruct(nodes: &[SearchNode], last: usize) -> Vec<Point> {
    let mut path = Vec::new();
    let mut current = Some(last);
    while let Some(index) = current {
        path.push(nodes[index].position);
        current = nodes[index].parent;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuel::{FuelModelConfig, Sampling};
    use crate::surface::{ElevationSurface, FnField};

    /// 100x60 flat field with a plateau of height 10 over x in [40, 60), y < 40.
    fn plateau() -> ElevationSurface {
        let (width, height) = (100, 60);
        let values = (0..width * height)
            .map(|idx| {
                let (x, y) = (idx % width, idx / width);
                if (40..60).contains(&x) && y < 40 {
                    10.0
                } else {
                    0.0
                }
            })
            .collect();
        ElevationSurface::from_elevations(width, height, values).unwrap()
    }

    fn engine(config: SearchConfig) -> PathSearchEngine {
        PathSearchEngine::new(FuelModel::default(), config).unwrap()
    }

    #[test]
    fn quantize_rounds_to_nearest_multiple() {
        assert_eq!(quantize(Point::new(14.9, 15.0), 10.0), Point::new(10.0, 20.0));
        assert_eq!(quantize(Point::new(-4.0, 96.0), 10.0), Point::new(-0.0, 100.0));
    }

    #[test]
    fn same_cell_returns_quantized_start() {
        let surface = ElevationSurface::flat(50, 50, 0.0).unwrap();
        let result = engine(SearchConfig::default()).find_path(
            &surface,
            Point::new(21.0, 19.0),
            Point::new(18.0, 23.0),
        );
        assert!(result.reached_goal());
        assert_eq!(result.waypoints, vec![Point::new(20.0, 20.0)]);
        assert_eq!(result.total_fuel, 0.0);
    }

    #[test]
    fn invalid_endpoint_returns_empty_path() {
        let surface = ElevationSurface::flat(50, 50, 0.0).unwrap();
        let engine = engine(SearchConfig::default());
        let outside_goal = engine.find_path(&surface, Point::new(10.0, 10.0), Point::new(80.0, 10.0));
        assert_eq!(outside_goal.outcome, SearchOutcome::InvalidEndpoint);
        assert!(outside_goal.waypoints.is_empty());

        let outside_start = engine.find_path(&surface, Point::new(-30.0, 10.0), Point::new(10.0, 10.0));
        assert!(outside_start.waypoints.is_empty());
    }

    #[test]
    fn detours_around_plateau() {
        let surface = plateau();
        let result = engine(SearchConfig::default()).find_path(
            &surface,
            Point::new(10.0, 10.0),
            Point::new(90.0, 10.0),
        );
        assert!(result.reached_goal());
        assert_eq!(result.waypoints.first(), Some(&Point::new(10.0, 10.0)));
        assert_eq!(result.waypoints.last(), Some(&Point::new(90.0, 10.0)));
        // Straight over the plateau costs 12.0.
        assert!(result.total_fuel < 11.0, "fuel {}", result.total_fuel);
        assert!(result
            .waypoints
            .iter()
            .all(|p| !((40.0..60.0).contains(&p.x) && p.y < 40.0)));
    }

    #[test]
    fn search_is_idempotent() {
        let surface = plateau();
        let engine = engine(SearchConfig::default());
        let first = engine.find_path(&surface, Point::new(0.0, 0.0), Point::new(90.0, 30.0));
        let second = engine.find_path(&surface, Point::new(0.0, 0.0), Point::new(90.0, 30.0));
        assert_eq!(first.waypoints, second.waypoints);
        assert_eq!(first.total_fuel, second.total_fuel);
        assert_eq!(first.iterations, second.iterations);
    }

    #[test]
    fn heuristic_weight_changes_effort_not_cost() {
        let surface = plateau();
        let start = Point::new(10.0, 10.0);
        let goal = Point::new(90.0, 10.0);
        let astar = engine(SearchConfig::default()).find_path(&surface, start, goal);
        let uniform = engine(SearchConfig {
            heuristic_weight: 0.0,
            ..SearchConfig::default()
        })
        .find_path(&surface, start, goal);

        assert!(astar.reached_goal() && uniform.reached_goal());
        assert!((astar.total_fuel - uniform.total_fuel).abs() < 1e-9);
        assert!(uniform.nodes_expanded >= astar.nodes_expanded);
    }

    #[test]
    fn larger_budget_never_worsens_result() {
        let surface = plateau();
        let engine = engine(SearchConfig::default());
        let start = Point::new(10.0, 10.0);
        let goal = Point::new(90.0, 10.0);
        let full = engine.find_path(&surface, start, goal);
        assert!(full.reached_goal());

        let mut reached = false;
        for budget in [0, 1, 3, 10, 30, 100, 300, 1_000, 10_000] {
            let result = engine.find_path_with_budget(&surface, start, goal, budget);
            assert_eq!(result.waypoints.first(), Some(&start));
            if reached {
                assert!(result.reached_goal(), "budget {budget} lost the goal");
            }
            if result.reached_goal() {
                reached = true;
                assert!((result.total_fuel - full.total_fuel).abs() < 1e-9);
            }
        }
        assert!(reached);
    }

    #[test]
    fn zero_budget_returns_start_only() {
        let surface = ElevationSurface::flat(50, 50, 0.0).unwrap();
        let result = engine(SearchConfig::default()).find_path_with_budget(
            &surface,
            Point::new(0.0, 0.0),
            Point::new(40.0, 40.0),
            0,
        );
        assert_eq!(result.outcome, SearchOutcome::Exhausted);
        assert_eq!(result.waypoints, vec![Point::new(0.0, 0.0)]);
    }

    #[test]
    fn walled_off_goal_yields_partial_path() {
        // A no-data band over 45 <= x < 55 splits the field in two.
        let field = FnField(|p: Point| {
            let inside = (0.0..100.0).contains(&p.x) && (0.0..100.0).contains(&p.y);
            (inside && !(45.0..55.0).contains(&p.x)).then_some(0.0)
        });
        let result = engine(SearchConfig::default()).find_path(
            &field,
            Point::new(10.0, 50.0),
            Point::new(90.0, 50.0),
        );
        // The reachable side is fully explored and nothing is left open.
        assert_eq!(result.outcome, SearchOutcome::Exhausted);
        assert_eq!(result.waypoints, vec![Point::new(10.0, 50.0)]);

        let partial = engine(SearchConfig::default()).find_path_with_budget(
            &field,
            Point::new(10.0, 50.0),
            Point::new(90.0, 50.0),
            15,
        );
        assert_eq!(partial.outcome, SearchOutcome::Exhausted);
        assert!(partial.waypoints.len() > 1);
        assert_eq!(partial.waypoints.first(), Some(&Point::new(10.0, 50.0)));
        assert!(partial.waypoints.iter().all(|p| p.x < 45.0));
    }

    #[test]
    fn radial_neighborhood_reaches_goal() {
        let surface = ElevationSurface::flat(200, 200, 0.0).unwrap();
        let result = engine(SearchConfig {
            neighborhood: Neighborhood::Radial {
                directions: 16,
                radius: 10.0,
            },
            ..SearchConfig::default()
        })
        .find_path(&surface, Point::new(20.0, 20.0), Point::new(150.0, 90.0));
        assert!(result.reached_goal());
        let last = *result.waypoints.last().unwrap();
        assert!(last.distance(Point::new(150.0, 90.0)) < 10.0);
    }

    #[test]
    fn rejects_invalid_config() {
        for config in [
            SearchConfig {
                grid_step: 0.0,
                ..SearchConfig::default()
            },
            SearchConfig {
                heuristic_weight: 1.5,
                ..SearchConfig::default()
            },
            SearchConfig {
                neighborhood: Neighborhood::Radial {
                    directions: 2,
                    radius: 5.0,
                },
                ..SearchConfig::default()
            },
        ] {
            assert!(PathSearchEngine::new(FuelModel::default(), config).is_err());
        }
    }

    #[test]
    fn sub_unit_grid_step_reaches_goal() {
        let surface = ElevationSurface::flat(50, 50, 0.0).unwrap();
        let result = engine(SearchConfig {
            grid_step: 0.4,
            ..SearchConfig::default()
        })
        .find_path(&surface, Point::new(1.0, 1.0), Point::new(10.0, 1.0));

        assert!(result.reached_goal(), "{:?} after {} iterations", result.outcome, result.iterations);
        let goal = quantize(Point::new(10.0, 1.0), 0.4);
        let last = *result.waypoints.last().unwrap();
        assert!(last.distance(goal) < 0.4 + 1e-9);
        assert!(result.waypoints.len() >= 22);
        assert!(result.waypoints.iter().all(|p| (p.y - 1.2).abs() < 1e-9));
        assert!(result.total_fuel > 0.84 - 1e-9 && result.total_fuel < 0.88 + 1e-9);
    }

    #[test]
    fn small_radius_radial_search_expands() {
        let surface = ElevationSurface::flat(20, 20, 0.0).unwrap();
        let result = engine(SearchConfig {
            grid_step: 0.5,
            neighborhood: Neighborhood::Radial {
                directions: 8,
                radius: 0.5,
            },
            ..SearchConfig::default()
        })
        .find_path(&surface, Point::new(1.0, 1.0), Point::new(5.0, 1.0));
        assert!(result.reached_goal());
        assert!(result.waypoints.len() > 2);
    }

    #[test]
    fn equal_priorities_pop_in_insertion_order() {
        // (10,0) and (10,10) both lead to (20,10) at the same cost; the
        // straight neighbour is pushed first and therefore wins.
        let surface = ElevationSurface::flat(50, 50, 0.0).unwrap();
        let result = engine(SearchConfig::default()).find_path(
            &surface,
            Point::new(0.0, 0.0),
            Point::new(20.0, 10.0),
        );
        assert!(result.reached_goal());
        assert_eq!(
            result.waypoints,
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(20.0, 10.0)]
        );
    }

    #[test]
    fn cheaper_rediscovery_replaces_first_entry() {
        // A one-pixel spike on the straight line makes (0,0) -> (10,0) cost 11,
        // while a dogleg around it costs about 2.41.
        let field = FnField(|p: Point| {
            let inside = (0.0..50.0).contains(&p.x) && (0.0..50.0).contains(&p.y);
            let spike = (5.0..6.0).contains(&p.x) && (0.0..1.0).contains(&p.y);
            inside.then_some(if spike { 10.0 } else { 0.0 })
        });
        let model = FuelModel::new(FuelModelConfig {
            planning_slope_penalty: 5.0,
            planning_sampling: Sampling::SubSteps { step: 1.0 },
            ..FuelModelConfig::default()
        })
        .unwrap();
        let start = Point::new(0.0, 0.0);
        let goal = Point::new(10.0, 0.0);
        let direct = model
            .step_cost(&field, start, goal, CostPhase::Planning)
            .unwrap();
        assert!((direct.fuel - 11.0).abs() < 1e-9);

        let result = PathSearchEngine::new(model, SearchConfig::default())
            .unwrap()
            .find_path(&field, start, goal);
        assert!(result.reached_goal());
        assert_eq!(result.waypoints.len(), 3);
        assert_eq!(result.waypoints.last(), Some(&goal));
        assert!(result.total_fuel < 2.5, "fuel {}", result.total_fuel);
    }
}
