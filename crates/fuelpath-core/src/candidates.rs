//! Cheap alternative planner: random dogleg candidates, cheapest one wins.
//!
//! Each candidate is `[start, m1, m2, m3, end]` with the midpoints at 25, 50
//! and 75 percent of the straight line plus independent uniform jitter. Only
//! the straight segments between waypoints are priced; there is no terrain
//! avoidance beyond picking the cheapest candidate.

use crate::error::ConfigError;
use crate::fuel::{CostPhase, FuelModel};
use crate::models::Point;
use crate::surface::ElevationField;
use rand::Rng;
use serde::{Deserialize, Serialize};

const MIDPOINT_FRACTIONS: [f64; 3] = [0.25, 0.5, 0.75];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateConfig {
    /// Number of candidate paths generated per request
    pub candidates: usize,
    /// Max perturbation per axis, in surface units
    pub jitter: f64,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            candidates: 5,
            jitter: 20.0,
        }
    }
}

impl CandidateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.candidates == 0 {
            return Err(ConfigError::out_of_range("candidates", "at least 1", 0.0));
        }
        if !(self.jitter.is_finite() && self.jitter >= 0.0) {
            return Err(ConfigError::out_of_range("jitter", "non-negative", self.jitter));
        }
        Ok(())
    }
}

/// Outcome of [`CandidateEvaluator::best_path`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSelection {
    pub waypoints: Vec<Point>,
    /// Total planning fuel, `None` when no candidate was passable
    pub fuel: Option<f64>,
    pub evaluated: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateEvaluator {
    config: CandidateConfig,
}

impl CandidateEvaluator {
    pub fn new(config: CandidateConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CandidateConfig {
        &self.config
    }

    pub fn generate<R: Rng>(&self, start: Point, end: Point, rng: &mut R) -> Vec<Vec<Point>> {
        let jitter = self.config.jitter;
        (0..self.config.candidates)
            .map(|_| {
                let mut path = Vec::with_capacity(MIDPOINT_FRACTIONS.len() + 2);
                path.push(start);
                for t in MIDPOINT_FRACTIONS {
                    let base = start.lerp(end, t);
                    let (dx, dy) = if jitter > 0.0 {
                        (
                            rng.random_range(-jitter..=jitter),
                            rng.random_range(-jitter..=jitter),
                        )
                    } else {
                        (0.0, 0.0)
                    };
                    path.push(base.offset(dx, dy));
                }
                path.push(end);
                path
            })
            .collect()
    }

    /// Sum of planning fuel over consecutive waypoint pairs, or `None` if any
    /// segment touches missing elevation. Each segment is priced from its two
    /// endpoints only.
    pub fn path_cost<F>(&self, model: &FuelModel, field: &F, path: &[Point]) -> Option<f64>
    where
        F: ElevationField + ?Sized,
    {
        path.windows(2).try_fold(0.0, |total, pair| {
            let cost = model.endpoint_cost(field, pair[0], pair[1], CostPhase::Planning)?;
            Some(total + cost.fuel)
        })
    }

    /// Generate candidates and return the cheapest; ties keep the first.
    pub fn best_path<F, R>(
        &self,
        model: &FuelModel,
        field: &F,
        start: Point,
        end: Point,
        rng: &mut R,
    ) -> CandidateSelection
    where
        F: ElevationField + ?Sized,
        R: Rng,
    {
        self.select(model, field, self.generate(start, end, rng))
    }

    /// Pick the cheapest passable path from `candidates`. Ties keep the
    /// earliest; with nothing passable the first candidate is returned with
    /// `fuel: None`.
    pub fn select<F>(&self, model: &FuelModel, field: &F, candidates: Vec<Vec<Point>>) -> CandidateSelection
    where
        F: ElevationField + ?Sized,
    {
        let evaluated = candidates.len();

        let mut best: Option<(usize, f64)> = None;
        for (idx, path) in candidates.iter().enumerate() {
            let Some(cost) = self.path_cost(model, field, path) else {
                tracing::debug!(candidate = idx, "candidate crosses missing terrain");
                continue;
            };
            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some((idx, cost));
            }
        }

        let (idx, fuel) = match best {
            Some((idx, cost)) => (idx, Some(cost)),
            None => {
                tracing::warn!(evaluated, "no passable candidate path");
                (0, None)
            }
        };

        CandidateSelection {
            waypoints: candidates.into_iter().nth(idx).unwrap_or_default(),
            fuel,
            evaluated,
        }
    }
}
