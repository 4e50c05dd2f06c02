//! Slope-based fuel and speed model.
//!
//! The same [`FuelModel`] prices edges for the planners and meters fuel for the
//! motion controller, so budgets computed at planning time hold at execution
//! time. Each phase has its own slope penalty and sampling policy.

use crate::error::ConfigError;
use crate::models::Point;
use crate::surface::ElevationField;
use serde::{Deserialize, Serialize};

/// Upper bound on probes taken along one segment.
const MAX_SUB_STEPS: usize = 100_000;

/// Which consumer is asking for a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostPhase {
    Planning,
    Execution,
}

/// How elevation is sampled along a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Sampling {
    /// Only the two endpoints.
    Endpoints,
    /// Walk the segment in probes of at most `step` units.
    SubSteps { step: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelModelConfig {
    /// Fuel per unit of flat distance
    pub base_fuel_rate: f64,
    /// Slope penalty per elevation unit when planning
    pub planning_slope_penalty: f64,
    /// Slope penalty per elevation unit when moving
    pub execution_slope_penalty: f64,
    /// Exponential decay rate of speed with |slope|
    pub speed_throttle: f64,
    /// Asymptotic floor of the speed multiplier (never reached)
    pub min_speed_multiplier: f64,
    pub planning_sampling: Sampling,
    pub execution_sampling: Sampling,
}

impl Default for FuelModelConfig {
    fn default() -> Self {
        Self {
            base_fuel_rate: 0.1,
            planning_slope_penalty: 0.2,
            execution_slope_penalty: 0.2,
            speed_throttle: 0.5,
            min_speed_multiplier: 0.01,
            planning_sampling: Sampling::Endpoints,
            execution_sampling: Sampling::Endpoints,
        }
    }
}

impl FuelModelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_fuel_rate.is_finite() && self.base_fuel_rate > 0.0) {
            return Err(ConfigError::out_of_range(
                "base_fuel_rate",
                "positive",
                self.base_fuel_rate,
            ));
        }
        for (field, value) in [
            ("planning_slope_penalty", self.planning_slope_penalty),
            ("execution_slope_penalty", self.execution_slope_penalty),
            ("speed_throttle", self.speed_throttle),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::out_of_range(field, "non-negative", value));
            }
        }
        if !(self.min_speed_multiplier > 0.0 && self.min_speed_multiplier < 1.0) {
            return Err(ConfigError::out_of_range(
                "min_speed_multiplier",
                "in (0, 1)",
                self.min_speed_multiplier,
            ));
        }
        for (field, sampling) in [
            ("planning_sampling.step", self.planning_sampling),
            ("execution_sampling.step", self.execution_sampling),
        ] {
            if let Sampling::SubSteps { step } = sampling {
                if !(step.is_finite() && step > 0.0) {
                    return Err(ConfigError::out_of_range(field, "positive", step));
                }
            }
        }
        Ok(())
    }
}

/// Price of one directed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepCost {
    pub fuel: f64,
    /// Fraction of flat-ground speed achievable on this step
    pub speed_multiplier: f64,
    pub distance: f64,
}

impl StepCost {
    pub const ZERO: StepCost = StepCost {
        fuel: 0.0,
        speed_multiplier: 1.0,
        distance: 0.0,
    };
}

#[derive(Debug, Clone, Default)]
pub struct FuelModel {
    config: FuelModelConfig,
}

impl FuelModel {
    pub fn new(config: FuelModelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FuelModelConfig {
        &self.config
    }

    /// Lower bound on fuel per unit distance. Slope factors are `>= 1`, so
    /// straight-line distance scaled by this never overestimates.
    pub fn min_cost_per_unit(&self) -> f64 {
        self.config.base_fuel_rate
    }

    fn slope_penalty(&self, phase: CostPhase) -> f64 {
        match phase {
            CostPhase::Planning => self.config.planning_slope_penalty,
            CostPhase::Execution => self.config.execution_slope_penalty,
        }
    }

    fn sampling(&self, phase: CostPhase) -> Sampling {
        match phase {
            CostPhase::Planning => self.config.planning_sampling,
            CostPhase::Execution => self.config.execution_sampling,
        }
    }

    /// `1 + |slope| * penalty` for the given phase.
    pub fn slope_factor(&self, slope: f64, phase: CostPhase) -> f64 {
        1.0 + slope.abs() * self.slope_penalty(phase)
    }

    /// Speed multiplier in `(min_speed_multiplier, 1]`; exactly 1 on flat ground.
    pub fn speed_multiplier(&self, slope: f64) -> f64 {
        let floor = self.config.min_speed_multiplier;
        let value = floor + (1.0 - floor) * (-slope.abs() * self.config.speed_throttle).exp();
        if value > floor {
            value
        } else {
            // The exponential underflowed; stay one ulp above the floor.
            f64::from_bits(floor.to_bits() + 1)
        }
    }

    /// Fuel and speed for moving from `from` to `to`, or `None` when any
    /// sampled elevation is missing (the step is impassable).
    pub fn step_cost<F>(&self, field: &F, from: Point, to: Point, phase: CostPhase) -> Option<StepCost>
    where
        F: ElevationField + ?Sized,
    {
        let distance = from.distance(to);
        if !distance.is_finite() {
            return None;
        }
        if distance <= f64::EPSILON {
            return Some(StepCost::ZERO);
        }

        match self.sampling(phase) {
            Sampling::SubSteps { step } if distance > step => {
                let count = ((distance / step).ceil() as usize).clamp(1, MAX_SUB_STEPS);
                let mut fuel = 0.0;
                let mut weighted_multiplier = 0.0;
                let mut cursor = from;
                for i in 1..=count {
                    let next = if i == count {
                        to
                    } else {
                        from.lerp(to, i as f64 / count as f64)
                    };
                    let part = self.segment_cost(field, cursor, next, phase)?;
                    fuel += part.fuel;
                    weighted_multiplier += part.speed_multiplier * part.distance;
                    cursor = next;
                }
                Some(StepCost {
                    fuel,
                    speed_multiplier: weighted_multiplier / distance,
                    distance,
                })
            }
            _ => self.segment_cost(field, from, to, phase),
        }
    }

    /// Like [`FuelModel::step_cost`] but always samples only the two
    /// endpoints, whatever the phase's sampling policy.
    pub fn endpoint_cost<F>(&self, field: &F, from: Point, to: Point, phase: CostPhase) -> Option<StepCost>
    where
        F: ElevationField + ?Sized,
    {
        let distance = from.distance(to);
        if !distance.is_finite() {
            return None;
        }
        if distance <= f64::EPSILON {
            return Some(StepCost::ZERO);
        }
        self.segment_cost(field, from, to, phase)
    }

    fn segment_cost<F>(&self, field: &F, from: Point, to: Point, phase: CostPhase) -> Option<StepCost>
    where
        F: ElevationField + ?Sized,
    {
        let from_elevation = field.elevation_at(from)?;
        let to_elevation = field.elevation_at(to)?;
        let distance = from.distance(to);
        let slope = to_elevation - from_elevation;
        Some(StepCost {
            fuel: self.config.base_fuel_rate * distance * self.slope_factor(slope, phase),
            speed_multiplier: self.speed_multiplier(slope),
            distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{ElevationSurface, FnField};

    fn step_surface() -> ElevationSurface {
        // Left half at 0, right half at 5.
        let values = (0..40 * 10)
            .map(|idx| if idx % 40 < 20 { 0.0 } else { 5.0 })
            .collect();
        ElevationSurface::from_elevations(40, 10, values).unwrap()
    }

    #[test]
    fn self_step_is_free() {
        let model = FuelModel::default();
        let surface = step_surface();
        let p = Point::new(3.0, 3.0);
        for phase in [CostPhase::Planning, CostPhase::Execution] {
            let cost = model.step_cost(&surface, p, p, phase).unwrap();
            assert_eq!(cost.fuel, 0.0);
            assert_eq!(cost.speed_multiplier, 1.0);
        }
    }

    #[test]
    fn flat_step_costs_base_rate_times_distance() {
        let model = FuelModel::default();
        let surface = ElevationSurface::flat(50, 50, 0.0).unwrap();
        let cost = model
            .step_cost(&surface, Point::new(0.0, 0.0), Point::new(30.0, 40.0), CostPhase::Planning)
            .unwrap();
        assert!((cost.fuel - 5.0).abs() < 1e-12);
        assert_eq!(cost.speed_multiplier, 1.0);
    }

    #[test]
    fn slope_raises_fuel_and_lowers_speed() {
        let model = FuelModel::default();
        let surface = step_surface();
        let cost = model
            .step_cost(&surface, Point::new(19.0, 1.0), Point::new(20.0, 1.0), CostPhase::Planning)
            .unwrap();
        // slope 5 -> factor 2
        assert!((cost.fuel - 0.2).abs() < 1e-12);
        assert!(cost.speed_multiplier < 1.0);
        assert!(cost.speed_multiplier > model.config().min_speed_multiplier);
    }

    #[test]
    fn missing_elevation_makes_step_impassable() {
        let model = FuelModel::default();
        let surface = step_surface();
        assert!(model
            .step_cost(&surface, Point::new(1.0, 1.0), Point::new(-1.0, 1.0), CostPhase::Planning)
            .is_none());
        assert!(model
            .step_cost(&surface, Point::new(45.0, 1.0), Point::new(1.0, 1.0), CostPhase::Execution)
            .is_none());
    }

    #[test]
    fn sub_steps_catch_holes_that_endpoints_miss() {
        let holey = FnField(|p: Point| {
            if (4.0..6.0).contains(&p.x) {
                None
            } else {
                Some(0.0)
            }
        });
        let endpoints = FuelModel::default();
        let probing = FuelModel::new(FuelModelConfig {
            planning_sampling: Sampling::SubSteps { step: 1.0 },
            ..FuelModelConfig::default()
        })
        .unwrap();

        let from = Point::new(0.0, 0.0);
        let to = Point::new(10.0, 0.0);
        assert!(endpoints.step_cost(&holey, from, to, CostPhase::Planning).is_some());
        assert!(probing.step_cost(&holey, from, to, CostPhase::Planning).is_none());
    }

    #[test]
    fn sub_steps_sum_to_endpoint_cost_on_flat_ground() {
        let surface = ElevationSurface::flat(20, 20, 2.0).unwrap();
        let model = FuelModel::new(FuelModelConfig {
            execution_sampling: Sampling::SubSteps { step: 0.75 },
            ..FuelModelConfig::default()
        })
        .unwrap();
        let cost = model
            .step_cost(&surface, Point::new(1.0, 1.0), Point::new(11.0, 1.0), CostPhase::Execution)
            .unwrap();
        assert!((cost.fuel - 1.0).abs() < 1e-9);
        assert!((cost.speed_multiplier - 1.0).abs() < 1e-12);
    }

    #[test]
    fn phases_use_independent_penalties() {
        let model = FuelModel::new(FuelModelConfig {
            planning_slope_penalty: 0.2,
            execution_slope_penalty: 2.0,
            ..FuelModelConfig::default()
        })
        .unwrap();
        let surface = step_surface();
        let from = Point::new(19.0, 1.0);
        let to = Point::new(20.0, 1.0);
        let planning = model.step_cost(&surface, from, to, CostPhase::Planning).unwrap();
        let execution = model.step_cost(&surface, from, to, CostPhase::Execution).unwrap();
        assert!(execution.fuel > planning.fuel);
        assert_eq!(execution.speed_multiplier, planning.speed_multiplier);
    }

    #[test]
    fn speed_multiplier_decreases_toward_floor() {
        let model = FuelModel::default();
        let floor = model.config().min_speed_multiplier;
        let mut previous = model.speed_multiplier(0.0);
        assert_eq!(previous, 1.0);
        for slope in 1..=40 {
            let current = model.speed_multiplier(slope as f64 * 0.5);
            assert!(current < previous);
            assert!(current > floor);
            previous = current;
        }
        assert_eq!(model.speed_multiplier(-3.0), model.speed_multiplier(3.0));
    }

    #[test]
    fn steep_throttle_stays_above_floor() {
        let model = FuelModel::new(FuelModelConfig {
            speed_throttle: 5.0,
            ..FuelModelConfig::default()
        })
        .unwrap();
        let floor = model.config().min_speed_multiplier;
        for slope in [10.0, 20.0, 1e6, f64::MAX] {
            let value = model.speed_multiplier(slope);
            assert!(value > floor, "slope {slope} gave {value}");
            assert!(value < floor + 1e-9);
        }
    }

    #[test]
    fn endpoint_cost_ignores_sub_step_policy() {
        let model = FuelModel::new(FuelModelConfig {
            planning_sampling: Sampling::SubSteps { step: 1.0 },
            ..FuelModelConfig::default()
        })
        .unwrap();
        let surface = step_surface();
        let from = Point::new(10.0, 1.0);
        let to = Point::new(30.0, 1.0);

        let endpoints = model.endpoint_cost(&surface, from, to, CostPhase::Planning).unwrap();
        assert!((endpoints.fuel - 0.1 * 20.0 * 2.0).abs() < 1e-9);
        let sampled = model.step_cost(&surface, from, to, CostPhase::Planning).unwrap();
        assert!((sampled.fuel - endpoints.fuel).abs() > 1e-6);

        let hole = FnField(|p: Point| if (p.x - 20.0).abs() < 0.5 { None } else { Some(0.0) });
        assert!(model.endpoint_cost(&hole, from, to, CostPhase::Planning).is_some());
        assert!(model.step_cost(&hole, from, to, CostPhase::Planning).is_none());
        assert_eq!(
            model.endpoint_cost(&surface, from, from, CostPhase::Planning),
            Some(StepCost::ZERO)
        );
    }

    #[test]
    fn rejects_invalid_config() {
        let bad = [
            FuelModelConfig {
                base_fuel_rate: 0.0,
                ..FuelModelConfig::default()
            },
            FuelModelConfig {
                planning_slope_penalty: -0.1,
                ..FuelModelConfig::default()
            },
            FuelModelConfig {
                min_speed_multiplier: 1.0,
                ..FuelModelConfig::default()
            },
            FuelModelConfig {
                execution_sampling: Sampling::SubSteps { step: 0.0 },
                ..FuelModelConfig::default()
            },
        ];
        for config in bad {
            assert!(FuelModel::new(config).is_err());
        }
    }
}
