//! Per-agent motion state machine.
//!
//! A [`MotionController`] owns an agent's position, fuel and waypoint queue
//! and advances them one tick at a time, pricing every move with the same
//! [`FuelModel`] the planners use (execution phase). Running dry is a state
//! transition, not an error: the queue is dropped and the controller stays in
//! [`MotionState::OutOfFuel`] until it is refueled.

use crate::error::ConfigError;
use crate::fuel::{CostPhase, FuelModel};
use crate::models::{Point, UnitKind};
use crate::surface::ElevationField;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const MAX_ESTIMATE_PROBES: usize = 100_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    /// No active target
    #[default]
    Idle,
    /// Travelling toward the current target
    Moving,
    /// Fuel exhausted; locked until refueled
    OutOfFuel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Distance under which the agent snaps onto its target
    pub arrival_epsilon: f64,
    /// Length of the look-ahead step used to read the local slope
    pub probe_step: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            arrival_epsilon: 1.0,
            probe_step: 1.0,
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.arrival_epsilon.is_finite() && self.arrival_epsilon > 0.0) {
            return Err(ConfigError::out_of_range(
                "arrival_epsilon",
                "positive",
                self.arrival_epsilon,
            ));
        }
        if !(self.probe_step.is_finite() && self.probe_step > 0.0) {
            return Err(ConfigError::out_of_range("probe_step", "positive", self.probe_step));
        }
        Ok(())
    }
}

/// What a single [`MotionController::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Not moving; nothing happened.
    Idle,
    /// Moved toward the target.
    Advanced { distance: f64, fuel_used: f64 },
    /// Snapped onto `waypoint`; `next` is the new target, if any.
    Arrived { waypoint: Point, next: Option<Point> },
    /// The next step has no elevation data; the plan was dropped.
    Blocked { at: Point },
    /// Fuel ran out during this tick; the plan was dropped.
    OutOfFuel { distance: f64, fuel_used: f64 },
}

#[derive(Debug, Clone)]
pub struct MotionController {
    position: Point,
    fuel: f64,
    fuel_capacity: f64,
    /// Flat-ground speed in units per second
    speed: f64,
    target: Option<Point>,
    queue: VecDeque<Point>,
    state: MotionState,
    config: MotionConfig,
}

impl MotionController {
    /// Controller with a full tank.
    pub fn new(position: Point, speed: f64, fuel_capacity: f64, config: MotionConfig) -> Self {
        let fuel_capacity = fuel_capacity.max(0.0);
        Self {
            position,
            fuel: fuel_capacity,
            fuel_capacity,
            speed: speed.max(0.0),
            target: None,
            queue: VecDeque::new(),
            state: MotionState::Idle,
            config,
        }
    }

    /// Controller using the stats of `kind`.
    pub fn for_unit(kind: UnitKind, position: Point, config: MotionConfig) -> Self {
        let stats = kind.stats();
        Self::new(position, stats.speed, stats.fuel_capacity, config)
    }

    /// Override the starting fuel (clamped to `[0, capacity]`).
    pub fn with_fuel(mut self, fuel: f64) -> Self {
        self.fuel = fuel.clamp(0.0, self.fuel_capacity);
        self
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn fuel(&self) -> f64 {
        self.fuel
    }

    pub fn fuel_capacity(&self) -> f64 {
        self.fuel_capacity
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn target(&self) -> Option<Point> {
        self.target
    }

    pub fn queued(&self) -> impl Iterator<Item = &Point> + '_ {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Current target followed by every queued waypoint.
    pub fn remaining_route(&self) -> Vec<Point> {
        self.target.iter().chain(self.queue.iter()).copied().collect()
    }

    /// Queue `target`. With `clear`, the current target and queue are
    /// dropped first and `target` becomes active immediately.
    ///
    /// Returns `false` when the target is rejected: non-finite coordinates,
    /// an agent that cannot move, or an empty tank.
    pub fn enqueue(&mut self, target: Point, clear: bool) -> bool {
        if !target.is_finite() {
            tracing::warn!(%target, "ignoring non-finite waypoint");
            return false;
        }
        if self.speed <= 0.0 {
            tracing::debug!(%target, "immobile agent, waypoint rejected");
            return false;
        }
        if self.state == MotionState::OutOfFuel || self.fuel <= 0.0 {
            tracing::debug!(%target, "no fuel, waypoint rejected");
            return false;
        }
        if clear {
            self.queue.clear();
            self.target = None;
        }
        self.queue.push_back(target);
        if self.state != MotionState::Moving || clear {
            self.start_next_move();
        }
        true
    }

    /// Replace the current plan with `path`. Returns how many waypoints were
    /// accepted.
    pub fn enqueue_path(&mut self, path: &[Point]) -> usize {
        path.iter()
            .enumerate()
            .filter(|(idx, point)| self.enqueue(**point, *idx == 0))
            .count()
    }

    /// Drop the current target and queue. Has no effect on an agent that is
    /// out of fuel.
    pub fn cancel(&mut self) {
        if self.state == MotionState::OutOfFuel {
            return;
        }
        self.queue.clear();
        self.target = None;
        self.state = MotionState::Idle;
    }

    /// Add fuel up to capacity. An out-of-fuel agent becomes idle again.
    pub fn refuel(&mut self, amount: f64) -> f64 {
        if amount.is_finite() && amount > 0.0 {
            self.fuel = (self.fuel + amount).min(self.fuel_capacity);
        }
        if self.state == MotionState::OutOfFuel && self.fuel > 0.0 {
            self.state = MotionState::Idle;
        }
        self.fuel
    }

    fn start_next_move(&mut self) {
        match self.queue.pop_front() {
            Some(next) => {
                self.target = Some(next);
                self.state = MotionState::Moving;
            }
            None => {
                self.target = None;
                self.state = MotionState::Idle;
            }
        }
    }

    fn halt(&mut self, state: MotionState) {
        self.queue.clear();
        self.target = None;
        self.state = state;
    }

    /// Advance by `dt_secs` seconds.
    pub fn tick<F>(&mut self, field: &F, model: &FuelModel, dt_secs: f64) -> TickOutcome
    where
        F: ElevationField + ?Sized,
    {
        if self.state != MotionState::Moving {
            return TickOutcome::Idle;
        }
        let Some(target) = self.target else {
            self.state = MotionState::Idle;
            return TickOutcome::Idle;
        };

        let distance = self.position.distance(target);
        let direction = match self.position.direction_to(target) {
            Some(direction) if distance >= self.config.arrival_epsilon => direction,
            _ => {
                self.position = target;
                self.start_next_move();
                tracing::info!(waypoint = %target, remaining = self.queue.len(), "reached waypoint");
                return TickOutcome::Arrived {
                    waypoint: target,
                    next: self.target,
                };
            }
        };

        let (dx, dy) = direction;
        let probe_len = self.config.probe_step.min(distance);
        let probe_end = self.position.offset(dx * probe_len, dy * probe_len);
        let Some(probe) = model.step_cost(field, self.position, probe_end, CostPhase::Execution)
        else {
            tracing::warn!(at = %self.position, %target, "no terrain ahead, stopping");
            let at = self.position;
            self.halt(MotionState::Idle);
            return TickOutcome::Blocked { at };
        };

        let fuel_per_unit = if probe.distance > f64::EPSILON {
            probe.fuel / probe.distance
        } else {
            0.0
        };
        let step = self.speed * probe.speed_multiplier * dt_secs;
        let travel = if step.is_finite() {
            step.clamp(0.0, distance)
        } else {
            0.0
        };
        if travel <= 0.0 {
            return TickOutcome::Advanced {
                distance: 0.0,
                fuel_used: 0.0,
            };
        }

        let fuel_needed = fuel_per_unit * travel;
        if fuel_needed >= self.fuel {
            let affordable = if fuel_needed > 0.0 {
                travel * (self.fuel / fuel_needed)
            } else {
                travel
            };
            let fuel_used = self.fuel;
            self.position = self.position.offset(dx * affordable, dy * affordable);
            self.fuel = 0.0;
            self.halt(MotionState::OutOfFuel);
            tracing::info!(at = %self.position, "out of fuel, plan dropped");
            return TickOutcome::OutOfFuel {
                distance: affordable,
                fuel_used,
            };
        }

        self.fuel -= fuel_needed;
        self.position = self.position.offset(dx * travel, dy * travel);
        TickOutcome::Advanced {
            distance: travel,
            fuel_used: fuel_needed,
        }
    }

    /// Fuel needed to go straight from the current position to `target`,
    /// probing every `probe_step` units. `None` if the line leaves the terrain.
    pub fn estimate_fuel_to<F>(&self, field: &F, model: &FuelModel, target: Point) -> Option<f64>
    where
        F: ElevationField + ?Sized,
    {
        let distance = self.position.distance(target);
        if !distance.is_finite() {
            return None;
        }
        if distance <= f64::EPSILON {
            return Some(0.0);
        }
        let count = ((distance / self.config.probe_step).ceil() as usize).clamp(1, MAX_ESTIMATE_PROBES);
        let mut total = 0.0;
        let mut cursor = self.position;
        for i in 1..=count {
            let next = if i == count {
                target
            } else {
                self.position.lerp(target, i as f64 / count as f64)
            };
            total += model.step_cost(field, cursor, next, CostPhase::Execution)?.fuel;
            cursor = next;
        }
        Some(total)
    }
}
