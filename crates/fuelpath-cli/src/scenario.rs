//! Agent placement for CLI runs: `kind@x,y` specs and named presets.

use fuelpath_core::{Fleet, MotionConfig, Point, RegistryError, UnitKind};
use std::str::FromStr;

/// Parse `x,y` into a point.
pub fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
    let x: f64 = x.trim().parse().map_err(|_| format!("bad x coordinate in `{s}`"))?;
    let y: f64 = y.trim().parse().map_err(|_| format!("bad y coordinate in `{s}`"))?;
    let point = Point::new(x, y);
    if !point.is_finite() {
        return Err(format!("coordinates must be finite, got `{s}`"));
    }
    Ok(point)
}

/// One agent to place, written `kind@x,y` (optionally `kind@x,y->tx,ty`).
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSpec {
    pub kind: UnitKind,
    pub position: Point,
    pub destination: Option<Point>,
}

impl FromStr for AgentSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once('@')
            .ok_or_else(|| format!("expected `kind@x,y`, got `{s}`"))?;
        let kind: UnitKind = kind.parse()?;
        let (position, destination) = match rest.split_once("->") {
            Some((from, to)) => (parse_point(from)?, Some(parse_point(to)?)),
            None => (parse_point(rest)?, None),
        };
        Ok(Self {
            kind,
            position,
            destination,
        })
    }
}

/// A named set of agents.
pub struct Scenario {
    pub name: String,
    pub agents: Vec<AgentSpec>,
}

impl Scenario {
    /// Spawn every agent into a new fleet, naming them `<Kind> <n>`.
    pub fn spawn(&self, motion: MotionConfig) -> Result<Fleet, RegistryError> {
        let mut fleet = Fleet::new(motion);
        for (idx, spec) in self.agents.iter().enumerate() {
            let name = format!("{} {}", spec.kind, idx + 1);
            fleet.spawn(spec.kind, name, spec.position)?;
        }
        Ok(fleet)
    }
}

/// Two ground units and a flyer crossing the map left to right.
pub fn create_crossing_scenario(width: f64, height: f64) -> Scenario {
    let left = width * 0.1;
    let right = width * 0.9;
    let spec = |kind, y: f64| AgentSpec {
        kind,
        position: Point::new(left, height * y),
        destination: Some(Point::new(right, height * y)),
    };
    Scenario {
        name: "crossing".to_string(),
        agents: vec![
            spec(UnitKind::Tank, 0.2),
            spec(UnitKind::Infantry, 0.5),
            spec(UnitKind::Air, 0.8),
        ],
    }
}

/// Scenario built from explicit `--agent` specs, or the crossing preset when
/// none were given.
pub fn from_specs(specs: &[AgentSpec], width: f64, height: f64) -> Scenario {
    if specs.is_empty() {
        create_crossing_scenario(width, height)
    } else {
        Scenario {
            name: "custom".to_string(),
            agents: specs.to_vec(),
        }
    }
}
