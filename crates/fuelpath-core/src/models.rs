//! Core data models shared by the planners and the motion controller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier allocated to an agent by its registry.
pub type AgentId = u32;

/// A continuous 2D coordinate on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Unit vector pointing from `self` toward `other`, or `None` when the
    /// two points coincide.
    pub fn direction_to(&self, other: Point) -> Option<(f64, f64)> {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let len = dx.hypot(dy);
        if len <= f64::EPSILON {
            return None;
        }
        Some((dx / len, dy / len))
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Linear interpolation, `t = 0` is `self` and `t = 1` is `other`.
    pub fn lerp(&self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Unit categories. Each maps to a fixed stats record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Immobile headquarters
    Hq,
    #[default]
    Infantry,
    Air,
    Tank,
}

/// Immutable per-kind stats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnitStats {
    pub max_hp: u32,
    /// Flat-ground speed in surface units per second
    pub speed: f64,
    pub fuel_capacity: f64,
}

const HQ_STATS: UnitStats = UnitStats {
    max_hp: 1000,
    speed: 0.0,
    fuel_capacity: 0.0,
};

const INFANTRY_STATS: UnitStats = UnitStats {
    max_hp: 100,
    speed: 10.0,
    fuel_capacity: 100.0,
};

const AIR_STATS: UnitStats = UnitStats {
    max_hp: 200,
    speed: 30.0,
    fuel_capacity: 80.0,
};

const TANK_STATS: UnitStats = UnitStats {
    max_hp: 500,
    speed: 3.0,
    fuel_capacity: 180.0,
};

impl UnitKind {
    pub const ALL: [UnitKind; 4] = [UnitKind::Hq, UnitKind::Infantry, UnitKind::Air, UnitKind::Tank];

    pub fn stats(self) -> &'static UnitStats {
        match self {
            UnitKind::Hq => &HQ_STATS,
            UnitKind::Infantry => &INFANTRY_STATS,
            UnitKind::Air => &AIR_STATS,
            UnitKind::Tank => &TANK_STATS,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Hq => write!(f, "hq"),
            UnitKind::Infantry => write!(f, "infantry"),
            UnitKind::Air => write!(f, "air"),
            UnitKind::Tank => write!(f, "tank"),
        }
    }
}

impl std::str::FromStr for UnitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hq" => Ok(UnitKind::Hq),
            "infantry" => Ok(UnitKind::Infantry),
            "air" => Ok(UnitKind::Air),
            "tank" => Ok(UnitKind::Tank),
            other => Err(format!("unknown unit kind `{other}`")),
        }
    }
}

/// Read-only view of an agent, as handed to external planners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub name: String,
    pub kind: UnitKind,
    pub position: Point,
    pub fuel: f64,
}
