//! Error types for the fuelpath core.
//!
//! Only configuration mistakes and malformed external data are errors here.
//! Out-of-bounds queries, unreachable goals and fuel exhaustion are ordinary
//! results and never surface through these types.

use thiserror::Error;

/// Problems building or querying an elevation surface.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TerrainError {
    #[error("surface dimensions must be non-zero, got {width}x{height}")]
    EmptySurface { width: usize, height: usize },

    #[error("expected {expected} elevation samples for the surface, got {actual}")]
    SampleCountMismatch { expected: usize, actual: usize },

    #[error("elevation {value} at ({x}, {y}) is outside [{min}, {max}]")]
    ElevationOutOfRange {
        x: usize,
        y: usize,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("chunk size must be positive")]
    InvalidChunkSize,
}

/// Invalid tuning values for the cost model, search engine or candidate planner.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },
}

impl ConfigError {
    pub(crate) fn out_of_range(field: &'static str, requirement: &'static str, value: f64) -> Self {
        Self::OutOfRange {
            field,
            requirement,
            value,
        }
    }
}

/// Failures validating a plan returned by an external planner.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("planner response has no `plan` field")]
    MissingPlan,

    #[error("planner `plan` field is not a sequence")]
    NotASequence,

    #[error("planner response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures mutating the agent registry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("agent ids exhausted")]
    IdsExhausted,
}

/// Umbrella error for callers that mix the operations above.
#[derive(Debug, Error)]
pub enum FuelpathError {
    #[error(transparent)]
    Terrain(#[from] TerrainError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
