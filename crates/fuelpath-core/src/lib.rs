//! Terrain-aware, fuel-optimal path search and agent motion.
//!
//! The crate is organised bottom-up: an [`ElevationSurface`] answers height
//! queries, a [`FuelModel`] prices straight moves over it, and both the
//! [`PathSearchEngine`] (planning) and the [`MotionController`] (execution)
//! use that one model so plans and real consumption stay consistent.

pub mod candidates;
pub mod config;
pub mod error;
pub mod fuel;
pub mod models;
pub mod motion;
pub mod plan;
pub mod registry;
pub mod route_engine;
pub mod surface;

pub use candidates::{CandidateConfig, CandidateEvaluator, CandidateSelection};
pub use config::EngineConfig;
pub use error::{ConfigError, FuelpathError, PlanError, RegistryError, TerrainError};
pub use fuel::{CostPhase, FuelModel, FuelModelConfig, Sampling, StepCost};
pub use models::{AgentId, AgentSnapshot, Point, UnitKind, UnitStats};
pub use motion::{MotionConfig, MotionController, MotionState, TickOutcome};
pub use plan::{apply_plan, parse_plan_response, parse_plan_str, AgentPlan, PlanReport, PlanSnapshot};
pub use registry::{Agent, AgentRegistry, Fleet};
pub use route_engine::{
    quantize, Neighborhood, PathSearchEngine, SearchConfig, SearchOutcome, SearchResult,
};
pub use surface::{
    channel_to_elevation, ElevationField, ElevationSurface, FnField, GrayscaleRaster,
    TerrainSource, MAX_ELEVATION, MIN_ELEVATION,
};
