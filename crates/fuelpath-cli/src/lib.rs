//! Fuelpath CLI - command line driver for terrain planning and simulation.
//!
//! Subcommands:
//! - summary: per-chunk terrain roughness
//! - plan: fuel-optimal path between two points
//! - simulate: plan and drive a set of agents until they settle
//! - suggest: ask an external planner for moves and apply them

pub mod config;
pub mod planner;
pub mod scenario;
pub mod telemetry;
pub mod terrain;

pub use config::{load_engine_config, CliEnv};
pub use planner::PlannerClient;
pub use scenario::{parse_point, AgentSpec, Scenario};
pub use terrain::SyntheticTerrain;
