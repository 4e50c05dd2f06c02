//! CLI configuration from environment and config files.

use anyhow::{Context, Result};
use fuelpath_core::EngineConfig;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PLANNER_URL: &str = "http://localhost:5000/llm/move";
pub const DEFAULT_PLANNER_TIMEOUT_S: u64 = 30;

#[derive(Debug, Clone)]
pub struct CliEnv {
    /// Engine config file, `FUELPATH_CONFIG`
    pub config_path: Option<PathBuf>,
    /// External planner endpoint, `FUELPATH_PLANNER_URL`
    pub planner_url: String,
    /// Request timeout for the planner, `FUELPATH_PLANNER_TIMEOUT_S`
    pub planner_timeout: Duration,
}

impl CliEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            config_path: lookup("FUELPATH_CONFIG")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            planner_url: lookup("FUELPATH_PLANNER_URL")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_PLANNER_URL.to_string()),
            planner_timeout: Duration::from_secs(
                lookup("FUELPATH_PLANNER_TIMEOUT_S")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_PLANNER_TIMEOUT_S),
            ),
        }
    }
}

/// Load the engine config from `path`, falling back to defaults when no file
/// is given.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = EngineConfig::from_json_str(&body)
        .with_context(|| format!("parsing config {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded engine config");
    Ok(config)
}
