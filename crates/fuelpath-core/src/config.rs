//! Engine-wide tuning, loadable from JSON.

use crate::candidates::{CandidateConfig, CandidateEvaluator};
use crate::error::{ConfigError, FuelpathError};
use crate::fuel::{FuelModel, FuelModelConfig};
use crate::motion::MotionConfig;
use crate::plan::DEFAULT_SUMMARY_CHUNK;
use crate::route_engine::{PathSearchEngine, SearchConfig};
use serde::{Deserialize, Serialize};

/// Every tunable knob in one place. Missing sections fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fuel: FuelModelConfig,
    pub search: SearchConfig,
    pub candidates: CandidateConfig,
    pub motion: MotionConfig,
    /// Chunk size for terrain summaries sent to planners
    pub summary_chunk: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fuel: FuelModelConfig::default(),
            search: SearchConfig::default(),
            candidates: CandidateConfig::default(),
            motion: MotionConfig::default(),
            summary_chunk: DEFAULT_SUMMARY_CHUNK,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(body: &str) -> Result<Self, FuelpathError> {
        let config: Self = serde_json::from_str(body)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fuel.validate()?;
        self.search.validate()?;
        self.candidates.validate()?;
        self.motion.validate()?;
        if self.summary_chunk == 0 {
            return Err(ConfigError::out_of_range("summary_chunk", "at least 1", 0.0));
        }
        Ok(())
    }

    pub fn fuel_model(&self) -> Result<FuelModel, ConfigError> {
        FuelModel::new(self.fuel.clone())
    }

    pub fn search_engine(&self) -> Result<PathSearchEngine, ConfigError> {
        PathSearchEngine::new(self.fuel_model()?, self.search.clone())
    }

    pub fn candidate_evaluator(&self) -> Result<CandidateEvaluator, ConfigError> {
        CandidateEvaluator::new(self.candidates.clone())
    }
}
