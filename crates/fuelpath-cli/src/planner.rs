//! HTTP client for an external planner.

use anyhow::{Context, Result};
use fuelpath_core::{parse_plan_response, AgentPlan, PlanSnapshot};
use std::time::Duration;

/// Posts world snapshots to a planner endpoint and validates its replies.
pub struct PlannerClient {
    client: reqwest::Client,
    url: String,
}

impl PlannerClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building planner HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send `snapshot` and return the validated plan entries.
    pub async fn request_plan(&self, snapshot: &PlanSnapshot) -> Result<Vec<AgentPlan>> {
        tracing::debug!(url = %self.url, agents = snapshot.agents.len(), "requesting plan");
        let response = self
            .client
            .post(&self.url)
            .json(snapshot)
            .send()
            .await
            .with_context(|| format!("posting snapshot to {}", self.url))?
            .error_for_status()
            .context("planner rejected the snapshot")?;
        let body: serde_json::Value = response
            .json()
            .await
            .context("planner reply is not JSON")?;
        let plans = parse_plan_response(&body)?;
        tracing::info!(entries = plans.len(), "planner replied");
        Ok(plans)
    }
}
