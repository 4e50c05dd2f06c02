//! Boundary with an external planner.
//!
//! The caller serializes a [`PlanSnapshot`] of the world, ships it to whatever
//! planner it likes, and hands the JSON reply to [`parse_plan_response`]. The
//! reply is untrusted: malformed entries are dropped with a warning and the
//! rest is applied to the registry through [`apply_plan`].

use crate::error::{PlanError, TerrainError};
use crate::models::{AgentId, AgentSnapshot, Point};
use crate::registry::AgentRegistry;
use crate::surface::ElevationSurface;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chunk size used for the terrain summary when the caller has no preference.
pub const DEFAULT_SUMMARY_CHUNK: usize = 50;

/// World state handed to an external planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSnapshot {
    pub agents: Vec<AgentSnapshot>,
    /// Per-chunk roughness, see [`ElevationSurface::cost_summary`]
    pub terrain_summary: Vec<Vec<f64>>,
    pub instruction: String,
    pub captured_at: DateTime<Utc>,
}

impl PlanSnapshot {
    pub fn capture<R>(
        registry: &R,
        surface: &ElevationSurface,
        chunk_size: usize,
        instruction: impl Into<String>,
    ) -> Result<Self, TerrainError>
    where
        R: AgentRegistry + ?Sized,
    {
        Ok(Self {
            agents: registry.list_agents(),
            terrain_summary: surface.cost_summary(chunk_size)?,
            instruction: instruction.into(),
            captured_at: Utc::now(),
        })
    }
}

/// One validated entry of a planner reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPlan {
    pub agent_id: AgentId,
    pub waypoints: Vec<Point>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanReport {
    pub applied: Vec<AgentId>,
    pub skipped: Vec<AgentId>,
}

/// Validate a planner reply of the form
/// `{"plan": [{"agentId": 1, "waypoints": [{"x": 0, "y": 0}]}]}`.
pub fn parse_plan_response(response: &Value) -> Result<Vec<AgentPlan>, PlanError> {
    let plan = response.get("plan").ok_or(PlanError::MissingPlan)?;
    let entries = plan.as_array().ok_or(PlanError::NotASequence)?;

    Ok(entries
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| {
            let parsed = parse_entry(entry);
            if parsed.is_none() {
                tracing::warn!(entry = idx, "skipping malformed plan entry");
            }
            parsed
        })
        .collect())
}

/// [`parse_plan_response`] on raw text.
pub fn parse_plan_str(body: &str) -> Result<Vec<AgentPlan>, PlanError> {
    let value: Value = serde_json::from_str(body)?;
    parse_plan_response(&value)
}

fn parse_entry(entry: &Value) -> Option<AgentPlan> {
    let agent_id = parse_agent_id(entry.get("agentId")?)?;
    let waypoints = entry
        .get("waypoints")
        .or_else(|| entry.get("path"))?
        .as_array()?
        .iter()
        .map(parse_point)
        .collect::<Option<Vec<_>>>()?;
    Some(AgentPlan {
        agent_id,
        waypoints,
    })
}

fn parse_agent_id(value: &Value) -> Option<AgentId> {
    if let Some(id) = value.as_u64() {
        return AgentId::try_from(id).ok();
    }
    let id = value.as_f64()?;
    if id.fract() == 0.0 && id >= 0.0 && id <= f64::from(AgentId::MAX) {
        Some(id as AgentId)
    } else {
        None
    }
}

fn parse_point(value: &Value) -> Option<Point> {
    let x = value.get("x")?.as_f64()?;
    let y = value.get("y")?.as_f64()?;
    Some(Point::new(x, y))
}

/// Replace each referenced agent's queue with its planned waypoints.
pub fn apply_plan<R>(registry: &mut R, plans: &[AgentPlan]) -> PlanReport
where
    R: AgentRegistry + ?Sized,
{
    let mut report = PlanReport::default();
    for plan in plans {
        let Some(agent) = registry.find_by_id_mut(plan.agent_id) else {
            tracing::warn!(agent_id = plan.agent_id, "plan references unknown agent");
            report.skipped.push(plan.agent_id);
            continue;
        };
        if plan.waypoints.is_empty() {
            tracing::warn!(agent_id = plan.agent_id, "plan has no waypoints");
            report.skipped.push(plan.agent_id);
            continue;
        }
        let accepted = agent.motion.enqueue_path(&plan.waypoints);
        if accepted == 0 {
            tracing::warn!(agent_id = plan.agent_id, "agent rejected every waypoint");
            report.skipped.push(plan.agent_id);
            continue;
        }
        tracing::info!(agent_id = plan.agent_id, waypoints = accepted, "plan applied");
        report.applied.push(plan.agent_id);
    }
    report
}
