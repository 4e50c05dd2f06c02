//! Agent records and the in-memory fleet.

use crate::error::RegistryError;
use crate::fuel::FuelModel;
use crate::models::{AgentId, AgentSnapshot, Point, UnitKind};
use crate::motion::{MotionConfig, MotionController, MotionState, TickOutcome};
use crate::surface::ElevationField;
use std::collections::BTreeMap;

/// A controllable unit: identity, kind and its motion controller.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub kind: UnitKind,
    pub hp: u32,
    pub motion: MotionController,
}

impl Agent {
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            position: self.motion.position(),
            fuel: self.motion.fuel(),
        }
    }
}

/// Lookup surface the plan boundary works against.
pub trait AgentRegistry {
    fn list_agents(&self) -> Vec<AgentSnapshot>;
    fn find_by_id(&self, id: AgentId) -> Option<&Agent>;
    fn find_by_id_mut(&mut self, id: AgentId) -> Option<&mut Agent>;
}

/// In-memory registry keyed by id, iterated in id order.
#[derive(Debug, Clone)]
pub struct Fleet {
    agents: BTreeMap<AgentId, Agent>,
    /// `None` once every id has been handed out
    next_id: Option<AgentId>,
    motion: MotionConfig,
}

impl Default for Fleet {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

impl Fleet {
    pub fn new(motion: MotionConfig) -> Self {
        Self {
            agents: BTreeMap::new(),
            next_id: Some(1),
            motion,
        }
    }

    /// Add an agent with a full tank and return its id. Ids are never
    /// reused, so spawning fails once the id space is used up.
    pub fn spawn(
        &mut self,
        kind: UnitKind,
        name: impl Into<String>,
        position: Point,
    ) -> Result<AgentId, RegistryError> {
        let id = self.next_id.ok_or(RegistryError::IdsExhausted)?;
        self.next_id = id.checked_add(1);
        let agent = Agent {
            id,
            name: name.into(),
            kind,
            hp: kind.stats().max_hp,
            motion: MotionController::for_unit(kind, position, self.motion.clone()),
        };
        tracing::debug!(id, %kind, %position, "spawned agent");
        self.agents.insert(id, agent);
        Ok(id)
    }

    pub fn remove(&mut self, id: AgentId) -> Option<Agent> {
        self.agents.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.values()
    }

    /// Whether any agent still has somewhere to go.
    pub fn any_moving(&self) -> bool {
        self.agents
            .values()
            .any(|agent| agent.motion.state() == MotionState::Moving)
    }

    /// Advance every agent by `dt_secs`, returning the outcomes that changed
    /// something.
    pub fn tick_all<F>(
        &mut self,
        field: &F,
        model: &FuelModel,
        dt_secs: f64,
    ) -> Vec<(AgentId, TickOutcome)>
    where
        F: ElevationField + ?Sized,
    {
        self.agents
            .values_mut()
            .filter_map(|agent| match agent.motion.tick(field, model, dt_secs) {
                TickOutcome::Idle => None,
                outcome => Some((agent.id, outcome)),
            })
            .collect()
    }
}

impl AgentRegistry for Fleet {
    fn list_agents(&self) -> Vec<AgentSnapshot> {
        self.agents.values().map(Agent::snapshot).collect()
    }

    fn find_by_id(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    fn find_by_id_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }
}
