//! Agent state store

use std::collections::BTreeMap;

use crate::agent::{AgentName, AgentViewState, ALL_AGENTS};

/// View state of every agent, keyed in display order
///
/// The store is created fully populated and never gains or loses entries;
/// callers only ever mutate existing slots.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStore {
    agents: BTreeMap<AgentName, AgentViewState>,
}

impl AgentStore {
    /// Create a store with every agent idle
    pub fn new() -> Self {
        Self {
            agents: ALL_AGENTS
                .iter()
                .map(|agent| (*agent, AgentViewState::idle()))
                .collect(),
        }
    }

    /// Get an agent's state
    pub fn get(&self, agent: AgentName) -> Option<&AgentViewState> {
        self.agents.get(&agent)
    }

    /// Get an agent's state for mutation
    pub fn get_mut(&mut self, agent: AgentName) -> Option<&mut AgentViewState> {
        self.agents.get_mut(&agent)
    }

    /// Look up by raw wire name; unknown names yield `None`
    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut AgentViewState> {
        let agent = name.parse::<AgentName>().ok()?;
        self.get_mut(agent)
    }

    /// Iterate in display order
    pub fn iter(&self) -> impl Iterator<Item = (AgentName, &AgentViewState)> {
        self.agents.iter().map(|(agent, state)| (*agent, state))
    }
}

impl Default for AgentStore {
    fn default() -> Self {
        Self::new()
    }
}
