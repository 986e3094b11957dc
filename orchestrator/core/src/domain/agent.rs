// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Specialist Agents and the Agent Registry
//!
//! A [`SpecialistAgent`] is a named research persona: a mutable mission prompt,
//! a set of capabilities it may use, and an optional lifespan measured in
//! cycles. The [`AgentRegistry`] owns the active set and one
//! [`PerformanceMetric`] per agent.
//!
//! ## Lifecycle
//! | Operation | Effect |
//! |-----------|--------|
//! | `deploy` | Registers a new agent and a zeroed metric; duplicate ids are rejected |
//! | `modify_prompt` | Overwrites the prompt in place, no history |
//! | `retire` | Removes agent and metric; unknown ids are a no-op |
//! | `check_expirations` | Retires every agent with `age >= lifespan`, after a full scan |
//!
//! Six permanent seed agents are created by [`AgentRegistry::seeded`]. Two of
//! them are reactive: they never run in the parallel specialist phase and are
//! only summoned by architect tools.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Capability granting access to the code sandbox
pub const CODE_EXECUTION: &str = "code_execution";

pub const THEORIST: &str = "theorist";
pub const EXPERIMENTALIST: &str = "experimentalist";
pub const FORMALIST: &str = "formalist";
pub const SYNTHESIST: &str = "synthesist";
pub const LATERAL_THINKER: &str = "lateral_thinker";
pub const SKEPTIC: &str = "skeptic";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistAgent {
    pub id: AgentId,
    pub mission_prompt: String,
    #[serde(default)]
    pub required_tools: BTreeSet<String>,
    /// `None` lives forever
    #[serde(default)]
    pub lifespan_cycles: Option<u64>,
    pub creation_cycle: u64,
    /// Only summoned by architect tools, never part of the specialist phase
    #[serde(default)]
    pub reactive: bool,
    /// Seed agents are re-created on reset and cannot be retired
    #[serde(default)]
    pub permanent: bool,
}

impl SpecialistAgent {
    pub fn new(id: impl Into<String>, mission_prompt: impl Into<String>, creation_cycle: u64) -> Self {
        Self {
            id: AgentId::new(id),
            mission_prompt: mission_prompt.into(),
            required_tools: BTreeSet::new(),
            lifespan_cycles: None,
            creation_cycle,
            reactive: false,
            permanent: false,
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_lifespan(mut self, lifespan: Option<u64>) -> Self {
        self.lifespan_cycles = lifespan;
        self
    }

    fn seed(id: &str, prompt: &str) -> Self {
        Self {
            permanent: true,
            ..Self::new(id, prompt, 0)
        }
    }

    fn reactive_seed(id: &str, prompt: &str) -> Self {
        Self {
            reactive: true,
            ..Self::seed(id, prompt)
        }
    }

    pub fn can_execute_code(&self) -> bool {
        self.required_tools.contains(CODE_EXECUTION)
    }

    /// Whether the agent has outlived its lifespan at `current_cycle`
    pub fn is_expired(&self, current_cycle: u64) -> bool {
        match self.lifespan_cycles {
            Some(lifespan) => current_cycle.saturating_sub(self.creation_cycle) >= lifespan,
            None => false,
        }
    }
}

/// Attribution stats used by the architect to weigh agents
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub nodes_created: u64,
    pub total_promise: f64,
}

impl PerformanceMetric {
    pub fn record(&mut self, promise: f64) {
        self.nodes_created += 1;
        self.total_promise += promise;
    }

    pub fn average_promise(&self) -> f64 {
        if self.nodes_created == 0 {
            0.0
        } else {
            self.total_promise / self.nodes_created as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("Agent already exists: {0}")]
    AlreadyExists(AgentId),

    #[error("Agent not found: {0}")]
    NotFound(AgentId),

    #[error("Agent {0} is a permanent seed agent and cannot be retired")]
    Permanent(AgentId),

    #[error("Agent id cannot be empty")]
    EmptyId,
}

#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<SpecialistAgent>,
    metrics: HashMap<AgentId, PerformanceMetric>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding exactly the six permanent seed agents
    pub fn seeded() -> Self {
        let mut registry = Self::new();
        for agent in seed_agents() {
            registry.insert(agent);
        }
        registry
    }

    /// Rebuild from persisted agents and metrics; missing metrics start at zero
    pub fn restore(agents: Vec<SpecialistAgent>, metrics: HashMap<AgentId, PerformanceMetric>) -> Self {
        let mut registry = Self::new();
        for agent in agents {
            if registry.contains(&agent.id) {
                warn!("Skipping duplicate agent '{}' in snapshot", agent.id);
                continue;
            }
            let metric = metrics.get(&agent.id).copied().unwrap_or_default();
            registry.metrics.insert(agent.id.clone(), metric);
            registry.agents.push(agent);
        }
        registry
    }

    fn insert(&mut self, agent: SpecialistAgent) {
        self.metrics.insert(agent.id.clone(), PerformanceMetric::default());
        self.agents.push(agent);
    }

    /// Register a new agent with a zeroed metric
    pub fn deploy(&mut self, agent: SpecialistAgent) -> Result<(), RegistryError> {
        if agent.id.as_str().trim().is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if self.contains(&agent.id) {
            warn!("Refusing to deploy agent '{}': id already active", agent.id);
            return Err(RegistryError::AlreadyExists(agent.id));
        }
        info!(
            "Deploying agent '{}' (lifespan: {:?}, tools: {:?})",
            agent.id, agent.lifespan_cycles, agent.required_tools
        );
        self.insert(agent);
        Ok(())
    }

    /// Remove an agent and its metric. Returns the removed agent, `None` if unknown.
    pub fn retire(&mut self, id: &AgentId, reason: &str) -> Result<Option<SpecialistAgent>, RegistryError> {
        let Some(pos) = self.agents.iter().position(|a| &a.id == id) else {
            return Ok(None);
        };
        if self.agents[pos].permanent {
            return Err(RegistryError::Permanent(id.clone()));
        }
        info!("Retiring agent '{}': {}", id, reason);
        self.metrics.remove(id);
        Ok(Some(self.agents.remove(pos)))
    }

    pub fn modify_prompt(&mut self, id: &AgentId, prompt: impl Into<String>) -> Result<(), RegistryError> {
        let agent = self
            .agents
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        agent.mission_prompt = prompt.into();
        Ok(())
    }

    /// Retire every agent whose lifespan has elapsed at `current_cycle`.
    ///
    /// Expired ids are collected over the whole active set first and only then
    /// removed.
    pub fn check_expirations(&mut self, current_cycle: u64) -> Vec<AgentId> {
        let expired: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|a| a.is_expired(current_cycle))
            .map(|a| a.id.clone())
            .collect();

        for id in &expired {
            self.agents.retain(|a| &a.id != id);
            self.metrics.remove(id);
            info!("Agent '{}' reached the end of its lifespan at cycle {}", id, current_cycle);
        }
        expired
    }

    /// Credit a created node to `id`; no-op for unregistered creators
    pub fn record_contribution(&mut self, id: &AgentId, promise: f64) -> bool {
        match self.metrics.get_mut(id) {
            Some(metric) => {
                metric.record(promise);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &AgentId) -> Option<&SpecialistAgent> {
        self.agents.iter().find(|a| &a.id == id)
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.agents.iter().any(|a| &a.id == id)
    }

    pub fn metric(&self, id: &AgentId) -> Option<&PerformanceMetric> {
        self.metrics.get(id)
    }

    pub fn metrics(&self) -> &HashMap<AgentId, PerformanceMetric> {
        &self.metrics
    }

    /// Active agents in deployment order
    pub fn active(&self) -> &[SpecialistAgent] {
        &self.agents
    }

    /// Agents taking part in the parallel specialist phase
    pub fn specialists(&self) -> impl Iterator<Item = &SpecialistAgent> {
        self.agents.iter().filter(|a| !a.reactive)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// The six permanent agents every mission starts with
pub fn seed_agents() -> Vec<SpecialistAgent> {
    vec![
        SpecialistAgent::seed(
            THEORIST,
            "You are the Theorist. Propose bold but precise conjectures and hypotheses that move \
             the objective forward. State each claim so that it could be refuted.",
        ),
        SpecialistAgent::seed(
            EXPERIMENTALIST,
            "You are the Experimentalist. Design small computational experiments that test the \
             current hypotheses. When useful, include exactly one fenced python code block; it \
             will be executed and its output returned to the team.",
        )
        .with_tools([CODE_EXECUTION]),
        SpecialistAgent::seed(
            FORMALIST,
            "You are the Formalist. Turn promising ideas into rigorous definitions, lemmas and \
             proof sketches. Point out every gap in existing arguments.",
        ),
        SpecialistAgent::seed(
            SYNTHESIST,
            "You are the Synthesist. Connect findings across the knowledge graph, identify \
             patterns and suggest the most promising next direction.",
        ),
        SpecialistAgent::reactive_seed(
            LATERAL_THINKER,
            "You are the Lateral Thinker. Given two unrelated findings, construct an unexpected \
             abstraction or analogy that unifies them.",
        ),
        SpecialistAgent::reactive_seed(
            SKEPTIC,
            "You are the Skeptic. Attack the given claim: look for counterexamples, hidden \
             assumptions and logical gaps. Be specific.",
        ),
    ]
}
