// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Versioned mission snapshot, the single persisted record of a mission.
//!
//! Embeddings are deliberately absent; the semantic index is rebuilt from
//! `nodes` on load.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use conclave_cortex::KnowledgeNode;
use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentId, PerformanceMetric, SpecialistAgent};
use crate::domain::repository::RepositoryError;
use crate::domain::synthesis::ResearchVector;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub nodes: Vec<KnowledgeNode>,
    pub node_counter: u64,
    pub cycle_counter: u64,
    pub stagnation_counter: u32,
    pub objective: String,
    #[serde(default)]
    pub research_vector: Option<ResearchVector>,
    /// Active agent ids in deployment order
    pub active_agents: Vec<AgentId>,
    /// Prompt, capabilities and lifespan of every active agent
    pub agents: Vec<SpecialistAgent>,
    #[serde(default)]
    pub metrics: BTreeMap<AgentId, PerformanceMetric>,
    #[serde(default)]
    pub focus_history: Vec<String>,
}

impl MissionSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, RepositoryError> {
        serde_json::to_vec(self).map_err(|e| RepositoryError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RepositoryError> {
        let snapshot: Self =
            serde_json::from_slice(bytes).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(RepositoryError::IncompatibleVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        snapshot.check_consistency()?;
        Ok(snapshot)
    }

    /// Agents listed as active must all have a definition
    fn check_consistency(&self) -> Result<(), RepositoryError> {
        for id in &self.active_agents {
            if !self.agents.iter().any(|a| &a.id == id) {
                return Err(RepositoryError::Corrupt(format!("active agent '{}' has no definition", id)));
            }
        }
        Ok(())
    }

    /// Agent definitions ordered by the active list
    pub fn ordered_agents(&self) -> Vec<SpecialistAgent> {
        self.active_agents
            .iter()
            .filter_map(|id| self.agents.iter().find(|a| &a.id == id).cloned())
            .collect()
    }
}
