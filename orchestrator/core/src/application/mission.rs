// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mission Context - Application Layer
//!
//! The single owner of all process-wide mission state: knowledge graph,
//! semantic index, agent registry, stagnation detector, counters and the
//! per-agent output history. Every use case receives it by reference; the
//! scheduler keeps it behind one mutex.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Aggregate root for a running mission

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use conclave_cortex::{
    CortexEvent, Embedder, GraphError, KnowledgeGraph, KnowledgeNode, NodeDraft, NodeId, SemanticIndex,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::agent::{AgentId, AgentRegistry, PerformanceMetric};
use crate::domain::config::MissionSettings;
use crate::domain::events::MissionEvent;
use crate::domain::llm::OracleSet;
use crate::domain::sandbox::CodeSandbox;
use crate::domain::snapshot::{MissionSnapshot, SNAPSHOT_VERSION};
use crate::domain::stagnation::StagnationDetector;
use crate::domain::synthesis::ResearchVector;
use crate::infrastructure::event_bus::EventBus;

/// Agent id recorded as creator of nodes the architect writes itself
pub const ARCHITECT: &str = "architect";

/// Lower bound of the synthetic verification success probability
pub const VERIFICATION_FLOOR: f64 = 0.15;

/// Success probability of a formal verification for a proof of `len` characters
pub fn verification_probability(len: usize) -> f64 {
    (0.9 - len as f64 / 2500.0).max(VERIFICATION_FLOOR)
}

/// External collaborators a cycle talks to
#[derive(Clone)]
pub struct MissionServices {
    pub oracles: OracleSet,
    pub sandbox: Arc<dyn CodeSandbox>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentOutput {
    pub cycle: u64,
    pub content: String,
    pub produced_at: DateTime<Utc>,
}

/// A node together with its derived invalidation flag
#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    #[serde(flatten)]
    pub node: KnowledgeNode,
    pub invalidated: bool,
}

pub struct MissionContext {
    pub graph: KnowledgeGraph,
    pub index: SemanticIndex,
    pub registry: AgentRegistry,
    pub detector: StagnationDetector,
    pub cycle: u64,
    pub objective: String,
    pub research_vector: Option<ResearchVector>,
    settings: MissionSettings,
    outputs: HashMap<AgentId, VecDeque<AgentOutput>>,
    events: EventBus,
    rng: StdRng,
}

impl MissionContext {
    pub fn new(settings: MissionSettings, embedder: Arc<dyn Embedder>, events: EventBus) -> Self {
        Self {
            graph: KnowledgeGraph::new(),
            index: SemanticIndex::new(embedder),
            registry: AgentRegistry::seeded(),
            detector: StagnationDetector::new(settings.stagnation_threshold),
            cycle: 0,
            objective: settings.objective.clone(),
            research_vector: None,
            rng: seeded_rng(settings.verification_seed),
            settings,
            outputs: HashMap::new(),
            events,
        }
    }

    pub fn settings(&self) -> &MissionSettings {
        &self.settings
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn publish(&self, event: MissionEvent) {
        self.events.publish(event);
    }

    /// Back to a fresh mission: empty graph, six seed agents, zeroed counters
    pub fn reset(&mut self) {
        self.graph.clear();
        self.index.clear();
        self.registry = AgentRegistry::seeded();
        self.detector = StagnationDetector::new(self.settings.stagnation_threshold);
        self.cycle = 0;
        self.objective = self.settings.objective.clone();
        self.research_vector = None;
        self.outputs.clear();
        self.rng = seeded_rng(self.settings.verification_seed);
        info!("Mission state reset");
    }

    pub fn to_snapshot(&self) -> MissionSnapshot {
        let agents = self.registry.active().to_vec();
        MissionSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            nodes: self.graph.all().to_vec(),
            node_counter: self.graph.counter(),
            cycle_counter: self.cycle,
            stagnation_counter: self.detector.counter(),
            objective: self.objective.clone(),
            research_vector: self.research_vector.clone(),
            active_agents: agents.iter().map(|a| a.id.clone()).collect(),
            metrics: self
                .registry
                .metrics()
                .iter()
                .map(|(id, metric)| (id.clone(), *metric))
                .collect(),
            agents,
            focus_history: self.detector.focus_history(),
        }
    }

    /// Replace in-memory state with a snapshot and rebuild the semantic index.
    ///
    /// Returns how many nodes were embedded.
    pub async fn restore(&mut self, snapshot: MissionSnapshot) -> Result<usize, GraphError> {
        let agents = snapshot.ordered_agents();
        let metrics: HashMap<AgentId, PerformanceMetric> = snapshot.metrics.into_iter().collect();

        self.graph = KnowledgeGraph::restore(snapshot.nodes, snapshot.node_counter)?;
        self.registry = AgentRegistry::restore(agents, metrics);
        self.detector = StagnationDetector::restore(
            self.settings.stagnation_threshold,
            snapshot.stagnation_counter,
            snapshot.focus_history,
        );
        self.cycle = snapshot.cycle_counter;
        self.objective = snapshot.objective;
        self.research_vector = snapshot.research_vector;
        self.outputs.clear();

        let events = self.events.clone();
        let indexed = self
            .index
            .rebuild_all(self.graph.all(), |completed, total| {
                events.publish(MissionEvent::Cortex {
                    event: CortexEvent::IndexRebuildProgress {
                        completed,
                        total,
                        timestamp: Utc::now(),
                    },
                });
            })
            .await;

        info!(
            "Restored mission at cycle {} with {} nodes ({} embedded) and {} agents",
            self.cycle,
            self.graph.len(),
            indexed,
            self.registry.len()
        );
        self.publish(MissionEvent::MissionRestored {
            cycle: self.cycle,
            nodes: self.graph.len(),
            restored_at: Utc::now(),
        });
        // seed agents exist in every mission; observers only lack the deployed ones
        for agent in self.registry.active().iter().filter(|a| !a.permanent) {
            self.publish(MissionEvent::AgentDeployed {
                agent_id: agent.id.clone(),
                lifespan_cycles: agent.lifespan_cycles,
                deployed_at: Utc::now(),
            });
        }
        Ok(indexed)
    }

    /// Allocate an id, insert, embed and announce a new node
    pub async fn add_node(&mut self, draft: NodeDraft) -> Result<NodeId, GraphError> {
        let id = self.graph.allocate_id(draft.node_type);
        self.insert_node(KnowledgeNode::from_draft(id.clone(), draft)).await?;
        Ok(id)
    }

    /// Insert a node whose id was allocated earlier, then embed and announce it
    pub async fn insert_node(&mut self, node: KnowledgeNode) -> Result<(), GraphError> {
        self.graph.insert(node.clone())?;
        if !self.index.index_node(&node).await {
            debug!("Node {} left out of the semantic index", node.id);
        }

        metrics::gauge!("conclave_knowledge_nodes").set(self.graph.len() as f64);
        self.publish(MissionEvent::KnowledgeAdded {
            node_id: node.id.clone(),
            node_type: node.node_type.label().to_string(),
            created_by: node.created_by.clone(),
            added_at: Utc::now(),
        });
        self.publish(MissionEvent::Cortex {
            event: CortexEvent::NodeInserted {
                node_id: node.id,
                node_type: node.node_type,
                created_by: node.created_by,
                promise_score: node.promise_score,
                timestamp: Utc::now(),
            },
        });
        Ok(())
    }

    /// Draw a synthetic verification outcome for a proof of `proof_len` characters
    pub fn draw_verification(&mut self, proof_len: usize) -> bool {
        self.rng.random_bool(verification_probability(proof_len))
    }

    /// Append to an agent's output history, dropping the oldest past the cap
    pub fn record_output(&mut self, agent_id: &AgentId, content: impl Into<String>) {
        let content = content.into();
        let cap = self.settings.output_history.max(1);
        let log = self.outputs.entry(agent_id.clone()).or_default();
        if log.len() == cap {
            log.pop_front();
        }
        log.push_back(AgentOutput {
            cycle: self.cycle,
            content: content.clone(),
            produced_at: Utc::now(),
        });
        self.events.publish(MissionEvent::SpecialistOutput {
            agent_id: agent_id.clone(),
            cycle: self.cycle,
            content,
            produced_at: Utc::now(),
        });
    }

    /// The `n` most recent outputs of an agent, oldest first
    pub fn recent_outputs(&self, agent_id: &AgentId, n: usize) -> Vec<&AgentOutput> {
        match self.outputs.get(agent_id) {
            Some(log) => log.iter().skip(log.len().saturating_sub(n)).collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn forget_outputs(&mut self, agent_id: &AgentId) {
        self.outputs.remove(agent_id);
    }

    /// Every node with its derived invalidation flag, in insertion order
    pub fn node_views(&self) -> Vec<NodeView> {
        let invalidated = self.graph.mark_invalidated();
        self.graph
            .all()
            .iter()
            .map(|node| NodeView {
                invalidated: invalidated.contains(&node.id),
                node: node.clone(),
            })
            .collect()
    }

    /// Top-k nodes related to `text`, with invalidation flags
    pub async fn related_nodes(&self, text: &str, k: usize) -> Vec<NodeView> {
        self.index
            .query(text, k)
            .await
            .into_iter()
            .filter_map(|scored| {
                self.graph.get(&scored.node_id).map(|node| NodeView {
                    invalidated: self.graph.is_invalidated(&node.id),
                    node: node.clone(),
                })
            })
            .collect()
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::SpecialistAgent;
    use conclave_cortex::{HashingEmbedder, NodeType, Relation};

    fn context() -> MissionContext {
        let settings = MissionSettings {
            output_history: 3,
            verification_seed: Some(7),
            ..MissionSettings::default()
        };
        MissionContext::new(settings, Arc::new(HashingEmbedder::default()), EventBus::new(64))
    }

    #[test]
    fn test_verification_probability_has_floor() {
        assert!((verification_probability(0) - 0.9).abs() < 1e-9);
        assert!((verification_probability(1000) - 0.5).abs() < 1e-9);
        assert_eq!(verification_probability(10_000), VERIFICATION_FLOOR);
        assert!(verification_probability(100) > verification_probability(200));
    }

    #[test]
    fn test_output_history_is_bounded() {
        let mut ctx = context();
        let theorist = AgentId::from("theorist");
        for i in 0..5 {
            ctx.record_output(&theorist, format!("idea {i}"));
        }
        let recent: Vec<&str> = ctx
            .recent_outputs(&theorist, 10)
            .iter()
            .map(|o| o.content.as_str())
            .collect();
        assert_eq!(recent, vec!["idea 2", "idea 3", "idea 4"]);
        assert_eq!(ctx.recent_outputs(&theorist, 1)[0].content, "idea 4");
        assert!(ctx.recent_outputs(&AgentId::from("nobody"), 5).is_empty());
    }

    #[tokio::test]
    async fn test_add_node_embeds_and_announces() {
        let mut ctx = context();
        let mut rx = ctx.events().subscribe();

        let id = ctx
            .add_node(NodeDraft::new(NodeType::Hypothesis, "gaps grow like log p", "theorist"))
            .await
            .unwrap();

        assert_eq!(id.as_str(), "H1");
        assert!(ctx.index.contains(&id));
        assert!(matches!(rx.recv().await.unwrap(), MissionEvent::KnowledgeAdded { .. }));
    }

    #[tokio::test]
    async fn test_snapshot_restore_rebuilds_index() {
        let mut ctx = context();
        let h = ctx
            .add_node(NodeDraft::new(NodeType::Hypothesis, "twin primes are infinite", "theorist"))
            .await
            .unwrap();
        ctx.add_node(
            NodeDraft::new(NodeType::Refutation, "counting argument fails", "skeptic")
                .with_relation(Relation::new("REFUTES", h.clone())),
        )
        .await
        .unwrap();
        ctx.cycle = 4;
        ctx.detector.record_stagnation(1);
        let snapshot = ctx.to_snapshot();

        let mut restored = context();
        let indexed = restored.restore(snapshot).await.unwrap();

        assert_eq!(indexed, 2);
        assert_eq!(restored.cycle, 4);
        assert_eq!(restored.detector.counter(), 1);
        assert_eq!(restored.graph.counter(), 2);
        assert!(restored.graph.is_invalidated(&h));
        assert_eq!(restored.registry.len(), 6);
        assert_eq!(restored.related_nodes("twin primes", 1).await[0].node.id, h);
    }

    #[tokio::test]
    async fn test_restore_announces_deployed_agents() {
        let mut ctx = context();
        ctx.cycle = 2;
        ctx.deploy_agent(
            SpecialistAgent::new("topologist", "Study the manifold structure.", 2).with_lifespan(Some(4)),
        )
        .unwrap();
        let snapshot = ctx.to_snapshot();

        let mut restored = context();
        let mut rx = restored.events().subscribe();
        restored.restore(snapshot).await.unwrap();

        let mut deployed = Vec::new();
        let mut saw_restored = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                MissionEvent::MissionRestored { cycle, .. } => {
                    assert_eq!(cycle, 2);
                    saw_restored = true;
                }
                MissionEvent::AgentDeployed {
                    agent_id,
                    lifespan_cycles,
                    ..
                } => {
                    assert!(saw_restored);
                    assert_eq!(lifespan_cycles, Some(4));
                    deployed.push(agent_id.as_str().to_string());
                }
                _ => {}
            }
        }
        assert_eq!(deployed, vec!["topologist"]);
        assert_eq!(restored.registry.len(), 7);
    }

    #[tokio::test]
    async fn test_reset_restores_seed_state() {
        let mut ctx = context();
        ctx.add_node(NodeDraft::new(NodeType::Concept, "sieve", "formalist"))
            .await
            .unwrap();
        ctx.cycle = 9;
        ctx.objective = "something else".into();

        ctx.reset();

        assert!(ctx.graph.is_empty());
        assert!(ctx.index.is_empty());
        assert_eq!(ctx.graph.counter(), 0);
        assert_eq!(ctx.cycle, 0);
        assert_eq!(ctx.objective, MissionSettings::default().objective);
        assert_eq!(ctx.registry.len(), 6);
    }

    #[test]
    fn test_seeded_verification_is_deterministic() {
        let mut a = context();
        let mut b = context();
        let draws_a: Vec<bool> = (0..16).map(|i| a.draw_verification(i * 150)).collect();
        let draws_b: Vec<bool> = (0..16).map(|i| b.draw_verification(i * 150)).collect();
        assert_eq!(draws_a, draws_b);
    }
}
