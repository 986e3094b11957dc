// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Applies the architect's synthesis payload to the mission: stagnation and
// focus bookkeeping, objective changes, research vectors and knowledge
// updates. Runs inside the sequential architect phase only.

use std::collections::HashSet;

use chrono::Utc;
use conclave_cortex::{KnowledgeNode, NodeDraft, NodeId, NodeType, Relation, DEFAULT_PROMISE};
use tracing::{info, warn};

use crate::application::mission::{MissionContext, ARCHITECT};
use crate::domain::agent::AgentId;
use crate::domain::events::MissionEvent;
use crate::domain::synthesis::{ArchitectPayload, KnowledgeUpdate};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisOutcome {
    pub nodes_added: Vec<NodeId>,
    pub skipped_updates: usize,
    pub dropped_relations: usize,
    pub terminal: bool,
}

impl MissionContext {
    pub async fn apply_payload(&mut self, payload: &ArchitectPayload) -> SynthesisOutcome {
        let mut outcome = SynthesisOutcome {
            terminal: payload.is_terminal(),
            ..SynthesisOutcome::default()
        };

        self.track_stagnation(payload);

        if let Some(objective) = payload.new_objective.as_deref().map(str::trim) {
            if !objective.is_empty() && objective != self.objective {
                info!("Objective changed to: {}", objective);
                self.objective = objective.to_string();
                self.publish(MissionEvent::ObjectiveChanged {
                    objective: self.objective.clone(),
                    changed_at: Utc::now(),
                });
            }
        }

        if let Some(best) = payload.best_vector() {
            self.research_vector = Some(best.clone());
            let draft = NodeDraft::new(NodeType::ResearchVector, best.direction.clone(), ARCHITECT)
                .with_promise(best.promise);
            match self.add_node(draft).await {
                Ok(id) => outcome.nodes_added.push(id),
                Err(e) => warn!("Failed to record research vector: {}", e),
            }
        }

        self.apply_knowledge_updates(payload, &mut outcome).await;
        outcome
    }

    fn track_stagnation(&mut self, payload: &ArchitectPayload) {
        let counter = self.detector.record_stagnation(payload.stagnation_level);
        metrics::gauge!("conclave_stagnation_counter").set(counter as f64);
        if self.detector.needs_intervention() {
            warn!("Stagnation counter at {}; arming chaos intervention", counter);
            self.publish(MissionEvent::ChaosInterventionArmed {
                stagnation_counter: counter,
                armed_at: Utc::now(),
            });
        }

        let had_bias = self.detector.bias().is_some();
        match self.detector.record_focus(&payload.strategic_focus).cloned() {
            Some(warning) => {
                warn!(
                    "Focus bias: '{}' in {}/{} recent cycles",
                    warning.label, warning.occurrences, warning.window
                );
                self.publish(MissionEvent::BiasWarningRaised {
                    share: warning.share(),
                    label: warning.label,
                    raised_at: Utc::now(),
                });
            }
            None if had_bias => self.publish(MissionEvent::BiasWarningCleared { cleared_at: Utc::now() }),
            None => {}
        }
    }

    /// Ids are allocated for the whole batch first so updates may relate to
    /// each other; relations to anything else unknown are dropped.
    async fn apply_knowledge_updates(&mut self, payload: &ArchitectPayload, outcome: &mut SynthesisOutcome) {
        let mut accepted: Vec<(NodeType, &KnowledgeUpdate)> = Vec::new();
        for update in &payload.knowledge_updates {
            match update.node_type.parse::<NodeType>() {
                Ok(node_type) if !update.content.trim().is_empty() => accepted.push((node_type, update)),
                Ok(_) => {
                    warn!("Skipping knowledge update with empty content");
                    outcome.skipped_updates += 1;
                }
                Err(e) => {
                    warn!("Skipping knowledge update: {}", e);
                    outcome.skipped_updates += 1;
                }
            }
        }

        let ids: Vec<NodeId> = accepted
            .iter()
            .map(|(node_type, _)| self.graph.allocate_id(*node_type))
            .collect();
        let batch: HashSet<&NodeId> = ids.iter().collect();

        for ((node_type, update), id) in accepted.into_iter().zip(&ids) {
            let mut relations = Vec::new();
            for raw in &update.relations {
                match raw.parse::<Relation>() {
                    Ok(rel) if self.graph.contains(&rel.target) || batch.contains(&rel.target) => {
                        relations.push(rel)
                    }
                    Ok(rel) => {
                        warn!("Dropping relation {} of {}: target does not exist", rel, id);
                        outcome.dropped_relations += 1;
                    }
                    Err(e) => {
                        warn!("Dropping relation of {}: {}", id, e);
                        outcome.dropped_relations += 1;
                    }
                }
            }

            let promise = update
                .vector_index
                .and_then(|i| payload.research_vectors.get(i))
                .map(|v| v.promise)
                .or_else(|| self.research_vector.as_ref().map(|v| v.promise))
                .unwrap_or(DEFAULT_PROMISE);
            let creator = update
                .created_by
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(ARCHITECT);

            let mut draft = NodeDraft::new(node_type, update.content.trim(), creator).with_promise(promise);
            draft.relations = relations;
            let node = KnowledgeNode::from_draft(id.clone(), draft);
            let promise = node.promise_score;

            match self.insert_node(node).await {
                Ok(()) => {
                    self.registry.record_contribution(&AgentId::from(creator), promise);
                    outcome.nodes_added.push(id.clone());
                }
                Err(e) => {
                    warn!("Knowledge update {} rejected: {}", id, e);
                    outcome.skipped_updates += 1;
                }
            }
        }
    }
}
