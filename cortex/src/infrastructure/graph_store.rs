// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory knowledge graph store
//!
//! Nodes are kept in insertion order. Ids come from a single monotonically
//! increasing counter and are never reused, including across a snapshot
//! restore (the counter is bumped past any restored suffix).

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::domain::graph::{GraphError, KnowledgeNode, NodeDraft, NodeId, NodeType};

#[derive(Debug, Default, Clone)]
pub struct KnowledgeGraph {
    nodes: Vec<KnowledgeNode>,
    positions: HashMap<NodeId, usize>,
    counter: u64,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from persisted nodes and the persisted id counter
    pub fn restore(nodes: Vec<KnowledgeNode>, counter: u64) -> Result<Self, GraphError> {
        let mut graph = Self {
            counter,
            ..Self::default()
        };
        for node in nodes {
            graph.insert(node)?;
        }
        Ok(graph)
    }

    /// Current value of the id counter (last allocated suffix)
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Reserve the next id for a node of the given type
    pub fn allocate_id(&mut self, node_type: NodeType) -> NodeId {
        self.counter += 1;
        NodeId::compose(node_type, self.counter)
    }

    /// Insert a fully-formed node; duplicate ids are rejected
    pub fn insert(&mut self, node: KnowledgeNode) -> Result<(), GraphError> {
        if self.positions.contains_key(&node.id) {
            return Err(GraphError::DuplicateId(node.id));
        }
        if let Some(suffix) = node.id.counter_suffix() {
            self.counter = self.counter.max(suffix);
        }
        debug!("Inserting node {} ({})", node.id, node.node_type);
        self.positions.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Allocate an id and insert the draft in one step
    pub fn create(&mut self, draft: NodeDraft) -> Result<NodeId, GraphError> {
        let id = self.allocate_id(draft.node_type);
        self.insert(KnowledgeNode::from_draft(id.clone(), draft))?;
        Ok(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&KnowledgeNode> {
        self.positions.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.positions.contains_key(id)
    }

    /// All nodes in insertion order
    pub fn all(&self) -> &[KnowledgeNode] {
        &self.nodes
    }

    /// The `n` most recently inserted nodes, oldest first
    pub fn recent(&self, n: usize) -> &[KnowledgeNode] {
        let start = self.nodes.len().saturating_sub(n);
        &self.nodes[start..]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids targeted by a REFUTES or INVALIDATES relation of some other node.
    ///
    /// Recomputed on every call from the current relations.
    pub fn mark_invalidated(&self) -> HashSet<NodeId> {
        self.nodes
            .iter()
            .flat_map(|node| {
                node.relations
                    .iter()
                    .filter(move |rel| rel.is_invalidating() && rel.target != node.id)
                    .map(|rel| rel.target.clone())
            })
            .collect()
    }

    pub fn is_invalidated(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|node| {
            node.id != *id
                && node
                    .relations
                    .iter()
                    .any(|rel| rel.is_invalidating() && rel.target == *id)
        })
    }

    /// Set the formal verification flag; the only post-insert mutation
    pub fn set_verified(&mut self, id: &NodeId, verified: bool) -> Result<(), GraphError> {
        let pos = *self
            .positions
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        self.nodes[pos].verified = Some(verified);
        Ok(())
    }

    /// Subset of `ids` not present in the graph, in the given order
    pub fn missing<'a>(&self, ids: &[&'a str]) -> Vec<&'a str> {
        ids.iter()
            .copied()
            .filter(|id| !self.positions.contains_key(&NodeId::from(*id)))
            .collect()
    }

    /// Drop every node and reset the counter
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.positions.clear();
        self.counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::Relation;

    fn draft(node_type: NodeType, content: &str) -> NodeDraft {
        NodeDraft::new(node_type, content, "theorist")
    }

    #[test]
    fn test_ids_are_unique_and_counter_increases() {
        let mut graph = KnowledgeGraph::new();
        let mut last = 0;
        let mut seen = HashSet::new();
        for (i, node_type) in NodeType::ALL.iter().cycle().take(40).enumerate() {
            let id = graph.create(draft(*node_type, &format!("finding {i}"))).unwrap();
            assert!(graph.counter() > last);
            last = graph.counter();
            assert!(seen.insert(id));
        }
        assert_eq!(graph.len(), 40);
        assert_eq!(graph.counter(), 40);
    }

    #[test]
    fn test_insert_rejects_duplicate_ids() {
        let mut graph = KnowledgeGraph::new();
        let id = graph.create(draft(NodeType::Lemma, "a")).unwrap();
        let duplicate = KnowledgeNode::from_draft(id.clone(), draft(NodeType::Lemma, "b"));

        assert_eq!(graph.insert(duplicate), Err(GraphError::DuplicateId(id.clone())));
        assert_eq!(graph.get(&id).unwrap().content, "a");
    }

    #[test]
    fn test_invalidation_is_derived_from_relations() {
        let mut graph = KnowledgeGraph::new();
        let h1 = graph.create(draft(NodeType::Hypothesis, "h")).unwrap();
        let t2 = graph.create(draft(NodeType::Theorem, "t")).unwrap();
        graph
            .create(draft(NodeType::Refutation, "no").with_relation(Relation::new("REFUTES", h1.clone())))
            .unwrap();
        graph
            .create(draft(NodeType::Lemma, "yes").with_relation(Relation::new("SUPPORTS", t2.clone())))
            .unwrap();

        let invalidated = graph.mark_invalidated();
        assert_eq!(invalidated.len(), 1);
        assert!(invalidated.contains(&h1));
        assert!(graph.is_invalidated(&h1));
        assert!(!graph.is_invalidated(&t2));

        graph.create(draft(NodeType::Concept, "unrelated")).unwrap();
        assert_eq!(graph.mark_invalidated(), invalidated);

        graph
            .create(draft(NodeType::Abstraction, "z").with_relation(Relation::new("INVALIDATES", t2.clone())))
            .unwrap();
        assert!(graph.is_invalidated(&t2));
    }

    #[test]
    fn test_self_reference_does_not_invalidate() {
        let mut graph = KnowledgeGraph::new();
        let id = graph.allocate_id(NodeType::Hypothesis);
        let node = KnowledgeNode::from_draft(
            id.clone(),
            draft(NodeType::Hypothesis, "paradox").with_relation(Relation::new("REFUTES", id.clone())),
        );
        graph.insert(node).unwrap();
        assert!(!graph.is_invalidated(&id));
        assert!(graph.mark_invalidated().is_empty());
    }

    #[test]
    fn test_set_verified_and_missing() {
        let mut graph = KnowledgeGraph::new();
        let id = graph.create(draft(NodeType::Theorem, "t")).unwrap();
        graph.set_verified(&id, true).unwrap();
        assert_eq!(graph.get(&id).unwrap().verified, Some(true));

        let ghost = NodeId::from("T99");
        assert_eq!(graph.set_verified(&ghost, true), Err(GraphError::NodeNotFound(ghost)));
        assert_eq!(graph.missing(&["T1", "T99", "L5"]), vec!["T99", "L5"]);
    }

    #[test]
    fn test_restore_bumps_counter_past_restored_ids() {
        let nodes = vec![
            KnowledgeNode::from_draft(NodeId::from("H7"), draft(NodeType::Hypothesis, "h")),
            KnowledgeNode::from_draft(NodeId::from("L3"), draft(NodeType::Lemma, "l")),
        ];
        let mut graph = KnowledgeGraph::restore(nodes, 2).unwrap();
        assert_eq!(graph.counter(), 7);
        assert_eq!(graph.allocate_id(NodeType::Concept).as_str(), "C8");

        let dupes = vec![
            KnowledgeNode::from_draft(NodeId::from("H1"), draft(NodeType::Hypothesis, "a")),
            KnowledgeNode::from_draft(NodeId::from("H1"), draft(NodeType::Hypothesis, "b")),
        ];
        assert!(KnowledgeGraph::restore(dupes, 1).is_err());
    }

    #[test]
    fn test_recent_and_clear() {
        let mut graph = KnowledgeGraph::new();
        for i in 0..5 {
            graph.create(draft(NodeType::Concept, &i.to_string())).unwrap();
        }
        let recent: Vec<_> = graph.recent(2).iter().map(|n| n.content.as_str()).collect();
        assert_eq!(recent, vec!["3", "4"]);
        assert_eq!(graph.recent(10).len(), 5);

        graph.clear();
        assert!(graph.is_empty());
        assert_eq!(graph.counter(), 0);
    }
}
