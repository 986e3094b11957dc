// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory semantic index over knowledge nodes
//!
//! Holds one embedding per node id and answers top-k cosine similarity
//! queries. The index is never persisted; it is rebuilt from the graph.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::embedding::Embedder;
use crate::domain::graph::{KnowledgeNode, NodeId};

#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub node_id: NodeId,
    pub vector: Vec<f32>,
}

/// Ranked match returned by [`SemanticIndex::query`]
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredNode {
    pub node_id: NodeId,
    pub score: f64,
}

pub struct SemanticIndex {
    embedder: Arc<dyn Embedder>,
    entries: Vec<VectorEntry>,
}

impl SemanticIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: Vec::new(),
        }
    }

    /// Embed text; failures are logged and yield `None`
    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        match self.embedder.embed(text).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!("Embedding failed: {}", e);
                None
            }
        }
    }

    /// Store a vector for `node_id`, replacing any previous one
    pub fn add(&mut self, node_id: NodeId, vector: Vec<f32>) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.node_id == node_id) {
            existing.vector = vector;
        } else {
            self.entries.push(VectorEntry { node_id, vector });
        }
    }

    /// Embed a node's text and add it. Returns whether it was indexed.
    pub async fn index_node(&mut self, node: &KnowledgeNode) -> bool {
        match self.embed(&node.embedding_text()).await {
            Some(vector) => {
                self.add(node.id.clone(), vector);
                true
            }
            None => false,
        }
    }

    /// Top `k` entries by cosine similarity, descending; ties keep insertion order
    pub fn query_vector(&self, query: &[f32], k: usize) -> Vec<ScoredNode> {
        let mut scored: Vec<ScoredNode> = self
            .entries
            .iter()
            .map(|e| ScoredNode {
                node_id: e.node_id.clone(),
                score: cosine_similarity(query, &e.vector),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Embed `text` and return its nearest nodes. Empty on embedding failure.
    pub async fn query(&self, text: &str, k: usize) -> Vec<ScoredNode> {
        if self.entries.is_empty() || k == 0 {
            return Vec::new();
        }
        match self.embed(text).await {
            Some(vector) => self.query_vector(&vector, k),
            None => Vec::new(),
        }
    }

    /// Re-embed every node from scratch, reporting `(completed, total)` after each
    pub async fn rebuild_all<F>(&mut self, nodes: &[KnowledgeNode], mut progress: F) -> usize
    where
        F: FnMut(usize, usize),
    {
        self.entries.clear();
        let total = nodes.len();
        let mut indexed = 0;
        for (i, node) in nodes.iter().enumerate() {
            if self.index_node(node).await {
                indexed += 1;
            }
            progress(i + 1, total);
        }
        debug!("Rebuilt semantic index: {}/{} nodes embedded", indexed, total);
        indexed
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.entries.iter().any(|e| &e.node_id == node_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero-magnitude vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}
