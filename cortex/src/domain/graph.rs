// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Knowledge graph entities for the mission memory
//!
//! A [`KnowledgeNode`] is a typed finding with an ordered list of outgoing
//! [`Relation`]s. Relations serialize as `"ACTION:targetId"` strings so that a
//! persisted snapshot stays readable and stable across versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default promise score for nodes not motivated by a research vector.
pub const DEFAULT_PROMISE: f64 = 0.5;

/// Node identifier in the knowledge graph (`<TypeInitial><counter>`, e.g. `L12`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Compose an id from the type initial and the shared counter value.
    pub fn compose(node_type: NodeType, counter: u64) -> Self {
        Self(format!("{}{}", node_type.initial(), counter))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric counter suffix, if the id follows the `<Initial><counter>` format.
    pub fn counter_suffix(&self) -> Option<u64> {
        let digits = self.0.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        digits.parse().ok()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Type of finding recorded in the knowledge graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Theorem,
    Hypothesis,
    Refutation,
    Directive,
    Lemma,
    Concept,
    Analogy,
    ResearchVector,
    VerificationSuccess,
    VerificationFailure,
    CodeExperiment,
    Abstraction,
    SubGoal,
}

impl NodeType {
    pub const ALL: [NodeType; 13] = [
        NodeType::Theorem,
        NodeType::Hypothesis,
        NodeType::Refutation,
        NodeType::Directive,
        NodeType::Lemma,
        NodeType::Concept,
        NodeType::Analogy,
        NodeType::ResearchVector,
        NodeType::VerificationSuccess,
        NodeType::VerificationFailure,
        NodeType::CodeExperiment,
        NodeType::Abstraction,
        NodeType::SubGoal,
    ];

    /// Canonical upper-case label (`RESEARCH_VECTOR`)
    pub fn label(&self) -> &'static str {
        match self {
            NodeType::Theorem => "THEOREM",
            NodeType::Hypothesis => "HYPOTHESIS",
            NodeType::Refutation => "REFUTATION",
            NodeType::Directive => "DIRECTIVE",
            NodeType::Lemma => "LEMMA",
            NodeType::Concept => "CONCEPT",
            NodeType::Analogy => "ANALOGY",
            NodeType::ResearchVector => "RESEARCH_VECTOR",
            NodeType::VerificationSuccess => "VERIFICATION_SUCCESS",
            NodeType::VerificationFailure => "VERIFICATION_FAILURE",
            NodeType::CodeExperiment => "CODE_EXPERIMENT",
            NodeType::Abstraction => "ABSTRACTION",
            NodeType::SubGoal => "SUB_GOAL",
        }
    }

    /// First letter of the label, used as the id prefix
    pub fn initial(&self) -> char {
        self.label().chars().next().unwrap_or('N')
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NodeType {
    type Err = GraphError;

    /// Accepts `LEMMA`, `lemma`, `sub-goal`, `Research Vector`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        NodeType::ALL
            .iter()
            .copied()
            .find(|t| t.label() == normalized)
            .ok_or_else(|| GraphError::UnknownNodeType(s.to_string()))
    }
}

/// Directed, typed relation to another node (`REFUTES:H3`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Relation {
    pub action: String,
    pub target: NodeId,
}

impl Relation {
    pub fn new(action: impl AsRef<str>, target: impl Into<NodeId>) -> Self {
        Self {
            action: action.as_ref().trim().to_ascii_uppercase(),
            target: target.into(),
        }
    }

    /// REFUTES and INVALIDATES mark their target as invalidated
    pub fn is_invalidating(&self) -> bool {
        matches!(self.action.as_str(), "REFUTES" | "INVALIDATES")
    }
}

impl FromStr for Relation {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (action, target) = s
            .split_once(':')
            .ok_or_else(|| GraphError::MalformedRelation(s.to_string()))?;
        let (action, target) = (action.trim(), target.trim());
        if action.is_empty() || target.is_empty() {
            return Err(GraphError::MalformedRelation(s.to_string()));
        }
        Ok(Relation::new(action, NodeId(target.to_string())))
    }
}

impl TryFrom<String> for Relation {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Relation> for String {
    fn from(relation: Relation) -> Self {
        relation.to_string()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action, self.target)
    }
}

/// Finding in the knowledge graph.
///
/// Immutable after insertion except for `verified`. Invalidation is never
/// stored here; ask the graph store for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub content: String,
    #[serde(default)]
    pub relations: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    pub created_by: String,
    #[serde(default = "default_promise")]
    pub promise_score: f64,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeNode {
    pub fn from_draft(id: NodeId, draft: NodeDraft) -> Self {
        Self {
            id,
            node_type: draft.node_type,
            content: draft.content,
            relations: draft.relations,
            verified: None,
            created_by: draft.created_by,
            promise_score: draft.promise_score.clamp(0.0, 1.0),
            created_at: Utc::now(),
        }
    }

    /// Text used for embedding and prompts (`[LEMMA] content`)
    pub fn embedding_text(&self) -> String {
        format!("[{}] {}", self.node_type, self.content)
    }
}

fn default_promise() -> f64 {
    DEFAULT_PROMISE
}

/// Node contents before an id has been allocated
#[derive(Debug, Clone)]
pub struct NodeDraft {
    pub node_type: NodeType,
    pub content: String,
    pub relations: Vec<Relation>,
    pub created_by: String,
    pub promise_score: f64,
}

impl NodeDraft {
    pub fn new(node_type: NodeType, content: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            node_type,
            content: content.into(),
            relations: Vec::new(),
            created_by: created_by.into(),
            promise_score: DEFAULT_PROMISE,
        }
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn with_promise(mut self, promise: f64) -> Self {
        self.promise_score = promise;
        self
    }
}

/// Errors raised by the knowledge graph store
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("Node id already exists: {0}")]
    DuplicateId(NodeId),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Malformed relation '{0}', expected ACTION:targetId")]
    MalformedRelation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_composition() {
        let id = NodeId::compose(NodeType::ResearchVector, 42);
        assert_eq!(id.as_str(), "R42");
        assert_eq!(id.counter_suffix(), Some(42));
        assert_eq!(NodeId::from("junk").counter_suffix(), None);
    }

    #[test]
    fn test_node_type_parsing() {
        assert_eq!("lemma".parse::<NodeType>().unwrap(), NodeType::Lemma);
        assert_eq!("Sub-Goal".parse::<NodeType>().unwrap(), NodeType::SubGoal);
        assert_eq!("research vector".parse::<NodeType>().unwrap(), NodeType::ResearchVector);
        assert!("PROOF".parse::<NodeType>().is_err());
    }

    #[test]
    fn test_relation_parsing() {
        let relation: Relation = "refutes: H3".parse().unwrap();
        assert_eq!(relation.action, "REFUTES");
        assert_eq!(relation.target, NodeId::from("H3"));
        assert!(relation.is_invalidating());
        assert_eq!(relation.to_string(), "REFUTES:H3");

        assert!(!Relation::new("SUPPORTS", "T1").is_invalidating());
        assert!("no-colon".parse::<Relation>().is_err());
        assert!(":H1".parse::<Relation>().is_err());
    }

    #[test]
    fn test_node_serializes_relations_as_strings() {
        let draft = NodeDraft::new(NodeType::Lemma, "x > 0", "theorist")
            .with_relation(Relation::new("SUPPORTS", "T1"))
            .with_promise(1.7);
        let node = KnowledgeNode::from_draft(NodeId::from("L2"), draft);
        assert_eq!(node.promise_score, 1.0);

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "LEMMA");
        assert_eq!(json["relations"][0], "SUPPORTS:T1");
        assert!(json.get("verified").is_none());
    }
}
