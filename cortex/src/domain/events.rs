// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the mission memory
//!
//! Published by the orchestrator's event bus so observers can mirror the
//! graph without reading the store directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::graph::{NodeId, NodeType};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CortexEvent {
    /// A node was inserted into the knowledge graph
    NodeInserted {
        node_id: NodeId,
        node_type: NodeType,
        created_by: String,
        promise_score: f64,
        timestamp: DateTime<Utc>,
    },

    /// A node's formal verification flag was set
    NodeVerified {
        node_id: NodeId,
        verified: bool,
        timestamp: DateTime<Utc>,
    },

    /// The semantic index re-embedded one more node during a rebuild
    IndexRebuildProgress {
        completed: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },
}
