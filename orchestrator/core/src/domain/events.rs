// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use conclave_cortex::{CortexEvent, NodeId};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentId;

/// Events published while a mission runs. UI collaborators rebuild per-agent
/// log streams from these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MissionEvent {
    CycleStarted {
        cycle: u64,
        started_at: DateTime<Utc>,
    },
    CycleCompleted {
        cycle: u64,
        summary: String,
        strategic_focus: String,
        completed_at: DateTime<Utc>,
    },
    CycleAbandoned {
        cycle: u64,
        abandoned_at: DateTime<Utc>,
    },
    AgentDeployed {
        agent_id: AgentId,
        lifespan_cycles: Option<u64>,
        deployed_at: DateTime<Utc>,
    },
    AgentRetired {
        agent_id: AgentId,
        reason: String,
        retired_at: DateTime<Utc>,
    },
    AgentPromptModified {
        agent_id: AgentId,
        modified_at: DateTime<Utc>,
    },
    SpecialistOutput {
        agent_id: AgentId,
        cycle: u64,
        content: String,
        produced_at: DateTime<Utc>,
    },
    ToolInvoked {
        tool: String,
        arguments: serde_json::Value,
        invoked_at: DateTime<Utc>,
    },
    ToolFailed {
        tool: String,
        error: String,
        failed_at: DateTime<Utc>,
    },
    KnowledgeAdded {
        node_id: NodeId,
        node_type: String,
        created_by: String,
        added_at: DateTime<Utc>,
    },
    Cortex {
        event: CortexEvent,
    },
    BiasWarningRaised {
        label: String,
        share: f64,
        raised_at: DateTime<Utc>,
    },
    BiasWarningCleared {
        cleared_at: DateTime<Utc>,
    },
    ChaosInterventionArmed {
        stagnation_counter: u32,
        armed_at: DateTime<Utc>,
    },
    ObjectiveChanged {
        objective: String,
        changed_at: DateTime<Utc>,
    },
    MissionCompleted {
        cycle: u64,
        summary: String,
        completed_at: DateTime<Utc>,
    },
    MissionReset {
        reset_at: DateTime<Utc>,
    },
    MissionRestored {
        cycle: u64,
        nodes: usize,
        restored_at: DateTime<Utc>,
    },
    SchedulerStarted {
        started_at: DateTime<Utc>,
    },
    SchedulerStopped {
        stopped_at: DateTime<Utc>,
    },
    SchedulerHalted {
        error: String,
        halted_at: DateTime<Utc>,
    },
}
