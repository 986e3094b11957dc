// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod mission;
pub mod lifecycle;
pub mod specialist;
pub mod tool_effects;
pub mod tool_dispatch;
pub mod synthesis;
pub mod persistence;
pub mod scheduler;
pub mod mission_factory;

// Re-export the control surface for convenience
pub use mission::{MissionContext, MissionServices, NodeView};
pub use mission_factory::build_scheduler;
pub use persistence::PersistenceManager;
pub use scheduler::{
    AgentStatus, CycleError, CycleScheduler, GraphView, MissionStatus, SchedulerError, SchedulerState,
};
pub use tool_effects::{ToolHandler, ToolTable};
