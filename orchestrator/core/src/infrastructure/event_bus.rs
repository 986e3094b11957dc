// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Mission Events
//
// In-memory event streaming over a tokio broadcast channel. Feeds the CLI,
// the SSE endpoint and any other observer. Events are not persisted.

use crate::domain::agent::AgentId;
use crate::domain::events::MissionEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<MissionEvent>>,
}

impl EventBus {
    /// Capacity is how many events are buffered before slow receivers lag
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish(&self, event: MissionEvent) {
        debug!("Publishing event: {:?}", event);
        // send() only fails when nobody is listening
        if self.sender.send(event).is_err() {
            debug!("No subscribers listening to event");
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to events concerning one agent only
    pub fn subscribe_agent(&self, agent_id: AgentId) -> AgentEventReceiver {
        AgentEventReceiver {
            receiver: self.sender.subscribe(),
            agent_id,
        }
    }

    /// Raw broadcast receiver, for stream adapters
    pub fn raw_receiver(&self) -> broadcast::Receiver<MissionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<MissionEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<MissionEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    pub fn try_recv(&mut self) -> Result<MissionEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered to a single agent's log stream
pub struct AgentEventReceiver {
    receiver: broadcast::Receiver<MissionEvent>,
    agent_id: AgentId,
}

impl AgentEventReceiver {
    pub async fn recv(&mut self) -> Result<MissionEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if self.matches_agent(&event) {
                return Ok(event);
            }
        }
    }

    fn matches_agent(&self, event: &MissionEvent) -> bool {
        match event {
            MissionEvent::AgentDeployed { agent_id, .. }
            | MissionEvent::AgentRetired { agent_id, .. }
            | MissionEvent::AgentPromptModified { agent_id, .. }
            | MissionEvent::SpecialistOutput { agent_id, .. } => agent_id == &self.agent_id,
            MissionEvent::KnowledgeAdded { created_by, .. } => created_by == self.agent_id.as_str(),
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
