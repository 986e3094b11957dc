// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Agent lifecycle use cases: deploy, retire, prompt evolution and lifespan
// expiry. Registry rules live in the domain; these wrappers add events.

use chrono::Utc;
use tracing::info;

use crate::application::mission::MissionContext;
use crate::domain::agent::{AgentId, RegistryError, SpecialistAgent};
use crate::domain::events::MissionEvent;

impl MissionContext {
    pub fn deploy_agent(&mut self, agent: SpecialistAgent) -> Result<(), RegistryError> {
        let agent_id = agent.id.clone();
        let lifespan_cycles = agent.lifespan_cycles;
        self.registry.deploy(agent)?;
        self.publish(MissionEvent::AgentDeployed {
            agent_id,
            lifespan_cycles,
            deployed_at: Utc::now(),
        });
        Ok(())
    }

    /// Returns false when the id was not active (retiring twice is a no-op)
    pub fn retire_agent(&mut self, agent_id: &AgentId, reason: &str) -> Result<bool, RegistryError> {
        match self.registry.retire(agent_id, reason)? {
            Some(_) => {
                self.forget_outputs(agent_id);
                self.publish(MissionEvent::AgentRetired {
                    agent_id: agent_id.clone(),
                    reason: reason.to_string(),
                    retired_at: Utc::now(),
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn modify_agent_prompt(&mut self, agent_id: &AgentId, prompt: &str) -> Result<(), RegistryError> {
        self.registry.modify_prompt(agent_id, prompt)?;
        info!("Mission prompt of '{}' rewritten", agent_id);
        self.publish(MissionEvent::AgentPromptModified {
            agent_id: agent_id.clone(),
            modified_at: Utc::now(),
        });
        Ok(())
    }

    /// Retire every agent whose lifespan has run out at the current cycle
    pub fn run_lifecycle_check(&mut self) -> Vec<AgentId> {
        let expired = self.registry.check_expirations(self.cycle);
        for agent_id in &expired {
            self.forget_outputs(agent_id);
            self.publish(MissionEvent::AgentRetired {
                agent_id: agent_id.clone(),
                reason: format!("lifespan expired at cycle {}", self.cycle),
                retired_at: Utc::now(),
            });
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::THEORIST;
    use crate::domain::config::MissionSettings;
    use crate::infrastructure::event_bus::EventBus;
    use conclave_cortex::HashingEmbedder;
    use std::sync::Arc;

    fn context() -> MissionContext {
        MissionContext::new(
            MissionSettings::default(),
            Arc::new(HashingEmbedder::default()),
            EventBus::new(64),
        )
    }

    #[test]
    fn test_expiry_at_exact_lifespan() {
        let mut ctx = context();
        ctx.deploy_agent(SpecialistAgent::new("short", "p", 2).with_lifespan(Some(3)))
            .unwrap();
        ctx.deploy_agent(SpecialistAgent::new("long", "p", 2).with_lifespan(Some(4)))
            .unwrap();
        let mut rx = ctx.events().subscribe();

        ctx.cycle = 5;
        let expired = ctx.run_lifecycle_check();

        assert_eq!(expired, vec![AgentId::from("short")]);
        assert!(ctx.registry.contains(&AgentId::from("long")));
        assert!(ctx.registry.metric(&AgentId::from("short")).is_none());
        assert!(matches!(
            rx.try_recv().unwrap(),
            MissionEvent::AgentRetired { agent_id, .. } if agent_id.as_str() == "short"
        ));
    }

    #[test]
    fn test_retire_drops_output_history() {
        let mut ctx = context();
        let id = AgentId::from("number_theorist");
        ctx.deploy_agent(SpecialistAgent::new(id.as_str(), "p", 0)).unwrap();
        ctx.record_output(&id, "a result");

        assert!(ctx.retire_agent(&id, "done").unwrap());
        assert!(ctx.recent_outputs(&id, 5).is_empty());
        assert!(!ctx.retire_agent(&id, "again").unwrap());
    }

    #[test]
    fn test_seed_agents_cannot_be_retired() {
        let mut ctx = context();
        let err = ctx.retire_agent(&AgentId::from(THEORIST), "bored").unwrap_err();
        assert_eq!(err, RegistryError::Permanent(AgentId::from(THEORIST)));
        assert!(ctx.registry.contains(&AgentId::from(THEORIST)));
    }

    #[test]
    fn test_modify_prompt_publishes_event() {
        let mut ctx = context();
        let mut rx = ctx.events().subscribe();
        ctx.modify_agent_prompt(&AgentId::from(THEORIST), "Think in generating functions.")
            .unwrap();

        assert_eq!(
            ctx.registry.get(&AgentId::from(THEORIST)).unwrap().mission_prompt,
            "Think in generating functions."
        );
        assert!(matches!(rx.try_recv().unwrap(), MissionEvent::AgentPromptModified { .. }));
        assert!(ctx.modify_agent_prompt(&AgentId::from("ghost"), "x").is_err());
    }
}
