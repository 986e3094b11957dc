// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Specialist Phase - Application Layer
//!
//! Requests are composed under the mission lock, then every non-reactive
//! specialist is called in parallel without it. Nothing here mutates shared
//! state; outputs are recorded by the scheduler afterwards. The running check
//! is consulted after every completed call, so a stop drops the calls still
//! in flight.

use std::fmt::Write as _;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info};

use crate::application::mission::{MissionContext, MissionServices, NodeView};
use crate::domain::agent::{AgentId, SpecialistAgent};
use crate::domain::llm::{GenerationRequest, OracleError};
use crate::domain::sandbox::extract_code_block;

/// How many of the newest nodes every specialist sees
pub const RECENT_NODE_COUNT: usize = 5;

const TEAM_BRIEFING: &str = "You are one specialist in a research team working toward the objective \
below. Contribute one focused, concrete result this cycle. Build on valid findings and never rely on \
findings marked INVALIDATED.";

#[derive(Debug, Clone)]
pub struct SpecialistTask {
    pub agent_id: AgentId,
    pub can_execute_code: bool,
    pub request: GenerationRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpecialistOutcome {
    pub agent_id: AgentId,
    pub content: String,
}

impl MissionContext {
    /// One request per active non-reactive agent, in registry order
    pub async fn prepare_specialist_tasks(&self) -> Vec<SpecialistTask> {
        let query = match &self.research_vector {
            Some(vector) => format!("{}\n{}", self.objective, vector.direction),
            None => self.objective.clone(),
        };
        let related = self.related_nodes(&query, self.settings().retrieval_k).await;
        let recent: Vec<NodeView> = {
            let invalidated = self.graph.mark_invalidated();
            self.graph
                .recent(RECENT_NODE_COUNT)
                .iter()
                .map(|node| NodeView {
                    invalidated: invalidated.contains(&node.id),
                    node: node.clone(),
                })
                .collect()
        };
        let briefing = self.compose_briefing(&related, &recent);

        self.registry
            .specialists()
            .map(|agent| SpecialistTask {
                agent_id: agent.id.clone(),
                can_execute_code: agent.can_execute_code(),
                request: GenerationRequest::one_shot(system_prompt(agent), briefing.clone()),
            })
            .collect()
    }

    fn compose_briefing(&self, related: &[NodeView], recent: &[NodeView]) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "OBJECTIVE:\n{}\n", self.objective);
        match &self.research_vector {
            Some(vector) => {
                let _ = writeln!(
                    text,
                    "CURRENT RESEARCH VECTOR:\n{} (promise {:.2})\n",
                    vector.direction, vector.promise
                );
            }
            None => text.push_str("CURRENT RESEARCH VECTOR:\nnone yet\n\n"),
        }
        text.push_str("RELATED FINDINGS:\n");
        write_nodes(&mut text, related);
        text.push_str("\nRECENT FINDINGS:\n");
        write_nodes(&mut text, recent);
        text
    }
}

fn system_prompt(agent: &SpecialistAgent) -> String {
    format!("{}\n\n{}", agent.mission_prompt, TEAM_BRIEFING)
}

/// Render nodes as a bullet list with type and validity markers
pub fn write_nodes(text: &mut String, nodes: &[NodeView]) {
    if nodes.is_empty() {
        text.push_str("(none)\n");
        return;
    }
    for view in nodes {
        let node = &view.node;
        let _ = write!(text, "- [{}] {}", node.id, node.node_type);
        if view.invalidated {
            text.push_str(" INVALIDATED");
        }
        match node.verified {
            Some(true) => text.push_str(" VERIFIED"),
            Some(false) => text.push_str(" VERIFICATION_FAILED"),
            None => {}
        }
        let _ = writeln!(text, ": {}", node.content);
    }
}

/// Call the specialist oracle; run its code block in the sandbox when permitted
pub async fn run_specialist(
    task: SpecialistTask,
    services: &MissionServices,
) -> Result<SpecialistOutcome, OracleError> {
    let response = services.oracles.specialist.generate(&task.request).await?;
    let mut content = response.text_or_empty().trim().to_string();

    if task.can_execute_code {
        if let Some(code) = extract_code_block(&content) {
            debug!("Running experiment code from '{}'", task.agent_id);
            let output = services.sandbox.execute(code).await;
            let _ = write!(
                content,
                "\n\n[EXECUTION OUTPUT]\nstdout:\n{}\nstderr:\n{}",
                output.stdout.trim_end(),
                output.stderr.trim_end()
            );
        }
    }

    Ok(SpecialistOutcome {
        agent_id: task.agent_id,
        content,
    })
}

/// Run every task concurrently. Results keep task order.
///
/// Returns `None` once `still_running` reports false after a completion.
pub async fn run_specialist_phase(
    tasks: Vec<SpecialistTask>,
    services: &MissionServices,
    still_running: impl Fn() -> bool,
) -> Option<Vec<Result<SpecialistOutcome, OracleError>>> {
    info!("Specialist phase: {} agents", tasks.len());
    let mut pending: FuturesUnordered<_> = tasks
        .into_iter()
        .enumerate()
        .map(|(index, task)| async move { (index, run_specialist(task, services).await) })
        .collect();

    let mut results = Vec::with_capacity(pending.len());
    while let Some((index, result)) = pending.next().await {
        if !still_running() {
            debug!("Specialist phase abandoned with {} call(s) in flight", pending.len());
            return None;
        }
        results.push((index, result));
    }
    results.sort_by_key(|(index, _)| *index);
    Some(results.into_iter().map(|(_, result)| result).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::{EXPERIMENTALIST, THEORIST};
    use crate::domain::config::MissionSettings;
    use crate::domain::llm::{GenerationOracle, GenerationResponse, GroundedAnswer, OracleSet};
    use crate::domain::sandbox::{CodeSandbox, SandboxOutput};
    use crate::domain::synthesis::ResearchVector;
    use crate::infrastructure::event_bus::EventBus;
    use async_trait::async_trait;
    use conclave_cortex::{HashingEmbedder, NodeDraft, NodeType, Relation};
    use std::sync::{Arc, Mutex};

    struct EchoOracle {
        reply: String,
    }

    #[async_trait]
    impl GenerationOracle for EchoOracle {
        async fn generate(&self, _request: &GenerationRequest) -> Result<GenerationResponse, OracleError> {
            Ok(GenerationResponse::text(self.reply.clone()))
        }

        async fn grounded_search(&self, _query: &str) -> Result<GroundedAnswer, OracleError> {
            Ok(GroundedAnswer::default())
        }
    }

    #[derive(Default)]
    struct RecordingSandbox {
        sources: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CodeSandbox for RecordingSandbox {
        async fn execute(&self, source: &str) -> SandboxOutput {
            self.sources.lock().unwrap().push(source.to_string());
            SandboxOutput {
                stdout: "2\n".into(),
                stderr: String::new(),
            }
        }
    }

    fn services(reply: &str, sandbox: Arc<RecordingSandbox>) -> MissionServices {
        MissionServices {
            oracles: OracleSet::uniform(Arc::new(EchoOracle { reply: reply.into() })),
            sandbox,
        }
    }

    fn task(agent: &str, can_execute_code: bool) -> SpecialistTask {
        SpecialistTask {
            agent_id: AgentId::from(agent),
            can_execute_code,
            request: GenerationRequest::one_shot("s", "u"),
        }
    }

    #[tokio::test]
    async fn test_tasks_cover_non_reactive_agents_only() {
        let mut ctx = MissionContext::new(
            MissionSettings::default(),
            Arc::new(HashingEmbedder::default()),
            EventBus::new(16),
        );
        let h = ctx
            .add_node(NodeDraft::new(NodeType::Hypothesis, "prime gaps are bounded", THEORIST))
            .await
            .unwrap();
        ctx.add_node(
            NodeDraft::new(NodeType::Refutation, "the bound is circular", "skeptic")
                .with_relation(Relation::new("REFUTES", h)),
        )
        .await
        .unwrap();
        ctx.research_vector = Some(ResearchVector {
            direction: "sieve weights".into(),
            promise: 0.8,
        });

        let tasks = ctx.prepare_specialist_tasks().await;
        let ids: Vec<&str> = tasks.iter().map(|t| t.agent_id.as_str()).collect();
        assert_eq!(ids, vec!["theorist", "experimentalist", "formalist", "synthesist"]);
        assert!(tasks[1].can_execute_code);
        assert!(!tasks[0].can_execute_code);

        let crate::domain::llm::ChatMessage::User { content } = &tasks[0].request.messages[1] else {
            panic!("expected user briefing");
        };
        assert!(content.contains(&ctx.objective));
        assert!(content.contains("sieve weights (promise 0.80)"));
        assert!(content.contains("- [H1] HYPOTHESIS INVALIDATED: prime gaps are bounded"));
    }

    #[tokio::test]
    async fn test_code_block_is_executed_for_capable_agent() {
        let sandbox = Arc::new(RecordingSandbox::default());
        let services = services("Try this:\n```python\nprint(1 + 1)\n```", sandbox.clone());

        let outcome = run_specialist(task(EXPERIMENTALIST, true), &services).await.unwrap();

        assert_eq!(*sandbox.sources.lock().unwrap(), vec!["print(1 + 1)".to_string()]);
        assert!(outcome.content.ends_with("[EXECUTION OUTPUT]\nstdout:\n2\nstderr:\n"));
    }

    #[tokio::test]
    async fn test_code_block_ignored_without_capability() {
        let sandbox = Arc::new(RecordingSandbox::default());
        let services = services("```python\nprint(1)\n```", sandbox.clone());

        let results = run_specialist_phase(
            vec![task(THEORIST, false), task("formalist", false)],
            &services,
            || true,
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 2);
        assert!(sandbox.sources.lock().unwrap().is_empty());
        assert_eq!(results[1].as_ref().unwrap().agent_id.as_str(), "formalist");
    }

    /// Answers every agent except the formalist, whose call never returns
    struct StallingOracle;

    #[async_trait]
    impl GenerationOracle for StallingOracle {
        async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, OracleError> {
            let stalls = matches!(
                &request.messages[0],
                crate::domain::llm::ChatMessage::System { content } if content == "formalist"
            );
            if stalls {
                std::future::pending::<()>().await;
            }
            Ok(GenerationResponse::text("done"))
        }

        async fn grounded_search(&self, _query: &str) -> Result<GroundedAnswer, OracleError> {
            Ok(GroundedAnswer::default())
        }
    }

    fn named_task(agent: &str) -> SpecialistTask {
        SpecialistTask {
            agent_id: AgentId::from(agent),
            can_execute_code: false,
            request: GenerationRequest::one_shot(agent, "u"),
        }
    }

    #[tokio::test]
    async fn test_stop_abandons_phase_without_waiting_for_slow_agents() {
        let services = MissionServices {
            oracles: OracleSet::uniform(Arc::new(StallingOracle)),
            sandbox: Arc::new(RecordingSandbox::default()),
        };
        let checks = std::sync::atomic::AtomicUsize::new(0);

        let results = run_specialist_phase(vec![named_task(THEORIST), named_task("formalist")], &services, || {
            checks.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            false
        })
        .await;

        assert!(results.is_none());
        assert_eq!(checks.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
