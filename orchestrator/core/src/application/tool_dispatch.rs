// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Architect Tool Dispatch Loop - Application Layer
//!
//! Bounded reason-act-observe loop:
//!
//! ```text
//! request ──► tool call? ──yes──► apply first call ──► append result ──┐
//!    ▲            │ no                                                   │
//!    │            ▼                                                      │
//!    │      parse payload                                                │
//!    └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the first call of a batch is applied per round. After
//! `max_tool_rounds` rounds one last request goes out without tool
//! declarations. The running check happens before every tool effect, so a
//! stopped mission is never mutated by a stale cycle.

use std::fmt::Write as _;

use tracing::{debug, info, warn};

use crate::application::mission::{MissionContext, MissionServices};
use crate::application::scheduler::CycleError;
use crate::application::specialist::SpecialistOutcome;
use crate::application::tool_effects::ToolTable;
use crate::domain::llm::{ChatMessage, GenerationRequest};
use crate::domain::synthesis::{parse_payload, payload_schema, ArchitectPayload, TERMINAL_MARKER};
use crate::domain::tool::architect_tool_declarations;
use conclave_cortex::NodeType;

const CHAOS_DIRECTIVE: &str = "CHAOS INTERVENTION: the team has stagnated for several cycles. \
Abandon the current line of attack. Propose a radically different strategy, deploy agents with \
unusual perspectives, or retire agents that keep repeating themselves.";

const BUDGET_EXHAUSTED: &str = "Tool budget exhausted for this cycle. Reply now with the final JSON \
synthesis object only.";

fn architect_system_prompt() -> String {
    let types: Vec<&str> = NodeType::ALL.iter().map(|t| t.label()).collect();
    format!(
        "You are the Architect of an autonomous research team. Each cycle you read the \
         specialists' contributions and the shared knowledge graph, act through tools, and finish \
         with a synthesis.\n\n\
         Call at most one tool per turn; you will see its result before choosing the next step.\n\n\
         When you are done, reply with one JSON object with the keys: summary, strategic_focus \
         (short label of the area you are focusing on), stagnation_level (0 if the team made \
         progress, higher the more it is stuck), new_objective (optional), research_vectors \
         (list of {{direction, promise in [0, 1]}}), knowledge_updates (list of {{type, content, \
         relations, created_by, vector_index}}).\n\
         Node types: {}.\n\
         Relations are \"ACTION:nodeId\" strings; REFUTES or INVALIDATES marks the target invalid.\n\
         Start the summary with {} only when the objective has been fully achieved.",
        types.join(", "),
        TERMINAL_MARKER
    )
}

impl MissionContext {
    /// Mission state as the architect sees it at the start of its phase
    pub fn compose_architect_briefing(&self, outputs: &[SpecialistOutcome]) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "CYCLE: {}", self.cycle);
        let _ = writeln!(text, "OBJECTIVE: {}", self.objective);
        match &self.research_vector {
            Some(v) => {
                let _ = writeln!(text, "CURRENT RESEARCH VECTOR: {} (promise {:.2})", v.direction, v.promise);
            }
            None => text.push_str("CURRENT RESEARCH VECTOR: none\n"),
        }
        let _ = writeln!(
            text,
            "STAGNATION COUNTER: {} (threshold {})",
            self.detector.counter(),
            self.detector.threshold()
        );
        if self.detector.needs_intervention() {
            let _ = writeln!(text, "\n{}", CHAOS_DIRECTIVE);
        }
        if let Some(bias) = self.detector.bias() {
            let _ = writeln!(
                text,
                "\nBIAS WARNING: '{}' was the focus in {} of the last {} cycles. Deliberately explore elsewhere.",
                bias.label, bias.occurrences, bias.window
            );
        }
        let history = self.detector.focus_history();
        if !history.is_empty() {
            let _ = writeln!(text, "FOCUS HISTORY: {}", history.join(" -> "));
        }

        text.push_str("\nACTIVE AGENTS:\n");
        for agent in self.registry.active() {
            let metric = self.registry.metric(&agent.id).copied().unwrap_or_default();
            let _ = write!(
                text,
                "- {}{}: nodes={} avg_promise={:.2}",
                agent.id,
                if agent.reactive { " (reactive)" } else { "" },
                metric.nodes_created,
                metric.average_promise()
            );
            if let Some(lifespan) = agent.lifespan_cycles {
                let _ = write!(text, " lifespan={} created={}", lifespan, agent.creation_cycle);
            }
            text.push('\n');
        }

        let invalidated = self.graph.mark_invalidated();
        let _ = writeln!(text, "\nKNOWLEDGE GRAPH ({} nodes):", self.graph.len());
        for node in self.graph.all() {
            let _ = write!(text, "- [{}] {}", node.id, node.node_type);
            if invalidated.contains(&node.id) {
                text.push_str(" INVALIDATED");
            }
            if let Some(verified) = node.verified {
                text.push_str(if verified { " VERIFIED" } else { " VERIFICATION_FAILED" });
            }
            let _ = write!(text, " by {}: {}", node.created_by, node.content);
            if !node.relations.is_empty() {
                let relations: Vec<String> = node.relations.iter().map(|r| r.to_string()).collect();
                let _ = write!(text, " [{}]", relations.join(", "));
            }
            text.push('\n');
        }

        text.push_str("\nSPECIALIST OUTPUTS THIS CYCLE:\n");
        if outputs.is_empty() {
            text.push_str("(none)\n");
        }
        for output in outputs {
            let _ = writeln!(text, "### {}\n{}\n", output.agent_id, output.content);
        }
        text
    }
}

pub struct ArchitectPhase<'a> {
    pub tools: &'a ToolTable,
    pub services: &'a MissionServices,
    pub max_rounds: u32,
}

impl ArchitectPhase<'_> {
    pub async fn run<F>(
        &self,
        ctx: &mut MissionContext,
        outputs: &[SpecialistOutcome],
        still_running: F,
    ) -> Result<ArchitectPayload, CycleError>
    where
        F: Fn() -> bool + Send + Sync,
    {
        let declarations = architect_tool_declarations();
        let mut messages = vec![
            ChatMessage::system(architect_system_prompt()),
            ChatMessage::user(ctx.compose_architect_briefing(outputs)),
        ];

        for round in 1..=self.max_rounds {
            let request = GenerationRequest {
                messages: messages.clone(),
                tools: declarations.clone(),
                ..GenerationRequest::default()
            };
            let response = self.services.oracles.architect.generate(&request).await?;

            let Some(call) = response.tool_calls.first().cloned() else {
                debug!("Architect finished after {} round(s)", round);
                return Ok(parse_payload(response.text.as_deref())?);
            };
            if response.tool_calls.len() > 1 {
                debug!(
                    "Architect requested {} tool calls; applying only '{}'",
                    response.tool_calls.len(),
                    call.name
                );
            }
            if !still_running() {
                return Err(CycleError::Abandoned);
            }

            let result = self.tools.dispatch(ctx, self.services, &call).await?;
            messages.push(ChatMessage::Assistant {
                content: response.text.clone(),
                tool_calls: vec![call.clone()],
            });
            messages.push(ChatMessage::Tool {
                call_id: call.id,
                name: call.name,
                content: result.to_string(),
            });
        }

        warn!("Architect reached the tool round limit ({}); requesting final synthesis", self.max_rounds);
        messages.push(ChatMessage::user(BUDGET_EXHAUSTED));
        let request = GenerationRequest {
            messages,
            tools: Vec::new(),
            response_schema: Some(payload_schema()),
            ..GenerationRequest::default()
        };
        let response = self.services.oracles.architect.generate(&request).await?;
        let payload = parse_payload(response.text.as_deref())?;
        info!("Architect synthesis received after tool budget was exhausted");
        Ok(payload)
    }
}
