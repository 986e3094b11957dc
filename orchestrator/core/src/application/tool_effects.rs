// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Tool Effects - Application Layer
//!
//! Handler table for the architect's tools. Each handler validates the ids it
//! references before touching the mission, so a bad reference is reported
//! back to the oracle and never mutates anything.
//!
//! Only [`ToolError::Oracle`] escapes [`ToolTable::dispatch`]; every other
//! failure becomes a `{"status": "error"}` result.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use conclave_cortex::{CortexEvent, NodeDraft, NodeId, NodeType, Relation};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::application::mission::{verification_probability, MissionContext, MissionServices};
use crate::domain::agent::{AgentId, SpecialistAgent, FORMALIST, LATERAL_THINKER, SKEPTIC};
use crate::domain::events::MissionEvent;
use crate::domain::llm::{GenerationRequest, OracleError, ToolInvocation};
use crate::domain::tool::{
    optional_str, optional_u64, required_str, string_list, success, ToolArgs, ToolError, CHALLENGE_NODE,
    DEPLOY_AGENT, EXECUTE_CODE, INVOKE_LATERAL_THINKER, MODIFY_AGENT_PROMPT, PEER_REVIEW,
    REQUEST_FORMAL_VERIFICATION, RETIRE_AGENT, WEB_SEARCH,
};

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &mut MissionContext,
        services: &MissionServices,
        args: &ToolArgs,
    ) -> Result<Value, ToolError>;
}

/// Tool name -> handler
#[derive(Clone, Default)]
pub struct ToolTable {
    handlers: HashMap<&'static str, Arc<dyn ToolHandler>>,
}

impl ToolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with all nine architect tools registered
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register(INVOKE_LATERAL_THINKER, Arc::new(InvokeLateralThinker));
        table.register(CHALLENGE_NODE, Arc::new(ChallengeNode));
        table.register(DEPLOY_AGENT, Arc::new(DeployAgent));
        table.register(REQUEST_FORMAL_VERIFICATION, Arc::new(RequestFormalVerification));
        table.register(EXECUTE_CODE, Arc::new(ExecuteCode));
        table.register(RETIRE_AGENT, Arc::new(RetireAgent));
        table.register(WEB_SEARCH, Arc::new(WebSearch));
        table.register(MODIFY_AGENT_PROMPT, Arc::new(ModifyAgentPrompt));
        table.register(PEER_REVIEW, Arc::new(PeerReview));
        table
    }

    pub fn register(&mut self, name: &'static str, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(name, handler);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Apply one tool call and return the result to feed back to the oracle
    pub async fn dispatch(
        &self,
        ctx: &mut MissionContext,
        services: &MissionServices,
        call: &ToolInvocation,
    ) -> Result<Value, OracleError> {
        info!("Architect invoked tool '{}'", call.name);
        metrics::counter!("conclave_tool_calls_total", "tool" => call.name.clone()).increment(1);
        ctx.publish(MissionEvent::ToolInvoked {
            tool: call.name.clone(),
            arguments: Value::Object(call.arguments.clone()),
            invoked_at: Utc::now(),
        });

        let outcome = match self.handlers.get(call.name.as_str()) {
            Some(handler) => handler.handle(ctx, services, &call.arguments).await,
            None => Err(ToolError::UnknownTool(call.name.clone())),
        };

        match outcome {
            Ok(result) => Ok(result),
            Err(ToolError::Oracle(e)) => Err(e),
            Err(e) => {
                warn!("Tool '{}' failed: {}", call.name, e);
                metrics::counter!("conclave_tool_failures_total", "tool" => call.name.clone()).increment(1);
                ctx.publish(MissionEvent::ToolFailed {
                    tool: call.name.clone(),
                    error: e.to_string(),
                    failed_at: Utc::now(),
                });
                Ok(e.to_result())
            }
        }
    }
}

fn require_nodes(ctx: &MissionContext, ids: &[&str]) -> Result<(), ToolError> {
    let missing = ctx.graph.missing(ids);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ToolError::MissingNodes(missing.into_iter().map(String::from).collect()))
    }
}

fn describe_node(ctx: &MissionContext, id: &str) -> String {
    let id = NodeId::from(id);
    match ctx.graph.get(&id) {
        Some(node) => {
            let flag = if ctx.graph.is_invalidated(&id) { " (INVALIDATED)" } else { "" };
            format!("[{}] {}{}: {}", node.id, node.node_type, flag, node.content)
        }
        None => format!("[{}] (unknown)", id),
    }
}

fn agent_prompt(ctx: &MissionContext, id: &str) -> Result<String, ToolError> {
    ctx.registry
        .get(&AgentId::from(id))
        .map(|agent| agent.mission_prompt.clone())
        .ok_or_else(|| ToolError::UnknownAgent(id.to_string()))
}

async fn consult(services: &MissionServices, system: String, user: String) -> Result<String, ToolError> {
    let response = services
        .oracles
        .specialist
        .generate(&GenerationRequest::one_shot(system, user))
        .await?;
    Ok(response.text_or_empty().trim().to_string())
}

pub struct InvokeLateralThinker;

#[async_trait]
impl ToolHandler for InvokeLateralThinker {
    async fn handle(
        &self,
        ctx: &mut MissionContext,
        services: &MissionServices,
        args: &ToolArgs,
    ) -> Result<Value, ToolError> {
        let a = required_str(args, "node_id_a")?;
        let b = required_str(args, "node_id_b")?;
        require_nodes(ctx, &[a, b])?;

        let prompt = agent_prompt(ctx, LATERAL_THINKER)?;
        let request = format!(
            "FINDING A\n{}\n\nFINDING B\n{}\n\nConstruct an ABSTRACTION or ANALOGY that unifies both findings. \
             Name the shared structure and one testable consequence.",
            describe_node(ctx, a),
            describe_node(ctx, b)
        );
        let abstraction = consult(services, prompt, request).await?;
        ctx.record_output(&AgentId::from(LATERAL_THINKER), abstraction.clone());

        Ok(success(json!({
            "agent_id": LATERAL_THINKER,
            "suggested_type": NodeType::Abstraction.label(),
            "abstraction": abstraction,
        })))
    }
}

pub struct ChallengeNode;

#[async_trait]
impl ToolHandler for ChallengeNode {
    async fn handle(
        &self,
        ctx: &mut MissionContext,
        services: &MissionServices,
        args: &ToolArgs,
    ) -> Result<Value, ToolError> {
        let node_id = required_str(args, "node_id")?;
        require_nodes(ctx, &[node_id])?;

        let prompt = agent_prompt(ctx, SKEPTIC)?;
        let request = format!(
            "CLAIM UNDER REVIEW\n{}\n\nFind counterexamples, hidden assumptions and logical gaps.",
            describe_node(ctx, node_id)
        );
        let critique = consult(services, prompt, request).await?;
        ctx.record_output(&AgentId::from(SKEPTIC), critique.clone());

        Ok(success(json!({
            "agent_id": SKEPTIC,
            "node_id": node_id,
            "critique": critique,
        })))
    }
}

pub struct DeployAgent;

#[async_trait]
impl ToolHandler for DeployAgent {
    async fn handle(
        &self,
        ctx: &mut MissionContext,
        _services: &MissionServices,
        args: &ToolArgs,
    ) -> Result<Value, ToolError> {
        let agent_id = required_str(args, "agent_id")?;
        let prompt = required_str(args, "mission_prompt")?;
        let lifespan = optional_u64(args, "lifespan_cycles")?;

        let agent = SpecialistAgent::new(agent_id, prompt, ctx.cycle)
            .with_tools(string_list(args, "required_tools"))
            .with_lifespan(lifespan);
        ctx.deploy_agent(agent)?;

        Ok(success(json!({
            "agent_id": agent_id,
            "creation_cycle": ctx.cycle,
            "lifespan_cycles": lifespan,
        })))
    }
}

pub struct RequestFormalVerification;

#[async_trait]
impl ToolHandler for RequestFormalVerification {
    async fn handle(
        &self,
        ctx: &mut MissionContext,
        _services: &MissionServices,
        args: &ToolArgs,
    ) -> Result<Value, ToolError> {
        let node_id = required_str(args, "node_id")?;
        let proof = required_str(args, "proof")?;
        require_nodes(ctx, &[node_id])?;

        let target = NodeId::from(node_id);
        let length = proof.chars().count();
        let verified = ctx.draw_verification(length);
        ctx.graph.set_verified(&target, verified)?;
        ctx.publish(MissionEvent::Cortex {
            event: CortexEvent::NodeVerified {
                node_id: target.clone(),
                verified,
                timestamp: Utc::now(),
            },
        });

        let (record_type, verdict) = if verified {
            (NodeType::VerificationSuccess, "passed")
        } else {
            (NodeType::VerificationFailure, "failed")
        };
        let record_id = ctx
            .add_node(
                NodeDraft::new(
                    record_type,
                    format!("Formal verification of {} {}. Proof: {}", target, verdict, proof),
                    FORMALIST,
                )
                .with_relation(Relation::new("VERIFIES", target.clone())),
            )
            .await?;
        info!("Verification of {} {} (record {})", target, verdict, record_id);

        Ok(success(json!({
            "node_id": node_id,
            "verified": verified,
            "success_probability": verification_probability(length),
            "record_id": record_id,
        })))
    }
}

pub struct ExecuteCode;

#[async_trait]
impl ToolHandler for ExecuteCode {
    async fn handle(
        &self,
        _ctx: &mut MissionContext,
        services: &MissionServices,
        args: &ToolArgs,
    ) -> Result<Value, ToolError> {
        let code = required_str(args, "code")?;
        let output = services.sandbox.execute(code).await;
        Ok(success(json!({
            "stdout": output.stdout,
            "stderr": output.stderr,
        })))
    }
}

pub struct RetireAgent;

#[async_trait]
impl ToolHandler for RetireAgent {
    async fn handle(
        &self,
        ctx: &mut MissionContext,
        _services: &MissionServices,
        args: &ToolArgs,
    ) -> Result<Value, ToolError> {
        let agent_id = required_str(args, "agent_id")?;
        let reason = optional_str(args, "reason").unwrap_or("retired by the architect");

        let retired = ctx.retire_agent(&AgentId::from(agent_id), reason)?;
        let mut result = success(json!({ "agent_id": agent_id, "retired": retired }));
        if !retired {
            result["note"] = json!("agent was not active");
        }
        Ok(result)
    }
}

pub struct WebSearch;

#[async_trait]
impl ToolHandler for WebSearch {
    async fn handle(
        &self,
        _ctx: &mut MissionContext,
        services: &MissionServices,
        args: &ToolArgs,
    ) -> Result<Value, ToolError> {
        let query = required_str(args, "query")?;
        let answer = services.oracles.search.grounded_search(query).await?;
        Ok(success(json!({
            "answer": answer.text,
            "sources": answer.sources,
        })))
    }
}

pub struct ModifyAgentPrompt;

#[async_trait]
impl ToolHandler for ModifyAgentPrompt {
    async fn handle(
        &self,
        ctx: &mut MissionContext,
        _services: &MissionServices,
        args: &ToolArgs,
    ) -> Result<Value, ToolError> {
        let agent_id = required_str(args, "agent_id")?;
        let prompt = required_str(args, "new_prompt")?;
        ctx.modify_agent_prompt(&AgentId::from(agent_id), prompt)?;
        Ok(success(json!({ "agent_id": agent_id })))
    }
}

pub struct PeerReview;

#[async_trait]
impl ToolHandler for PeerReview {
    async fn handle(
        &self,
        ctx: &mut MissionContext,
        services: &MissionServices,
        args: &ToolArgs,
    ) -> Result<Value, ToolError> {
        let reviewer_id = required_str(args, "reviewer_id")?;
        let target_id = required_str(args, "target_id")?;
        let reviewer_prompt = agent_prompt(ctx, reviewer_id)?;
        agent_prompt(ctx, target_id)?;

        let (request, reviewed) = {
            let target = AgentId::from(target_id);
            let history = ctx.recent_outputs(&target, ctx.settings().peer_review_history);
            let mut request = format!("You are reviewing the recent work of '{}'.\n\n", target_id);
            if history.is_empty() {
                request.push_str("(no recent output)\n");
            }
            for (i, output) in history.iter().enumerate() {
                request.push_str(&format!("OUTPUT {} (cycle {}):\n{}\n\n", i + 1, output.cycle, output.content));
            }
            request.push_str("Assess rigor and novelty, and name the single most important fix.");
            (request, history.len())
        };

        let review = consult(services, reviewer_prompt, request).await?;
        ctx.record_output(&AgentId::from(reviewer_id), review.clone());

        Ok(success(json!({
            "reviewer_id": reviewer_id,
            "target_id": target_id,
            "reviewed_outputs": reviewed,
            "review": review,
        })))
    }
}
