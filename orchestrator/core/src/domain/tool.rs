// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Architect Tools
//!
//! Names, JSON-schema declarations and result shapes for the tools the
//! architect may call. Handlers live in `application::tool_effects`.
//!
//! Every result is fed back to the oracle as a JSON object with a `status`
//! of `success` or `error`.

use serde_json::{json, Map, Value};

use conclave_cortex::GraphError;

use crate::domain::agent::RegistryError;
use crate::domain::llm::{OracleError, ToolDeclaration};

pub const INVOKE_LATERAL_THINKER: &str = "invoke_lateral_thinker";
pub const CHALLENGE_NODE: &str = "challenge_node";
pub const DEPLOY_AGENT: &str = "deploy_agent";
pub const REQUEST_FORMAL_VERIFICATION: &str = "request_formal_verification";
pub const EXECUTE_CODE: &str = "execute_code";
pub const RETIRE_AGENT: &str = "retire_agent";
pub const WEB_SEARCH: &str = "web_search";
pub const MODIFY_AGENT_PROMPT: &str = "modify_agent_prompt";
pub const PEER_REVIEW: &str = "peer_review";

/// Arguments of one tool call
pub type ToolArgs = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown node id(s): {}", .0.join(", "))]
    MissingNodes(Vec<String>),

    #[error("Missing or invalid argument '{0}'")]
    InvalidArgument(&'static str),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Cycle-fatal, never reported back to the oracle
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl ToolError {
    /// Structured failure fed back to the oracle
    pub fn to_result(&self) -> Value {
        let mut body = json!({
            "status": "error",
            "error": self.to_string(),
        });
        if let ToolError::MissingNodes(ids) = self {
            body["missing_ids"] = json!(ids);
        }
        body
    }
}

/// Build a success result from extra fields
pub fn success(fields: Value) -> Value {
    let mut body = json!({ "status": "success" });
    if let (Some(target), Value::Object(extra)) = (body.as_object_mut(), fields) {
        target.extend(extra);
    }
    body
}

pub fn required_str<'a>(args: &'a ToolArgs, key: &'static str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ToolError::InvalidArgument(key))
}

pub fn optional_str<'a>(args: &'a ToolArgs, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

/// Accepts an integer or a numeric string; `null`/absent means `None`
pub fn optional_u64(args: &ToolArgs, key: &'static str) -> Result<Option<u64>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or(ToolError::InvalidArgument(key)),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| ToolError::InvalidArgument(key)),
        Some(_) => Err(ToolError::InvalidArgument(key)),
    }
}

/// Accepts an array of strings or a comma-separated string
pub fn string_list(args: &ToolArgs, key: &str) -> Vec<String> {
    match args.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn declaration(name: &str, description: &str, properties: Value, required: &[&str]) -> ToolDeclaration {
    ToolDeclaration {
        name: name.to_string(),
        description: description.to_string(),
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

/// Declarations for every architect tool, in a stable order
pub fn architect_tool_declarations() -> Vec<ToolDeclaration> {
    vec![
        declaration(
            INVOKE_LATERAL_THINKER,
            "Ask the lateral thinker to find an abstraction linking two existing knowledge nodes.",
            json!({
                "node_id_a": {"type": "string"},
                "node_id_b": {"type": "string"}
            }),
            &["node_id_a", "node_id_b"],
        ),
        declaration(
            CHALLENGE_NODE,
            "Ask the skeptic for an adversarial review of one knowledge node.",
            json!({"node_id": {"type": "string"}}),
            &["node_id"],
        ),
        declaration(
            DEPLOY_AGENT,
            "Create a new specialist agent. lifespan_cycles omitted means indefinite.",
            json!({
                "agent_id": {"type": "string"},
                "mission_prompt": {"type": "string"},
                "required_tools": {"type": "array", "items": {"type": "string"}},
                "lifespan_cycles": {"type": "integer", "minimum": 1}
            }),
            &["agent_id", "mission_prompt"],
        ),
        declaration(
            REQUEST_FORMAL_VERIFICATION,
            "Submit a proof of an existing node for formal verification.",
            json!({
                "node_id": {"type": "string"},
                "proof": {"type": "string"}
            }),
            &["node_id", "proof"],
        ),
        declaration(
            EXECUTE_CODE,
            "Run a python snippet in the sandbox and return stdout and stderr.",
            json!({"code": {"type": "string"}}),
            &["code"],
        ),
        declaration(
            RETIRE_AGENT,
            "Retire a non-permanent specialist agent.",
            json!({
                "agent_id": {"type": "string"},
                "reason": {"type": "string"}
            }),
            &["agent_id"],
        ),
        declaration(
            WEB_SEARCH,
            "Search the web and return a grounded answer with sources.",
            json!({"query": {"type": "string"}}),
            &["query"],
        ),
        declaration(
            MODIFY_AGENT_PROMPT,
            "Replace an agent's mission prompt.",
            json!({
                "agent_id": {"type": "string"},
                "new_prompt": {"type": "string"}
            }),
            &["agent_id", "new_prompt"],
        ),
        declaration(
            PEER_REVIEW,
            "Have one agent review another agent's recent outputs.",
            json!({
                "reviewer_id": {"type": "string"},
                "target_id": {"type": "string"}
            }),
            &["reviewer_id", "target_id"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_declarations_are_unique() {
        let decls = architect_tool_declarations();
        assert_eq!(decls.len(), 9);
        let mut names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 9);
        assert!(decls.iter().all(|d| d.parameters["type"] == "object"));
    }

    #[test]
    fn test_missing_nodes_result_names_ids() {
        let result = ToolError::MissingNodes(vec!["H9".into(), "L4".into()]).to_result();
        assert_eq!(result["status"], "error");
        assert_eq!(result["missing_ids"], json!(["H9", "L4"]));
        assert!(result["error"].as_str().unwrap().contains("H9, L4"));
    }

    #[test]
    fn test_argument_helpers() {
        let a = args(json!({
            "id": " x ",
            "blank": "",
            "n": 3,
            "s": "7",
            "bad": -1,
            "list": ["a", " ", "b"],
            "csv": "c, d"
        }));
        assert_eq!(required_str(&a, "id").unwrap(), "x");
        assert!(matches!(required_str(&a, "blank"), Err(ToolError::InvalidArgument("blank"))));
        assert_eq!(optional_u64(&a, "n").unwrap(), Some(3));
        assert_eq!(optional_u64(&a, "s").unwrap(), Some(7));
        assert_eq!(optional_u64(&a, "absent").unwrap(), None);
        assert!(optional_u64(&a, "bad").is_err());
        assert_eq!(string_list(&a, "list"), vec!["a", "b"]);
        assert_eq!(string_list(&a, "csv"), vec!["c", "d"]);
    }

    #[test]
    fn test_success_merges_fields() {
        let body = success(json!({"agent_id": "x"}));
        assert_eq!(body, json!({"status": "success", "agent_id": "x"}));
    }
}
