// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Architect Synthesis Payload
//!
//! The architect ends every cycle with a JSON object describing what it
//! concluded. Models do not reliably return bare JSON, so
//! [`parse_payload`] tries three stages in order and stops at the first
//! success:
//!
//! 1. parse the raw text
//! 2. strip a leading/trailing code fence and parse again
//! 3. slice from the first `{` to the last `}` and parse
//!
//! Failure of the last stage is final.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Summary prefix that ends the mission
pub const TERMINAL_MARKER: &str = "[MISSION_COMPLETE]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchVector {
    pub direction: String,
    #[serde(default = "default_promise")]
    pub promise: f64,
}

fn default_promise() -> f64 {
    conclave_cortex::DEFAULT_PROMISE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeUpdate {
    #[serde(rename = "type")]
    pub node_type: String,
    pub content: String,
    #[serde(default)]
    pub relations: Vec<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    /// Index into `research_vectors` of the vector that motivated this finding
    #[serde(default)]
    pub vector_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectPayload {
    pub summary: String,
    #[serde(default)]
    pub strategic_focus: String,
    #[serde(default)]
    pub stagnation_level: i64,
    #[serde(default)]
    pub new_objective: Option<String>,
    #[serde(default)]
    pub research_vectors: Vec<ResearchVector>,
    #[serde(default)]
    pub knowledge_updates: Vec<KnowledgeUpdate>,
}

impl ArchitectPayload {
    pub fn is_terminal(&self) -> bool {
        self.summary.trim_start().starts_with(TERMINAL_MARKER)
    }

    /// Vector with the highest promise; the first one wins ties
    pub fn best_vector(&self) -> Option<&ResearchVector> {
        self.research_vectors
            .iter()
            .fold(None, |best: Option<&ResearchVector>, v| match best {
                Some(b) if b.promise >= v.promise => Some(b),
                _ => Some(v),
            })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SynthesisError {
    #[error("Architect returned no text")]
    Empty,

    #[error("Architect payload is not valid JSON: {0}")]
    Unparseable(String),
}

/// Tolerant parser for the architect's final answer
pub fn parse_payload(raw: Option<&str>) -> Result<ArchitectPayload, SynthesisError> {
    let text = raw.map(str::trim).filter(|t| !t.is_empty()).ok_or(SynthesisError::Empty)?;

    if let Ok(payload) = serde_json::from_str(text) {
        return Ok(payload);
    }

    let unfenced = strip_fence(text);
    if let Ok(payload) = serde_json::from_str(unfenced) {
        return Ok(payload);
    }

    let sliced = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => return Err(SynthesisError::Unparseable("no JSON object found".into())),
    };
    serde_json::from_str(sliced).map_err(|e| SynthesisError::Unparseable(e.to_string()))
}

/// JSON schema of [`ArchitectPayload`], sent with the final tool-less request
pub fn payload_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": {"type": "string"},
            "strategic_focus": {"type": "string"},
            "stagnation_level": {"type": "integer", "minimum": 0},
            "new_objective": {"type": ["string", "null"]},
            "research_vectors": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "direction": {"type": "string"},
                        "promise": {"type": "number", "minimum": 0, "maximum": 1}
                    },
                    "required": ["direction", "promise"]
                }
            },
            "knowledge_updates": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "type": {"type": "string"},
                        "content": {"type": "string"},
                        "relations": {"type": "array", "items": {"type": "string"}},
                        "created_by": {"type": "string"},
                        "vector_index": {"type": "integer", "minimum": 0}
                    },
                    "required": ["type", "content"]
                }
            }
        },
        "required": ["summary", "strategic_focus", "stagnation_level"]
    })
}

fn strip_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        // drop the info string (`json`) up to the first newline
        body = rest.split_once('\n').map_or("", |(_, tail)| tail);
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{"summary":"ok","strategic_focus":"ALGEBRA","stagnation_level":1}"#;

    #[test]
    fn test_parses_plain_json() {
        let payload = parse_payload(Some(MINIMAL)).unwrap();
        assert_eq!(payload.summary, "ok");
        assert_eq!(payload.strategic_focus, "ALGEBRA");
        assert_eq!(payload.stagnation_level, 1);
        assert!(payload.knowledge_updates.is_empty());
    }

    #[test]
    fn test_parses_fenced_json() {
        let fenced = format!("```json\n{MINIMAL}\n```");
        assert_eq!(parse_payload(Some(&fenced)).unwrap().summary, "ok");
    }

    #[test]
    fn test_slices_embedded_object() {
        let chatty = format!("Here is my synthesis:\n{MINIMAL}\nLet me know!");
        assert_eq!(parse_payload(Some(&chatty)).unwrap().summary, "ok");
    }

    #[test]
    fn test_rejects_empty_and_garbage() {
        assert_eq!(parse_payload(None), Err(SynthesisError::Empty));
        assert_eq!(parse_payload(Some("   ")), Err(SynthesisError::Empty));
        assert!(matches!(
            parse_payload(Some("no braces here")),
            Err(SynthesisError::Unparseable(_))
        ));
        assert!(matches!(
            parse_payload(Some("{ not: json }")),
            Err(SynthesisError::Unparseable(_))
        ));
    }

    #[test]
    fn test_full_payload_fields() {
        let raw = r#"{
            "summary": "[MISSION_COMPLETE] proved it",
            "strategic_focus": "NUMBER_THEORY",
            "stagnation_level": 0,
            "new_objective": "Generalize",
            "research_vectors": [
                {"direction": "a", "promise": 0.4},
                {"direction": "b", "promise": 0.8},
                {"direction": "c", "promise": 0.8}
            ],
            "knowledge_updates": [
                {"type": "LEMMA", "content": "x", "relations": ["SUPPORTS:T1"], "created_by": "formalist", "vector_index": 1}
            ]
        }"#;
        let payload = parse_payload(Some(raw)).unwrap();
        assert!(payload.is_terminal());
        assert_eq!(payload.best_vector().unwrap().direction, "b");
        assert_eq!(payload.knowledge_updates[0].vector_index, Some(1));
        assert_eq!(payload.new_objective.as_deref(), Some("Generalize"));
    }

    #[test]
    fn test_terminal_marker_must_lead() {
        let mut payload = parse_payload(Some(MINIMAL)).unwrap();
        payload.summary = "not yet [MISSION_COMPLETE]".into();
        assert!(!payload.is_terminal());
    }
}
