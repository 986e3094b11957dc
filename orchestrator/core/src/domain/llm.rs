// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Llm
//!
//! Generation oracle contract used by specialists, the architect and the
//! grounded search tool.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Vendor-neutral conversation, tool-calling and search types

// Anti-Corruption Layer: implementations in infrastructure/llm/ translate
// these types to provider wire formats.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Domain interface for text / tool-calling generation
#[async_trait]
pub trait GenerationOracle: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, OracleError>;

    /// One-shot answer grounded in external web sources
    async fn grounded_search(&self, query: &str) -> Result<GroundedAnswer, OracleError>;
}

/// One oracle per mission role
#[derive(Clone)]
pub struct OracleSet {
    pub architect: Arc<dyn GenerationOracle>,
    pub specialist: Arc<dyn GenerationOracle>,
    pub search: Arc<dyn GenerationOracle>,
}

impl OracleSet {
    /// Use the same oracle for every role
    pub fn uniform(oracle: Arc<dyn GenerationOracle>) -> Self {
        Self {
            architect: oracle.clone(),
            specialist: oracle.clone(),
            search: oracle,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        tool_calls: Vec<ToolInvocation>,
    },
    Tool {
        call_id: String,
        name: String,
        content: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User { content: content.into() }
    }
}

/// Tool the oracle may request, with JSON-schema parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool call requested by the oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: Some(4096),
            temperature: Some(0.7),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    /// Empty means tool calling is disabled
    pub tools: Vec<ToolDeclaration>,
    /// Ask for a JSON object matching this schema
    pub response_schema: Option<Value>,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// Single system + user turn, no tools
    pub fn one_shot(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerationResponse {
    pub text: Option<String>,
    /// Tool calls in the order the oracle listed them
    pub tool_calls: Vec<ToolInvocation>,
    pub usage: TokenUsage,
    pub model: String,
    pub finish_reason: FinishReason,
}

impl GenerationResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn tool_call(call: ToolInvocation) -> Self {
        Self {
            tool_calls: vec![call],
            finish_reason: FinishReason::ToolCalls,
            ..Self::default()
        }
    }

    /// Text content, empty string when absent
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FinishReason {
    #[default]
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundedAnswer {
    pub text: String,
    #[serde(default)]
    pub sources: Vec<Citation>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
