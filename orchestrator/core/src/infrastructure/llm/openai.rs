// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// OpenAI Generation Oracle Adapter
//
// Anti-Corruption Layer for the OpenAI chat-completions API, including tool
// calling, JSON response formats and web-search citations. Also works with
// OpenAI-compatible servers (vLLM, LM Studio, Ollama's /v1 endpoint).

use crate::domain::llm::{
    ChatMessage, Citation, FinishReason, GenerationOptions, GenerationOracle, GenerationRequest,
    GenerationResponse, GroundedAnswer, OracleError, TokenUsage, ToolInvocation,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

const SEARCH_SYSTEM_PROMPT: &str =
    "Answer the query using current web sources. Be concise and cite every source you rely on.";

pub struct OpenAIAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAITool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Deserialize, Default)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAIToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing)]
    annotations: Vec<OpenAIAnnotation>,
}

#[derive(Serialize)]
struct OpenAITool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OpenAIFunctionDecl<'a>,
}

#[derive(Serialize)]
struct OpenAIFunctionDecl<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: OpenAIFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct OpenAIAnnotation {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    url_citation: Option<OpenAIUrlCitation>,
}

#[derive(Deserialize)]
struct OpenAIUrlCitation {
    url: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
    #[serde(default)]
    model: Option<String>,
    /// Some OpenAI-compatible search providers return bare citation URLs here
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl OpenAIAdapter {
    pub fn new(endpoint: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
        }
    }

    fn to_wire_message(message: &ChatMessage) -> OpenAIMessage {
        match message {
            ChatMessage::System { content } => OpenAIMessage {
                role: "system".into(),
                content: Some(content.clone()),
                ..Default::default()
            },
            ChatMessage::User { content } => OpenAIMessage {
                role: "user".into(),
                content: Some(content.clone()),
                ..Default::default()
            },
            ChatMessage::Assistant { content, tool_calls } => OpenAIMessage {
                role: "assistant".into(),
                content: content.clone(),
                tool_calls: tool_calls
                    .iter()
                    .map(|call| OpenAIToolCall {
                        id: call.id.clone(),
                        kind: function_kind(),
                        function: OpenAIFunctionCall {
                            name: call.name.clone(),
                            arguments: Value::Object(call.arguments.clone()).to_string(),
                        },
                    })
                    .collect(),
                ..Default::default()
            },
            ChatMessage::Tool { call_id, content, .. } => OpenAIMessage {
                role: "tool".into(),
                content: Some(content.clone()),
                tool_call_id: Some(call_id.clone()),
                ..Default::default()
            },
        }
    }

    fn parse_arguments(call: &OpenAIFunctionCall) -> Map<String, Value> {
        if call.arguments.trim().is_empty() {
            return Map::new();
        }
        match serde_json::from_str::<Value>(&call.arguments) {
            Ok(Value::Object(map)) => map,
            _ => {
                warn!("Tool call '{}' carried non-object arguments; ignoring them", call.name);
                Map::new()
            }
        }
    }

    async fn send(&self, request: &OpenAIRequest<'_>) -> Result<OpenAIResponse, OracleError> {
        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));

        let mut builder = self.client.post(&url).json(request);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }
        let response = builder
            .send()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(if status == 401 || status == 403 {
                OracleError::Authentication(error_text)
            } else if status == 429 {
                OracleError::RateLimit
            } else if status == 404 {
                OracleError::ModelNotFound(self.model.clone())
            } else {
                OracleError::Provider(format!("HTTP {}: {}", status, error_text))
            });
        }

        response
            .json()
            .await
            .map_err(|e| OracleError::Provider(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl GenerationOracle for OpenAIAdapter {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, OracleError> {
        if request.messages.is_empty() {
            return Err(OracleError::InvalidInput("Conversation is empty".into()));
        }

        let wire = OpenAIRequest {
            model: &self.model,
            messages: request.messages.iter().map(Self::to_wire_message).collect(),
            tools: request
                .tools
                .iter()
                .map(|tool| OpenAITool {
                    kind: "function",
                    function: OpenAIFunctionDecl {
                        name: &tool.name,
                        description: &tool.description,
                        parameters: &tool.parameters,
                    },
                })
                .collect(),
            response_format: request.response_schema.as_ref().map(|schema| {
                json!({
                    "type": "json_schema",
                    "json_schema": {"name": "response", "schema": schema}
                })
            }),
            max_tokens: request.options.max_tokens,
            temperature: request.options.temperature,
        };

        let response = self.send(&wire).await?;
        let model = response.model.clone().unwrap_or_else(|| self.model.clone());
        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::Provider("No response from model".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .iter()
            .map(|call| ToolInvocation {
                id: call.id.clone(),
                name: call.function.name.clone(),
                arguments: Self::parse_arguments(&call.function),
            })
            .collect();

        Ok(GenerationResponse {
            text: choice.message.content.filter(|t| !t.trim().is_empty()),
            tool_calls,
            usage,
            model,
            finish_reason: match choice.finish_reason.as_deref() {
                Some("length") => FinishReason::Length,
                Some("tool_calls") => FinishReason::ToolCalls,
                Some("content_filter") => FinishReason::ContentFilter,
                _ => FinishReason::Stop,
            },
        })
    }

    async fn grounded_search(&self, query: &str) -> Result<GroundedAnswer, OracleError> {
        let wire = OpenAIRequest {
            model: &self.model,
            messages: vec![
                Self::to_wire_message(&ChatMessage::system(SEARCH_SYSTEM_PROMPT)),
                Self::to_wire_message(&ChatMessage::user(query)),
            ],
            tools: Vec::new(),
            response_format: None,
            max_tokens: GenerationOptions::default().max_tokens,
            // search models reject sampling parameters
            temperature: None,
        };

        let response = self.send(&wire).await?;
        let citations = response.citations;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::Provider("No response from model".into()))?;

        let mut sources: Vec<Citation> = choice
            .message
            .annotations
            .into_iter()
            .filter(|a| a.kind == "url_citation")
            .filter_map(|a| a.url_citation)
            .map(|c| Citation {
                uri: c.url,
                title: c.title,
            })
            .collect();
        for uri in citations {
            if !sources.iter().any(|s| s.uri == uri) {
                sources.push(Citation { uri, title: None });
            }
        }

        Ok(GroundedAnswer {
            text: choice.message.content.unwrap_or_default(),
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::ToolDeclaration;

    fn adapter(server: &mockito::ServerGuard) -> OpenAIAdapter {
        OpenAIAdapter::new(server.url(), "sk-test".into(), "gpt-test".into())
    }

    #[tokio::test]
    async fn test_generate_parses_tool_calls_in_order() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(json!({"model": "gpt-test"})))
            .with_status(200)
            .with_body(
                json!({
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [
                                {"id": "call_1", "type": "function", "function": {"name": "deploy_agent", "arguments": "{\"agent_id\":\"x\"}"}},
                                {"id": "call_2", "type": "function", "function": {"name": "retire_agent", "arguments": "not json"}}
                            ]
                        },
                        "finish_reason": "tool_calls"
                    }],
                    "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let request = GenerationRequest {
            tools: vec![ToolDeclaration {
                name: "deploy_agent".into(),
                description: "d".into(),
                parameters: json!({"type": "object"}),
            }],
            ..GenerationRequest::one_shot("system", "user")
        };
        let response = adapter(&server).generate(&request).await.unwrap();

        assert_eq!(response.text, None);
        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.tool_calls[0].name, "deploy_agent");
        assert_eq!(response.tool_calls[0].arguments["agent_id"], "x");
        assert!(response.tool_calls[1].arguments.is_empty());
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_generate_text_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"{\"summary\":\"ok\"}"},"finish_reason":"stop"}]}"#)
            .create_async()
            .await;

        let response = adapter(&server)
            .generate(&GenerationRequest::one_shot("s", "u"))
            .await
            .unwrap();
        assert_eq!(response.text.as_deref(), Some("{\"summary\":\"ok\"}"));
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.model, "gpt-test");
    }

    #[tokio::test]
    async fn test_grounded_search_collects_citations() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                json!({
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": "Zhang proved bounded gaps in 2013.",
                            "annotations": [
                                {"type": "url_citation", "url_citation": {"url": "https://a.example", "title": "A"}}
                            ]
                        }
                    }],
                    "citations": ["https://a.example", "https://b.example"]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let answer = adapter(&server).grounded_search("bounded prime gaps").await.unwrap();
        assert!(answer.text.contains("Zhang"));
        assert_eq!(
            answer.sources,
            vec![
                Citation { uri: "https://a.example".into(), title: Some("A".into()) },
                Citation { uri: "https://b.example".into(), title: None },
            ]
        );
    }

    #[tokio::test]
    async fn test_http_errors_are_mapped() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("bad key")
            .create_async()
            .await;

        let err = adapter(&server)
            .generate(&GenerationRequest::one_shot("s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::Authentication(msg) if msg == "bad key"));
    }

    #[tokio::test]
    async fn test_empty_conversation_is_rejected() {
        let adapter = OpenAIAdapter::new("http://127.0.0.1:9".into(), String::new(), "m".into());
        let err = adapter.generate(&GenerationRequest::default()).await.unwrap_err();
        assert!(matches!(err, OracleError::InvalidInput(_)));
    }
}
