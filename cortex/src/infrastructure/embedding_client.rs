// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Embedding Client
//!
//! Adapters for the [`Embedder`] contract.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** OpenAI-compatible `/embeddings` client and an offline hashing fallback

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::embedding::{Embedder, EmbeddingError};

/// Client for any endpoint that speaks the OpenAI embeddings API
pub struct OpenAiEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingClient {
    pub fn new(endpoint: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let url = format!("{}/embeddings", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider(format!("HTTP {}: {}", status, body)));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Provider(format!("Failed to parse response: {}", e)))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| EmbeddingError::Provider("No embedding returned".into()))
    }
}

/// Deterministic bag-of-words embedder for offline runs and tests.
///
/// Each lower-cased token is hashed into one of `dimensions` buckets, so texts
/// sharing vocabulary score a positive cosine similarity.
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub const DEFAULT_DIMENSIONS: usize = 384;

    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; self.dimensions];
        let mut tokens = 0;
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
            tokens += 1;
        }
        if tokens == 0 {
            return Err(EmbeddingError::EmptyInput);
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hashing_embedder_is_deterministic() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("Prime gaps are bounded").await.unwrap();
        let b = embedder.embed("prime GAPS are bounded").await.unwrap();

        assert_eq!(a.len(), HashingEmbedder::DEFAULT_DIMENSIONS);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_hashing_embedder_rejects_empty_text() {
        let embedder = HashingEmbedder::new(16);
        assert!(matches!(
            embedder.embed("  ;; ").await,
            Err(EmbeddingError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn test_openai_client_parses_embedding() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"embedding":[0.25,0.5,1.0],"index":0}]}"#)
            .create_async()
            .await;

        let client = OpenAiEmbeddingClient::new(
            format!("{}/v1", server.url()),
            "sk-test".into(),
            "text-embedding-3-small".into(),
        );
        let vector = client.embed("riemann zeta").await.unwrap();

        assert_eq!(vector, vec![0.25, 0.5, 1.0]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_openai_client_maps_http_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/embeddings")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = OpenAiEmbeddingClient::new(server.url(), "k".into(), "m".into());
        let err = client.embed("anything").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Provider(msg) if msg.contains("500")));
    }
}
