// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Embedding oracle contract
//!
//! Implementations live in `infrastructure::embedding_client`.

use async_trait::async_trait;

/// Turns text into a fixed-length vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Cannot embed empty text")]
    EmptyInput,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Embedding provider error: {0}")]
    Provider(String),
}
