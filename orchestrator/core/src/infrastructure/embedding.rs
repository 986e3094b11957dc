// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;

use conclave_cortex::{Embedder, HashingEmbedder, OpenAiEmbeddingClient};
use tracing::info;

use crate::domain::config::{resolve_secret, EmbeddingConfig, EmbeddingProvider};

/// Build the embedder selected by `spec.embedding`
pub fn build_embedder(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    match config.provider {
        EmbeddingProvider::Hashing => {
            info!("Using hashing embedder ({} dimensions)", config.dimensions);
            Ok(Arc::new(HashingEmbedder::new(config.dimensions)))
        }
        EmbeddingProvider::OpenaiCompatible => {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| anyhow::anyhow!("spec.embedding.endpoint is required"))?;
            let model = config
                .model
                .clone()
                .ok_or_else(|| anyhow::anyhow!("spec.embedding.model is required"))?;
            let api_key = resolve_secret(config.api_key.as_deref())?;
            info!("Using embedding model {} at {}", model, endpoint);
            Ok(Arc::new(OpenAiEmbeddingClient::new(endpoint, api_key, model)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_config_uses_hashing() {
        let embedder = build_embedder(&EmbeddingConfig::default()).unwrap();
        let vector = embedder.embed("prime gaps").await.unwrap();
        assert_eq!(vector.len(), 384);
    }

    #[test]
    fn test_remote_provider_requires_endpoint() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::OpenaiCompatible,
            model: Some("text-embedding-3-small".into()),
            ..EmbeddingConfig::default()
        };
        assert!(build_embedder(&config).is_err());
    }
}
