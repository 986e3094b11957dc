// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Oracle Router - Model Alias Resolution and Provider Management
//
// Resolves the architect/specialist/search aliases to provider adapters and
// wraps each one in retry with exponential backoff and an optional fallback
// provider on the last attempt.

use crate::domain::config::{LlmProviderConfig, LlmSelection, MissionConfigSpec};
use crate::domain::llm::{
    GenerationOracle, GenerationRequest, GenerationResponse, GroundedAnswer, OracleError, OracleSet,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::openai::OpenAIAdapter;

/// Registry of provider adapters keyed by model alias
pub struct OracleRouter {
    /// provider name -> adapter for its first model (fallback target)
    providers: HashMap<String, Arc<dyn GenerationOracle>>,
    /// alias -> (provider name, adapter bound to that alias's model)
    alias_map: HashMap<String, (String, Arc<dyn GenerationOracle>)>,
    fallback_provider: Option<String>,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl OracleRouter {
    pub fn from_config(spec: &MissionConfigSpec) -> anyhow::Result<Self> {
        let mut providers = HashMap::new();
        let mut alias_map = HashMap::new();

        info!("Initializing oracle router");

        for provider_config in &spec.llm_providers {
            if !provider_config.enabled {
                info!("Provider '{}' disabled, skipping", provider_config.name);
                continue;
            }

            match Self::create_adapters(provider_config) {
                Ok(adapters) => {
                    for (index, (alias, model, adapter)) in adapters.into_iter().enumerate() {
                        info!("Mapping alias '{}' -> {} ({})", alias, model, provider_config.name);
                        if index == 0 {
                            providers.insert(provider_config.name.clone(), adapter.clone());
                        }
                        alias_map.insert(alias, (provider_config.name.clone(), adapter));
                    }
                }
                Err(e) => {
                    warn!("Failed to initialize provider '{}': {}", provider_config.name, e);
                }
            }
        }

        if providers.is_empty() {
            warn!("No LLM providers available - mission cycles will fail until one is configured");
        }

        Ok(Self {
            providers,
            alias_map,
            fallback_provider: spec.llm_selection.fallback_provider.clone(),
            max_retries: spec.llm_selection.max_retries,
            retry_delay_ms: spec.llm_selection.retry_delay_ms,
        })
    }

    /// One adapter per declared model, in declaration order
    fn create_adapters(
        config: &LlmProviderConfig,
    ) -> anyhow::Result<Vec<(String, String, Arc<dyn GenerationOracle>)>> {
        match config.provider_type.as_str() {
            // Ollama serves the OpenAI wire format under /v1
            "openai" | "openai-compatible" | "ollama" => {}
            other => anyhow::bail!("Unsupported provider type: {}", other),
        }
        if config.models.is_empty() {
            anyhow::bail!("No models configured");
        }
        let api_key = config.resolved_api_key()?;

        Ok(config
            .models
            .iter()
            .map(|m| {
                let adapter: Arc<dyn GenerationOracle> = Arc::new(OpenAIAdapter::new(
                    config.endpoint.clone(),
                    api_key.clone(),
                    m.model.clone(),
                ));
                (m.alias.clone(), m.model.clone(), adapter)
            })
            .collect())
    }

    /// Oracle for an alias, with the router's retry and fallback policy applied
    pub fn oracle(&self, alias: &str) -> Result<Arc<dyn GenerationOracle>, OracleError> {
        let (provider_name, primary) = self.alias_map.get(alias).ok_or_else(|| {
            OracleError::ModelNotFound(format!(
                "Model alias '{}' not found (available: {})",
                alias,
                self.available_aliases().join(", ")
            ))
        })?;

        let fallback = self
            .fallback_provider
            .as_ref()
            .filter(|name| *name != provider_name)
            .and_then(|name| self.providers.get(name))
            .cloned();

        Ok(Arc::new(RoutedOracle {
            alias: alias.to_string(),
            primary: primary.clone(),
            fallback,
            max_retries: self.max_retries.max(1),
            retry_delay_ms: self.retry_delay_ms,
        }))
    }

    pub fn oracle_set(&self, selection: &LlmSelection) -> Result<OracleSet, OracleError> {
        Ok(OracleSet {
            architect: self.oracle(&selection.architect)?,
            specialist: self.oracle(&selection.specialist)?,
            search: self.oracle(&selection.search)?,
        })
    }

    pub fn available_aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.alias_map.keys().cloned().collect();
        aliases.sort();
        aliases
    }
}

/// Retrying wrapper handed out by [`OracleRouter::oracle`]
pub struct RoutedOracle {
    alias: String,
    primary: Arc<dyn GenerationOracle>,
    fallback: Option<Arc<dyn GenerationOracle>>,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl RoutedOracle {
    pub fn new(
        alias: impl Into<String>,
        primary: Arc<dyn GenerationOracle>,
        fallback: Option<Arc<dyn GenerationOracle>>,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Self {
        Self {
            alias: alias.into(),
            primary,
            fallback,
            max_retries: max_retries.max(1),
            retry_delay_ms,
        }
    }

    async fn with_retries<T, F, Fut>(&self, op: F) -> Result<T, OracleError>
    where
        F: Fn(Arc<dyn GenerationOracle>) -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            match op(self.primary.clone()).await {
                Ok(value) => return Ok(value),
                // malformed requests fail the same way every time
                Err(e @ OracleError::InvalidInput(_)) => return Err(e),
                Err(e) => {
                    warn!(
                        "Oracle '{}' failed (attempt {}/{}): {}",
                        self.alias,
                        attempt + 1,
                        self.max_retries,
                        e
                    );
                    last_error = Some(e);

                    if attempt == self.max_retries - 1 {
                        if let Some(fallback) = &self.fallback {
                            info!("Trying fallback provider for '{}'", self.alias);
                            return op(fallback.clone()).await;
                        }
                        break;
                    }

                    tokio::time::sleep(Duration::from_millis(
                        self.retry_delay_ms.saturating_mul(2_u64.saturating_pow(attempt)),
                    ))
                    .await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| OracleError::Provider("Unknown error".into())))
    }
}

#[async_trait]
impl GenerationOracle for RoutedOracle {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, OracleError> {
        self.with_retries(|oracle| async move { oracle.generate(request).await })
            .await
    }

    async fn grounded_search(&self, query: &str) -> Result<GroundedAnswer, OracleError> {
        self.with_retries(|oracle| async move { oracle.grounded_search(query).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::ModelConfig;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times, then answers with `reply`
    struct FlakyOracle {
        failures: u32,
        calls: AtomicU32,
        reply: &'static str,
    }

    impl FlakyOracle {
        fn new(failures: u32, reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicU32::new(0),
                reply,
            })
        }
    }

    #[async_trait]
    impl GenerationOracle for FlakyOracle {
        async fn generate(&self, _request: &GenerationRequest) -> Result<GenerationResponse, OracleError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(OracleError::RateLimit)
            } else {
                Ok(GenerationResponse::text(self.reply))
            }
        }

        async fn grounded_search(&self, _query: &str) -> Result<GroundedAnswer, OracleError> {
            Err(OracleError::InvalidInput("no search".into()))
        }
    }

    fn provider(name: &str, provider_type: &str, aliases: &[(&str, &str)]) -> LlmProviderConfig {
        LlmProviderConfig {
            name: name.to_string(),
            provider_type: provider_type.to_string(),
            endpoint: "http://localhost:11434/v1".to_string(),
            api_key: None,
            enabled: true,
            models: aliases
                .iter()
                .map(|(alias, model)| ModelConfig {
                    alias: alias.to_string(),
                    model: model.to_string(),
                    capabilities: vec!["chat".to_string()],
                    context_window: 8192,
                })
                .collect(),
        }
    }

    #[test]
    fn test_router_maps_every_alias() {
        let spec = MissionConfigSpec {
            llm_providers: vec![
                provider("local", "ollama", &[("architect", "llama3.2"), ("specialist", "qwen2.5")]),
                provider("broken", "carrier-pigeon", &[("search", "coo")]),
            ],
            ..MissionConfigSpec::default()
        };

        let router = OracleRouter::from_config(&spec).unwrap();
        assert_eq!(router.available_aliases(), vec!["architect", "specialist"]);
        assert!(router.oracle("architect").is_ok());
        match router.oracle_set(&LlmSelection::default()) {
            Err(OracleError::ModelNotFound(message)) => {
                assert_eq!(message, "Model alias 'search' not found (available: architect, specialist)");
            }
            other => panic!("expected ModelNotFound, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_default_selection_surfaces_first_failure() {
        let selection = LlmSelection::default();
        let flaky = FlakyOracle::new(1, "too late");
        let routed = RoutedOracle::new(
            "specialist",
            flaky.clone(),
            None,
            selection.max_retries,
            selection.retry_delay_ms,
        );

        let err = routed.generate(&GenerationRequest::one_shot("s", "u")).await.unwrap_err();
        assert!(matches!(err, OracleError::RateLimit));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let flaky = FlakyOracle::new(2, "finally");
        let routed = RoutedOracle::new("architect", flaky.clone(), None, 3, 1);

        let response = routed.generate(&GenerationRequest::one_shot("s", "u")).await.unwrap();
        assert_eq!(response.text.as_deref(), Some("finally"));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fallback_used_on_last_attempt() {
        let primary = FlakyOracle::new(u32::MAX, "never");
        let fallback = FlakyOracle::new(0, "from fallback");
        let routed = RoutedOracle::new("architect", primary.clone(), Some(fallback.clone()), 2, 1);

        let response = routed.generate(&GenerationRequest::one_shot("s", "u")).await.unwrap();
        assert_eq!(response.text.as_deref(), Some("from fallback"));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_error() {
        let primary = FlakyOracle::new(u32::MAX, "never");
        let routed = RoutedOracle::new("specialist", primary, None, 2, 1);

        let err = routed.generate(&GenerationRequest::one_shot("s", "u")).await.unwrap_err();
        assert!(matches!(err, OracleError::RateLimit));
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_retried() {
        let primary = FlakyOracle::new(0, "unused");
        let routed = RoutedOracle::new("search", primary, None, 3, 1);

        let err = routed.grounded_search("q").await.unwrap_err();
        assert!(matches!(err, OracleError::InvalidInput(_)));
    }
}
