// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Mission Configuration Types
//
// Defines the configuration schema for a Conclave mission host:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Mission tuning (objective, cycle interval, tool round budget, thresholds)
// - LLM provider configuration and role -> model alias mapping
// - Embedding, sandbox, persistence, network and observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_VERSION: &str = "conclave.dev/v1";
pub const KIND: &str = "MissionConfig";

/// Top-level mission configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionConfigManifest {
    /// API version (must be "conclave.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "MissionConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: MissionConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable mission name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionConfigSpec {
    #[serde(default)]
    pub mission: MissionSettings,

    #[serde(default)]
    pub llm_providers: Vec<LlmProviderConfig>,

    #[serde(default)]
    pub llm_selection: LlmSelection,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionSettings {
    /// Initial research objective
    #[serde(default = "default_objective")]
    pub objective: String,

    /// Seconds between cycles while running
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_seconds: u64,

    /// Tool-calling rounds before the architect is forced to conclude
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// Consecutive stagnant cycles before a chaos intervention
    #[serde(default = "default_stagnation_threshold")]
    pub stagnation_threshold: u32,

    /// Related nodes retrieved for each specialist prompt
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,

    /// Outputs of the target agent shown to a peer reviewer
    #[serde(default = "default_peer_review_history")]
    pub peer_review_history: usize,

    /// Outputs retained per agent
    #[serde(default = "default_output_history")]
    pub output_history: usize,

    /// Fixed seed for formal verification draws (random when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_seed: Option<u64>,
}

impl MissionSettings {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Unique provider name (e.g., "openai", "local-vllm")
    pub name: String,

    /// "openai", "openai-compatible" or "ollama"
    #[serde(rename = "type")]
    pub provider_type: String,

    pub endpoint: String,

    /// API key (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    pub models: Vec<ModelConfig>,
}

impl LlmProviderConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<String> {
        resolve_secret(self.api_key.as_deref())
    }
}

/// Resolve a literal or "env:VAR_NAME" secret; absent means no auth
pub fn resolve_secret(value: Option<&str>) -> anyhow::Result<String> {
    match value {
        Some(k) => match k.strip_prefix("env:") {
            Some(var_name) => std::env::var(var_name)
                .map_err(|_| anyhow::anyhow!("Environment variable not set: {}", var_name)),
            None => Ok(k.to_string()),
        },
        None => Ok(String::new()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Alias referenced by `llm_selection`
    pub alias: String,

    /// Model identifier sent to the provider
    pub model: String,

    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default = "default_context_window")]
    pub context_window: u32,
}

/// Which model alias serves each mission role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSelection {
    #[serde(default = "default_architect_alias")]
    pub architect: String,

    #[serde(default = "default_specialist_alias")]
    pub specialist: String,

    #[serde(default = "default_search_alias")]
    pub search: String,

    /// Provider tried once after the primary exhausts its retries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_provider: Option<String>,

    /// Attempts per oracle call. The default of 1 lets a failure reach the
    /// scheduler and halt the mission; larger values opt into retry with backoff.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProvider {
    OpenaiCompatible,
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProvider,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Vector size for the hashing embedder
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Run experiment code locally; off by default
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    #[serde(default = "default_sandbox_timeout")]
    pub timeout_seconds: u64,

    /// Per-stream cap on captured output
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    Sled,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_backend")]
    pub backend: PersistenceBackend,

    #[serde(default = "default_data_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP control surface port
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prometheus scrape port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_objective() -> String {
    "Investigate the distribution of gaps between consecutive prime numbers.".to_string()
}

fn default_cycle_interval() -> u64 {
    60
}

fn default_max_tool_rounds() -> u32 {
    12
}

fn default_stagnation_threshold() -> u32 {
    3
}

fn default_retrieval_k() -> usize {
    3
}

fn default_peer_review_history() -> usize {
    5
}

fn default_output_history() -> usize {
    20
}

fn default_context_window() -> u32 {
    128_000
}

fn default_architect_alias() -> String {
    "architect".to_string()
}

fn default_specialist_alias() -> String {
    "specialist".to_string()
}

fn default_search_alias() -> String {
    "search".to_string()
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_embedding_provider() -> EmbeddingProvider {
    EmbeddingProvider::Hashing
}

fn default_dimensions() -> usize {
    384
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_sandbox_timeout() -> u64 {
    10
}

fn default_max_output_bytes() -> usize {
    16 * 1024
}

fn default_backend() -> PersistenceBackend {
    PersistenceBackend::Sled
}

fn default_data_path() -> String {
    "./data/conclave".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for MissionSettings {
    fn default() -> Self {
        Self {
            objective: default_objective(),
            cycle_interval_seconds: default_cycle_interval(),
            max_tool_rounds: default_max_tool_rounds(),
            stagnation_threshold: default_stagnation_threshold(),
            retrieval_k: default_retrieval_k(),
            peer_review_history: default_peer_review_history(),
            output_history: default_output_history(),
            verification_seed: None,
        }
    }
}

impl Default for LlmSelection {
    fn default() -> Self {
        Self {
            architect: default_architect_alias(),
            specialist: default_specialist_alias(),
            search: default_search_alias(),
            fallback_provider: None,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            endpoint: None,
            api_key: None,
            model: None,
            dimensions: default_dimensions(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interpreter: default_interpreter(),
            timeout_seconds: default_sandbox_timeout(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_data_path(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

impl Default for MissionConfigSpec {
    fn default() -> Self {
        let model = |alias: &str, model: &str| ModelConfig {
            alias: alias.to_string(),
            model: model.to_string(),
            capabilities: vec!["chat".to_string(), "tools".to_string()],
            context_window: default_context_window(),
        };
        Self {
            mission: MissionSettings::default(),
            llm_providers: vec![LlmProviderConfig {
                name: "openai".to_string(),
                provider_type: "openai".to_string(),
                endpoint: "https://api.openai.com/v1".to_string(),
                api_key: Some("env:OPENAI_API_KEY".to_string()),
                enabled: true,
                models: vec![
                    model("architect", "gpt-4o"),
                    model("specialist", "gpt-4o-mini"),
                    model("search", "gpt-4o-search-preview"),
                ],
            }],
            llm_selection: LlmSelection::default(),
            embedding: EmbeddingConfig::default(),
            sandbox: SandboxConfig::default(),
            persistence: PersistenceConfig::default(),
            network: NetworkConfig::default(),
            observability: None,
        }
    }
}

impl Default for MissionConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "conclave-mission".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: MissionConfigSpec::default(),
        }
    }
}

impl MissionConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. CONCLAVE_CONFIG_PATH environment variable
    /// 2. ./conclave-config.yaml (working directory)
    /// 3. ~/.conclave/config.yaml (user home)
    /// 4. /etc/conclave/config.yaml (system, Unix) or C:\ProgramData\Conclave\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CONCLAVE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./conclave-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".conclave").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/conclave/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Conclave\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::warn!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(objective) = std::env::var("CONCLAVE_OBJECTIVE") {
            if !objective.trim().is_empty() {
                tracing::info!("Environment override: CONCLAVE_OBJECTIVE");
                self.spec.mission.objective = objective;
            }
        }

        if let Ok(val) = std::env::var("CONCLAVE_CYCLE_INTERVAL_SECONDS") {
            match val.trim().parse::<u64>() {
                Ok(secs) => {
                    tracing::info!("Environment override: CONCLAVE_CYCLE_INTERVAL_SECONDS={}", secs);
                    self.spec.mission.cycle_interval_seconds = secs;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for CONCLAVE_CYCLE_INTERVAL_SECONDS: '{}'. Expected seconds. Ignoring.",
                    val
                ),
            }
        }

        if let Ok(path) = std::env::var("CONCLAVE_DATA_PATH") {
            tracing::info!("Environment override: CONCLAVE_DATA_PATH={}", path);
            self.spec.persistence.path = path;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!("Invalid apiVersion: '{}'. Must be '{}'", self.api_version, API_VERSION);
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let mission = &self.spec.mission;
        if mission.objective.trim().is_empty() {
            anyhow::bail!("spec.mission.objective cannot be empty");
        }
        if mission.cycle_interval_seconds == 0 {
            anyhow::bail!("spec.mission.cycle_interval_seconds must be greater than zero");
        }
        if mission.max_tool_rounds == 0 {
            anyhow::bail!("spec.mission.max_tool_rounds must be greater than zero");
        }

        for provider in &self.spec.llm_providers {
            if provider.name.is_empty() {
                anyhow::bail!("LLM provider name cannot be empty");
            }
            if provider.endpoint.is_empty() {
                anyhow::bail!("LLM provider endpoint cannot be empty for: {}", provider.name);
            }
            if provider.models.is_empty() {
                anyhow::bail!("LLM provider must have at least one model: {}", provider.name);
            }
            for model in &provider.models {
                if model.alias.is_empty() {
                    anyhow::bail!("Model alias cannot be empty in provider: {}", provider.name);
                }
                if model.model.is_empty() {
                    anyhow::bail!("Model identifier cannot be empty for alias: {}", model.alias);
                }
            }
        }

        let selection = &self.spec.llm_selection;
        for (role, alias) in [
            ("architect", &selection.architect),
            ("specialist", &selection.specialist),
            ("search", &selection.search),
        ] {
            let declared = self
                .spec
                .llm_providers
                .iter()
                .filter(|p| p.enabled)
                .any(|p| p.models.iter().any(|m| &m.alias == alias));
            if !declared {
                anyhow::bail!(
                    "llm_selection.{} alias '{}' is not declared by any enabled provider",
                    role,
                    alias
                );
            }
        }

        if let Some(fallback) = &selection.fallback_provider {
            if !self.spec.llm_providers.iter().any(|p| &p.name == fallback) {
                anyhow::bail!("Fallback provider '{}' not found in llm_providers", fallback);
            }
        }

        let embedding = &self.spec.embedding;
        if embedding.provider == EmbeddingProvider::OpenaiCompatible
            && (embedding.endpoint.is_none() || embedding.model.is_none())
        {
            anyhow::bail!("spec.embedding requires endpoint and model for provider openai-compatible");
        }
        if embedding.dimensions == 0 {
            anyhow::bail!("spec.embedding.dimensions must be greater than zero");
        }

        Ok(())
    }
}
