// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mission Factory - Application Layer
//!
//! Builds a ready-to-start [`CycleScheduler`] from a mission manifest,
//! choosing concrete oracle, embedder, sandbox and storage implementations.
//! The domain layer only sees the traits.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Composition root for the mission engine

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::application::mission::{MissionContext, MissionServices};
use crate::application::persistence::PersistenceManager;
use crate::application::scheduler::CycleScheduler;
use crate::application::tool_effects::ToolTable;
use crate::domain::config::{MissionConfigManifest, PersistenceBackend, PersistenceConfig, SandboxConfig};
use crate::domain::repository::KeyValueStore;
use crate::domain::sandbox::CodeSandbox;
use crate::infrastructure::embedding::build_embedder;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::kv_store::{InMemoryKeyValueStore, SledKeyValueStore};
use crate::infrastructure::llm::OracleRouter;
use crate::infrastructure::sandbox::{DisabledSandbox, ProcessSandbox};

/// Creates the key-value store for the configured backend
pub fn create_store(config: &PersistenceConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        PersistenceBackend::Memory => Ok(Arc::new(InMemoryKeyValueStore::new())),
        PersistenceBackend::Sled => {
            let path = Path::new(&config.path);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
            }
            let store = SledKeyValueStore::open(path)
                .with_context(|| format!("Failed to open mission store at {}", config.path))?;
            Ok(Arc::new(store))
        }
    }
}

/// Creates the code sandbox; disabled unless the manifest opts in
pub fn create_sandbox(config: &SandboxConfig) -> Arc<dyn CodeSandbox> {
    if config.enabled {
        info!("Code sandbox enabled (interpreter: {})", config.interpreter);
        Arc::new(ProcessSandbox::from_config(config))
    } else {
        Arc::new(DisabledSandbox)
    }
}

pub fn create_persistence(config: &PersistenceConfig) -> anyhow::Result<PersistenceManager> {
    Ok(PersistenceManager::new(create_store(config)?))
}

pub fn build_scheduler(manifest: &MissionConfigManifest, events: EventBus) -> anyhow::Result<CycleScheduler> {
    let spec = &manifest.spec;

    let router = OracleRouter::from_config(spec).context("Failed to initialize LLM providers")?;
    let oracles = router
        .oracle_set(&spec.llm_selection)
        .context("LLM selection refers to an unknown model alias")?;
    let embedder = build_embedder(&spec.embedding)?;
    let persistence = create_persistence(&spec.persistence)?;

    let services = MissionServices {
        oracles,
        sandbox: create_sandbox(&spec.sandbox),
    };
    let context = MissionContext::new(spec.mission.clone(), embedder, events);

    info!(
        "Mission '{}' ready (architect: {}, specialist: {}, backend: {:?})",
        manifest.metadata.name, spec.llm_selection.architect, spec.llm_selection.specialist, spec.persistence.backend
    );
    Ok(CycleScheduler::new(
        context,
        services,
        ToolTable::standard(),
        persistence,
        spec.mission.cycle_interval(),
    ))
}
