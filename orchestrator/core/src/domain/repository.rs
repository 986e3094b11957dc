// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Persistent Key-Value Store
//!
//! The mission keeps exactly one record (the snapshot) in a single namespace,
//! so the storage contract is a plain byte-oriented key-value store.
//!
//! | Implementation | Backend |
//! |----------------|---------|
//! | `SledKeyValueStore` | sled tree on local disk |
//! | `InMemoryKeyValueStore` | `HashMap` behind a lock, for tests and `memory` backend |
//!
//! Concrete implementations live in `crate::infrastructure::kv_store`.

use async_trait::async_trait;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RepositoryError>;

    /// Insert or overwrite
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), RepositoryError>;

    /// Remove a key; missing keys are not an error
    async fn delete(&self, key: &str) -> Result<(), RepositoryError>;

    /// Remove every key in the namespace
    async fn clear(&self) -> Result<(), RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Snapshot version {found} is newer than supported version {supported}")]
    IncompatibleVersion { found: u32, supported: u32 },

    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),
}
