// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Key-value store adapters: sled on disk, and a `HashMap` for tests.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::repository::{KeyValueStore, RepositoryError};

const DEFAULT_TREE: &str = "mission";

/// One sled tree acts as the namespace
pub struct SledKeyValueStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledKeyValueStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let db = sled::open(path).map_err(storage_error)?;
        let tree = db.open_tree(DEFAULT_TREE).map_err(storage_error)?;
        Ok(Self { db, tree })
    }

    async fn flush(&self) -> Result<(), RepositoryError> {
        self.db.flush_async().await.map_err(storage_error)?;
        Ok(())
    }
}

fn storage_error(e: sled::Error) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

#[async_trait]
impl KeyValueStore for SledKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RepositoryError> {
        Ok(self.tree.get(key).map_err(storage_error)?.map(|v| v.to_vec()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), RepositoryError> {
        self.tree.insert(key, value).map_err(storage_error)?;
        self.flush().await
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        self.tree.remove(key).map_err(storage_error)?;
        self.flush().await
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        self.tree.clear().map_err(storage_error)?;
        self.flush().await
    }
}

#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RepositoryError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), RepositoryError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        self.entries.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("snapshot").await.unwrap(), None);
        store.put("snapshot", b"one".to_vec()).await.unwrap();
        store.put("snapshot", b"two".to_vec()).await.unwrap();
        assert_eq!(store.get("snapshot").await.unwrap(), Some(b"two".to_vec()));

        store.delete("snapshot").await.unwrap();
        store.delete("snapshot").await.unwrap();
        assert_eq!(store.get("snapshot").await.unwrap(), None);

        store.put("a", vec![1]).await.unwrap();
        store.put("b", vec![2]).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        exercise(&InMemoryKeyValueStore::new()).await;
    }

    #[tokio::test]
    async fn test_sled_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledKeyValueStore::open(dir.path().join("db")).unwrap();
        exercise(&store).await;
    }
}
