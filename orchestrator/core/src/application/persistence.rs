// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Persistence Manager - Application Layer
//!
//! Saves and loads the single mission snapshot. Rebuilding the semantic
//! index after a load is the caller's job (see `MissionContext::restore`).

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::repository::{KeyValueStore, RepositoryError};
use crate::domain::snapshot::MissionSnapshot;

/// Key of the only record the mission writes
pub const SNAPSHOT_KEY: &str = "mission_snapshot";

#[derive(Clone)]
pub struct PersistenceManager {
    store: Arc<dyn KeyValueStore>,
}

impl PersistenceManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn save(&self, snapshot: &MissionSnapshot) -> Result<(), RepositoryError> {
        let bytes = snapshot.to_bytes()?;
        debug!(
            "Saving snapshot at cycle {} ({} nodes, {} bytes)",
            snapshot.cycle_counter,
            snapshot.nodes.len(),
            bytes.len()
        );
        self.store.put(SNAPSHOT_KEY, bytes).await
    }

    /// `Ok(None)` when no snapshot has been written yet
    pub async fn load(&self) -> Result<Option<MissionSnapshot>, RepositoryError> {
        match self.store.get(SNAPSHOT_KEY).await? {
            Some(bytes) => {
                let snapshot = MissionSnapshot::from_bytes(&bytes)?;
                info!(
                    "Loaded snapshot from cycle {} with {} nodes",
                    snapshot.cycle_counter,
                    snapshot.nodes.len()
                );
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// Remove the snapshot only
    pub async fn clear(&self) -> Result<(), RepositoryError> {
        self.store.delete(SNAPSHOT_KEY).await
    }

    /// Remove everything in the mission namespace
    pub async fn purge(&self) -> Result<(), RepositoryError> {
        self.store.clear().await
    }
}
