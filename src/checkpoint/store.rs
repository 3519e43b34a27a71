//! Checkpoint store implementations
//!
//! Provides file-based checkpoint persistence with atomic writes.

use super::types::{CheckpointState, CollectionState};
use crate::error::{Error, Result};
use crate::persist::write_atomic;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Durable home of one collection's sync checkpoint
///
/// `set` and `clear` must not return before the change is on disk: the sync
/// engine relies on that ordering relative to its mirror writes.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Current checkpoint, if any
    async fn get(&self) -> Result<Option<String>>;

    /// Replace the checkpoint
    async fn set(&self, checkpoint: &str) -> Result<()>;

    /// Forget the checkpoint
    async fn clear(&self) -> Result<()>;
}

// ============================================================================
// File Store
// ============================================================================

/// Checkpoint store backed by a JSON state file
///
/// Several collections may share a state file; each store instance owns
/// the entry of its own collection.
#[derive(Debug)]
pub struct FileCheckpointStore {
    /// Path to the state file
    path: PathBuf,
    /// Collection whose checkpoint this store manages
    collection: String,
    /// Current state (cached)
    state: RwLock<CheckpointState>,
}

impl FileCheckpointStore {
    /// Open a store, loading existing state if the file is present
    pub fn open(path: impl AsRef<Path>, collection: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                Error::checkpoint(format!("Failed to read state file: {e}"))
            })?;
            serde_json::from_str(&contents)
                .map_err(|e| Error::checkpoint(format!("Failed to parse state file: {e}")))?
        } else {
            CheckpointState::new()
        };

        Ok(Self {
            path,
            collection: collection.into(),
            state: RwLock::new(state),
        })
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the collection name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Snapshot of this collection's entry (checkpoint and write time)
    pub async fn collection_state(&self) -> Option<CollectionState> {
        let state = self.state.read().await;
        state.get_collection(&self.collection).cloned()
    }

    /// Write state to disk before returning
    async fn save(&self, state: &CheckpointState) -> Result<()> {
        let contents = serde_json::to_string_pretty(state)
            .map_err(|e| Error::checkpoint(format!("Failed to serialize state: {e}")))?;

        write_atomic(&self.path, contents.as_bytes())
            .await
            .map_err(|e| Error::checkpoint(format!("Failed to write state file: {e}")))?;

        debug!("Saved checkpoint state to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn get(&self) -> Result<Option<String>> {
        let state = self.state.read().await;
        Ok(state.get_checkpoint(&self.collection).map(ToString::to_string))
    }

    async fn set(&self, checkpoint: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        next.set_checkpoint(&self.collection, checkpoint.to_string(), Utc::now());
        self.save(&next).await?;
        *state = next;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if state.get_collection(&self.collection).is_none() && self.path.exists() {
            return Ok(());
        }
        let mut next = state.clone();
        next.clear_checkpoint(&self.collection);
        self.save(&next).await?;
        *state = next;
        Ok(())
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-memory checkpoint store (no persistence)
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    checkpoint: RwLock<Option<String>>,
}

impl MemoryCheckpointStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a checkpoint
    pub fn with_checkpoint(checkpoint: impl Into<String>) -> Self {
        Self {
            checkpoint: RwLock::new(Some(checkpoint.into())),
        }
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn get(&self) -> Result<Option<String>> {
        Ok(self.checkpoint.read().await.clone())
    }

    async fn set(&self, checkpoint: &str) -> Result<()> {
        *self.checkpoint.write().await = Some(checkpoint.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.checkpoint.write().await = None;
        Ok(())
    }
}
