//! Mirror store trait and the memory/file implementations

use super::types::{MirrorEntry, MirrorFile};
use crate::error::{Error, Result};
use crate::persist::write_atomic;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Local mirror of a remote collection
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Create or replace the entry for `id`
    async fn upsert(&self, id: &str, payload: &str) -> Result<()>;

    /// Remove the entry for `id`; absent ids are ignored
    async fn delete(&self, id: &str) -> Result<()>;

    /// Whether an entry exists for `id`
    async fn contains(&self, id: &str) -> Result<bool>;

    /// Drop every entry
    async fn clear(&self) -> Result<()>;

    /// Payload stored for `id`
    async fn get(&self, id: &str) -> Result<Option<String>>;

    /// Number of entries
    async fn len(&self) -> Result<usize>;

    /// All ids, sorted
    async fn ids(&self) -> Result<Vec<String>>;

    /// Whether the store has no entries
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-memory mirror (no persistence)
#[derive(Debug, Default)]
pub struct MemoryMirrorStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryMirrorStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry
    pub async fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl MirrorStore for MemoryMirrorStore {
    async fn upsert(&self, id: &str, payload: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(id.to_string(), payload.to_string());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.entries.write().await.remove(id);
        Ok(())
    }

    async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(id))
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(id).cloned())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn ids(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

// ============================================================================
// File Store
// ============================================================================

/// Mirror kept in a single JSON file
///
/// The whole map is rewritten on every effective change; no-op mutations
/// (same payload, absent id) do not touch the file.
#[derive(Debug)]
pub struct FileMirrorStore {
    path: PathBuf,
    data: RwLock<MirrorFile>,
}

impl FileMirrorStore {
    /// Open a store, loading existing entries if the file is present
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::mirror(format!("Failed to read mirror file: {e}")))?;
            serde_json::from_str(&contents)
                .map_err(|e| Error::mirror(format!("Failed to parse mirror file: {e}")))?
        } else {
            MirrorFile::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Get the mirror file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full entry (payload and write time) for `id`
    pub async fn entry(&self, id: &str) -> Option<MirrorEntry> {
        self.data.read().await.entries.get(id).cloned()
    }

    async fn save(&self, data: &MirrorFile) -> Result<()> {
        let contents = serde_json::to_vec_pretty(data)
            .map_err(|e| Error::mirror(format!("Failed to serialize mirror: {e}")))?;
        write_atomic(&self.path, &contents)
            .await
            .map_err(|e| Error::mirror(format!("Failed to write mirror file: {e}")))
    }
}

#[async_trait]
impl MirrorStore for FileMirrorStore {
    async fn upsert(&self, id: &str, payload: &str) -> Result<()> {
        let mut data = self.data.write().await;
        if data
            .entries
            .get(id)
            .is_some_and(|entry| entry.payload == payload)
        {
            return Ok(());
        }

        let mut next = data.clone();
        next.entries.insert(
            id.to_string(),
            MirrorEntry {
                payload: payload.to_string(),
                updated_at: Utc::now(),
            },
        );
        self.save(&next).await?;
        *data = next;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut data = self.data.write().await;
        if !data.entries.contains_key(id) {
            return Ok(());
        }

        let mut next = data.clone();
        next.entries.remove(id);
        self.save(&next).await?;
        *data = next;
        Ok(())
    }

    async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.data.read().await.entries.contains_key(id))
    }

    async fn clear(&self) -> Result<()> {
        let mut data = self.data.write().await;
        let next = MirrorFile::default();
        self.save(&next).await?;
        *data = next;
        debug!("Cleared mirror file {}", self.path.display());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<String>> {
        Ok(self
            .data
            .read()
            .await
            .entries
            .get(id)
            .map(|entry| entry.payload.clone()))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.data.read().await.entries.len())
    }

    async fn ids(&self) -> Result<Vec<String>> {
        Ok(self.data.read().await.entries.keys().cloned().collect())
    }
}
