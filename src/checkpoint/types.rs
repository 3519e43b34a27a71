//! Checkpoint state types
//!
//! These types are serialized to JSON and persisted between runs.

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete persisted checkpoint state, one entry per collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Per-collection state
    #[serde(default)]
    pub collections: HashMap<String, CollectionState>,
}

impl CheckpointState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a collection
    pub fn get_collection(&self, collection: &str) -> Option<&CollectionState> {
        self.collections.get(collection)
    }

    /// Get checkpoint for a collection
    pub fn get_checkpoint(&self, collection: &str) -> Option<&str> {
        self.collections.get(collection)?.checkpoint.as_deref()
    }

    /// Set checkpoint for a collection
    pub fn set_checkpoint(&mut self, collection: &str, checkpoint: String, at: Timestamp) {
        let entry = self.collections.entry(collection.to_string()).or_default();
        entry.checkpoint = Some(checkpoint);
        entry.updated_at = Some(at);
    }

    /// Forget the checkpoint of a collection
    pub fn clear_checkpoint(&mut self, collection: &str) {
        self.collections.remove(collection);
    }
}

/// State for a single collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionState {
    /// Opaque sync token returned by the remote on the last completed pass
    #[serde(default)]
    pub checkpoint: Option<String>,

    /// When the checkpoint was written
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}
