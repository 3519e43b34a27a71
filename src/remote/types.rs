//! Remote source request and page types

use crate::types::{SyncMode, Timestamp};
use serde::{Deserialize, Serialize};

/// Whether an item is live or has been removed remotely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Active,
    /// Cancelled or deleted; the mirror must drop it
    Tombstoned,
}

/// One item of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Identifier, unique within the collection
    pub id: String,
    pub status: ItemStatus,
    /// Opaque serialized state
    pub payload: String,
}

impl Item {
    /// Create a live item
    pub fn active(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Active,
            payload: payload.into(),
        }
    }

    /// Create a tombstoned item
    pub fn tombstone(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Tombstoned,
            payload: payload.into(),
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.status == ItemStatus::Tombstoned
    }
}

/// One page of a `list` response
///
/// `checkpoint` is only meaningful on the last page, i.e. when
/// `next_cursor` is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<Item>,
    pub next_cursor: Option<String>,
    pub checkpoint: Option<String>,
}

impl Page {
    /// Create an intermediate page
    pub fn with_cursor(items: Vec<Item>, next_cursor: impl Into<String>) -> Self {
        Self {
            items,
            next_cursor: Some(next_cursor.into()),
            checkpoint: None,
        }
    }

    /// Create the last page of a pass
    pub fn last(items: Vec<Item>, checkpoint: impl Into<String>) -> Self {
        Self {
            items,
            next_cursor: None,
            checkpoint: Some(checkpoint.into()),
        }
    }

    /// Whether this page ends the pass
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// Arguments of a single `list` call
///
/// `checkpoint` and `lower_bound` are mutually exclusive filters: a full
/// pass sets only the lower bound, an incremental pass only the checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub checkpoint: Option<String>,
    pub page_cursor: Option<String>,
    pub lower_bound: Option<Timestamp>,
}

impl ListRequest {
    /// First request of a full pass
    pub fn full(lower_bound: Timestamp) -> Self {
        Self {
            checkpoint: None,
            page_cursor: None,
            lower_bound: Some(lower_bound),
        }
    }

    /// First request of an incremental pass
    pub fn incremental(checkpoint: impl Into<String>) -> Self {
        Self {
            checkpoint: Some(checkpoint.into()),
            page_cursor: None,
            lower_bound: None,
        }
    }

    /// Same filters, positioned at `cursor`
    #[must_use]
    pub fn at_cursor(&self, cursor: Option<String>) -> Self {
        Self {
            page_cursor: cursor,
            ..self.clone()
        }
    }

    pub fn mode(&self) -> SyncMode {
        if self.checkpoint.is_some() {
            SyncMode::Incremental
        } else {
            SyncMode::Full
        }
    }
}
