//! Mirror entry types

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Local record of one remote item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorEntry {
    /// Last applied serialized payload
    pub payload: String,
    /// When the payload was written locally
    pub updated_at: Timestamp,
}

/// On-disk layout of the file mirror store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirrorFile {
    /// Entries keyed by item id
    #[serde(default)]
    pub entries: BTreeMap<String, MirrorEntry>,
}
