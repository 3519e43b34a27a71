//! Remote source trait

use super::types::{ListRequest, Page};
use crate::error::Result;
use async_trait::async_trait;

/// Paginated view of a remote, mutable item collection
///
/// Implementations report failures through the crate error type; the sync
/// engine reads them with [`Error::class`](crate::error::Error::class):
/// - [`Error::CheckpointInvalid`](crate::error::Error::CheckpointInvalid)
///   when the supplied checkpoint is no longer usable
/// - a retryable error for network and server faults
/// - anything else is fatal
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch one page
    async fn list(&self, request: &ListRequest) -> Result<Page>;
}
