//! News source port.
//!
//! One call fetches one upstream channel. Network, HTTP and payload
//! details belong to the implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ChannelItem;

/// Per-channel fetch failure. Recoverable and isolated to one category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failed before a response arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP error: {status}")]
    Http { status: u16 },

    /// The payload could not be decoded.
    #[error("Failed to decode channel payload: {0}")]
    Decode(String),

    /// The payload decoded but the upstream reported an error.
    #[error("Upstream error {code}: {message}")]
    Upstream { code: i64, message: String },
}

/// Fetches batches of items from upstream channels.
///
/// Must be safely callable concurrently for distinct channels; the
/// category store fans out one call per channel.
#[async_trait]
pub trait NewsSourcePort: Send + Sync {
    /// Fetch up to `count` items from `channel_id`.
    async fn fetch_channel(
        &self,
        channel_id: &str,
        count: usize,
    ) -> Result<Vec<ChannelItem>, FetchError>;
}
