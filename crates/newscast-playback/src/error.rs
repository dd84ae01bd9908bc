//! Playback error types.

use std::collections::BTreeMap;
use std::time::Duration;

use newscast_core::{CategoryId, FetchError};

/// One channel's failure inside a category fetch. Recoverable on its
/// own; it only surfaces through [`PlaybackError::AllChannelsFailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFailure {
    pub channel: String,
    pub error: FetchError,
}

/// Errors that can occur while orchestrating playback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    /// No channel of the category returned data.
    #[error("All channels failed for category {category}")]
    AllChannelsFailed {
        category: CategoryId,
        failures: Vec<ChannelFailure>,
    },

    /// The category has no upstream channels configured.
    #[error("Category {0} has no channels configured")]
    NoChannels(CategoryId),

    /// The speech provider refused the text or failed mid-utterance.
    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    /// The speech provider never reached a terminal event.
    #[error("Speech synthesis timed out after {0:?}")]
    SynthesisTimeout(Duration),

    /// A persistence write failed. In-memory state stays authoritative.
    #[error("Failed to persist '{key}': {reason}")]
    PersistenceWriteFailed { key: String, reason: String },

    /// Another transition is already in flight.
    #[error("A playback transition is already in flight")]
    StateConflict,
}

impl PlaybackError {
    /// Whether the failure came from the speech provider.
    pub const fn is_synthesis(&self) -> bool {
        matches!(self, Self::SynthesisFailed(_) | Self::SynthesisTimeout(_))
    }
}

/// Per-category outcome of a preload or refill: item count stored, or
/// the category-scoped failure.
pub type CategoryReport = BTreeMap<CategoryId, Result<usize, PlaybackError>>;
