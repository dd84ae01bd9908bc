//! Events emitted by the playback controller to UI and driver layers.

use serde::{Deserialize, Serialize};

use crate::domain::{CategoryId, NewsItem, PlaybackState};

/// A playback lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// Controller state changed.
    StateChanged { state: PlaybackState },

    /// A speech session started for this item.
    ItemStarted { item: NewsItem, index: usize },

    /// The item was spoken to completion and marked played.
    ItemCompleted { item: NewsItem, index: usize },

    /// The category had nothing left to play, even after a refill.
    CategoryEmpty { category: CategoryId },

    /// The category cache was replaced by a refill.
    CategoryRefilled { category: CategoryId, count: usize },

    /// A failure was surfaced to the listener.
    Error { message: String },
}

impl PlaybackEvent {
    /// Short name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StateChanged { .. } => "state_changed",
            Self::ItemStarted { .. } => "item_started",
            Self::ItemCompleted { .. } => "item_completed",
            Self::CategoryEmpty { .. } => "category_empty",
            Self::CategoryRefilled { .. } => "category_refilled",
            Self::Error { .. } => "error",
        }
    }
}
