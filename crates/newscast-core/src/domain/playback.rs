//! Playback state vocabulary.

use serde::{Deserialize, Serialize};

/// Current state of the playback controller.
///
/// Exactly one controller owns this value; it is the single source of
/// truth for "is anything audible right now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing is playing and no transition is in flight.
    #[default]
    Idle,

    /// Choosing the next item, refilling, or tearing down a session.
    Transitioning,

    /// A speech session is live.
    Synthesizing,

    /// A session failed. Reported to listeners, then settles on `Idle`.
    Error,
}

impl PlaybackState {
    /// Whether a transition or session currently owns the controller.
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Transitioning | Self::Synthesizing)
    }
}
