//! Continuous news playback orchestration.
//!
//! The [`PlaybackController`] owns one state machine per app session. It
//! pulls items from the [`CategoryNewsStore`], speaks them one at a time
//! through a [`SpeechSession`], records completions in the
//! [`PlayedItemTracker`] and remembers where each category stopped in the
//! [`PlaybackPositionTracker`].
//!
//! # Guarantees
//!
//! - At most one speech session is live at any time, whatever the
//!   category.
//! - `stop()` returns only after the provider released the live session
//!   (or the cancel grace period elapsed).
//! - Only items spoken to completion, or explicitly marked, are recorded
//!   as played.

#![deny(unused_crate_dependencies)]

mod controller;
mod error;
mod played;
mod position;
mod session;
mod store;

pub use controller::{PlayStart, PlaybackController, Subscription};
pub use error::{CategoryReport, ChannelFailure, PlaybackError};
pub use played::{PLAYED_IDS_KEY, PlayedItemTracker};
pub use position::{POSITION_ANCHORS_KEY, POSITIONS_KEY, PlaybackPositionTracker};
pub use session::{
    SessionConfig, SessionFailure, SessionOutcome, SessionState, SessionWaiter, SpeechSession,
};
pub use store::CategoryNewsStore;

// Dev-dependencies only used by the integration tests.
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;
