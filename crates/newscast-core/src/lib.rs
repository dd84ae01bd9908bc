//! Core domain types and port definitions for newscast.
//!
//! This crate has no adapter code. It defines what a news item is, how
//! categories map onto upstream channels, the playback state vocabulary,
//! and the trait seams the orchestrator consumes:
//!
//! - [`NewsSourcePort`] fetches one channel's batch of items.
//! - [`SpeechSynthesisPort`] turns text into an [`Utterance`] event stream.
//! - [`KeyValueStore`] persists small opaque values by string key.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{CategoryId, ChannelItem, NewsItem, ParseCategoryError, PlaybackState};
pub use events::PlaybackEvent;
pub use ports::{
    FetchError, KeyValueStore, NewsSourcePort, SpeechEvent, SpeechPortError, SpeechSynthesisPort,
    StorageError, Utterance, UtteranceControl,
};
pub use settings::{
    DEFAULT_CANCEL_GRACE_MS, DEFAULT_FETCH_COUNT, DEFAULT_SPEECH_TIMEOUT_SECS, PlaybackSettings,
    SettingsError, validate_settings,
};
