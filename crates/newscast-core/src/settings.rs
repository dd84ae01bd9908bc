//! Playback settings and validation.
//!
//! Pure domain types with no infrastructure dependencies. The CLI loads
//! them from a JSON file; every field falls back to its default.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::CategoryId;

/// Default number of items requested per channel.
pub const DEFAULT_FETCH_COUNT: usize = 20;

/// Default watchdog for a speech session that never terminates.
pub const DEFAULT_SPEECH_TIMEOUT_SECS: u64 = 300;

/// Default bounded wait for a provider to acknowledge a cancel.
pub const DEFAULT_CANCEL_GRACE_MS: u64 = 200;

/// Orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Items requested from each channel per fetch (1-100).
    pub fetch_count: usize,

    /// Whether the next item is spoken automatically after a completion.
    pub auto_advance: bool,

    /// Seconds before a silent session is failed with a timeout.
    pub speech_timeout_secs: u64,

    /// Milliseconds to wait for a provider to acknowledge a cancel.
    pub cancel_grace_ms: u64,

    /// Category the CLI plays when none is given.
    pub initial_category: CategoryId,

    /// Channel overrides per category. Missing categories use
    /// [`CategoryId::default_channels`].
    pub channels: BTreeMap<CategoryId, Vec<String>>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        let channels = CategoryId::ALL
            .into_iter()
            .map(|c| {
                let ids = c.default_channels().iter().map(ToString::to_string).collect();
                (c, ids)
            })
            .collect();

        Self {
            fetch_count: DEFAULT_FETCH_COUNT,
            auto_advance: true,
            speech_timeout_secs: DEFAULT_SPEECH_TIMEOUT_SECS,
            cancel_grace_ms: DEFAULT_CANCEL_GRACE_MS,
            initial_category: CategoryId::Domestic,
            channels,
        }
    }
}

impl PlaybackSettings {
    /// Parse settings from a JSON document, filling gaps with defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| SettingsError::Parse(e.to_string()))?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Channel ids for `category`, falling back to the built-in mapping.
    pub fn channels_for(&self, category: CategoryId) -> Vec<String> {
        self.channels.get(&category).map_or_else(
            || category.default_channels().iter().map(ToString::to_string).collect(),
            Clone::clone,
        )
    }

    /// Session watchdog as a [`Duration`].
    pub const fn speech_timeout(&self) -> Duration {
        Duration::from_secs(self.speech_timeout_secs)
    }

    /// Cancel grace period as a [`Duration`].
    pub const fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Fetch count must be between 1 and 100, got {0}")]
    InvalidFetchCount(usize),

    #[error("Speech timeout must be at least one second")]
    ZeroSpeechTimeout,

    #[error("Cancel grace period must be at least one millisecond")]
    ZeroCancelGrace,

    #[error("Category '{0}' has an empty channel list")]
    EmptyChannels(CategoryId),

    #[error("Failed to parse settings: {0}")]
    Parse(String),
}

/// Validate settings values.
pub fn validate_settings(settings: &PlaybackSettings) -> Result<(), SettingsError> {
    if !(1..=100).contains(&settings.fetch_count) {
        return Err(SettingsError::InvalidFetchCount(settings.fetch_count));
    }

    if settings.speech_timeout_secs == 0 {
        return Err(SettingsError::ZeroSpeechTimeout);
    }

    if settings.cancel_grace_ms == 0 {
        return Err(SettingsError::ZeroCancelGrace);
    }

    if let Some((category, _)) = settings
        .channels
        .iter()
        .find(|(_, ids)| ids.iter().all(|id| id.trim().is_empty()))
    {
        return Err(SettingsError::EmptyChannels(*category));
    }

    Ok(())
}
