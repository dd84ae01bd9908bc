//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where adapters are wired together:
//! - Key-value persistence (via newscast-kv), in memory for `--ephemeral`
//! - Sina roll feed news source
//! - Console speech provider
//! - The playback controller (via newscast-playback)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use newscast_core::{KeyValueStore, PlaybackSettings};
use newscast_kv::{InMemoryKvStore, JsonFileKvStore};
use newscast_playback::PlaybackController;
use tracing::{debug, info};

use crate::adapters::{ConsoleSpeech, DEFAULT_CHARS_PER_SECOND, SinaConfig, SinaRollSource};
use crate::error::CliError;
use crate::parser::Cli;
use crate::paths::{SETTINGS_FILE, STATE_FILE, resolve_data_dir};

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Directory holding persisted state and the default settings file.
    pub data_dir: PathBuf,
    /// Explicit settings file, if given.
    pub settings_path: Option<PathBuf>,
    /// Console reading pace.
    pub chars_per_second: u32,
    /// Keep played ids and positions in memory only.
    pub ephemeral: bool,
}

impl CliConfig {
    /// Resolve the configuration from global CLI flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        Ok(Self {
            data_dir: resolve_data_dir(cli.data_dir.as_deref())?,
            settings_path: cli.config.clone(),
            chars_per_second: DEFAULT_CHARS_PER_SECOND,
            ephemeral: cli.ephemeral,
        })
    }

    #[must_use]
    pub fn with_chars_per_second(mut self, chars_per_second: u32) -> Self {
        self.chars_per_second = chars_per_second;
        self
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub settings: PlaybackSettings,
    pub data_dir: PathBuf,
    pub controller: PlaybackController,
}

/// Load settings from `explicit`, else from the data directory, else
/// defaults. An explicit path must exist.
pub async fn load_settings(
    explicit: Option<&Path>,
    data_dir: &Path,
) -> Result<PlaybackSettings, CliError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = data_dir.join(SETTINGS_FILE);
            if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                debug!("No settings file, using defaults");
                return Ok(PlaybackSettings::default());
            }
            candidate
        }
    };

    let json = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| CliError::Config(format!("cannot read {}: {e}", path.display())))?;
    let settings = PlaybackSettings::from_json(&json)?;
    debug!(path = %path.display(), "Loaded settings");
    Ok(settings)
}

/// Compose the CLI context.
pub async fn bootstrap(config: &CliConfig) -> Result<CliContext, CliError> {
    let settings = load_settings(config.settings_path.as_deref(), &config.data_dir).await?;

    let kv: Arc<dyn KeyValueStore> = if config.ephemeral {
        debug!("Ephemeral run, history is not persisted");
        Arc::new(InMemoryKvStore::new())
    } else {
        Arc::new(JsonFileKvStore::open(config.data_dir.join(STATE_FILE)).await?)
    };
    let source = Arc::new(SinaRollSource::new(SinaConfig::default())?);
    let speech = Arc::new(ConsoleSpeech::new(config.chars_per_second)?);

    let controller = PlaybackController::from_ports(source, speech, kv, &settings).await;
    info!(data_dir = %config.data_dir.display(), "Newscast ready");

    Ok(CliContext {
        settings,
        data_dir: config.data_dir.clone(),
        controller,
    })
}
