//! Single-document JSON key-value store.
//!
//! Format: one JSON object mapping each key to its base64-encoded value.
//!
//! ```text
//! { "playedNewsIds": "WyJhIiwiYiJd", "categoryLastIndex": "eyJ0ZWNoIjozfQ==" }
//! ```
//!
//! # Atomicity
//! Every write rewrites the whole document:
//! 1. Write to `<file>.tmp`
//! 2. Rename over `<file>` (atomic on Unix/macOS)

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use newscast_core::{KeyValueStore, StorageError};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// File-backed store. The in-memory map is authoritative; the file is
/// rewritten on every mutation.
#[derive(Debug)]
pub struct JsonFileKvStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFileKvStore {
    /// Open the store at `path`, loading the existing document if present.
    ///
    /// A missing file is an empty store. A corrupt file is an error so the
    /// caller can decide whether to discard it.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let values = match fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                StorageError::Encoding(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(io_error(&path, &e)),
        };

        debug!(path = %path.display(), keys = values.len(), "Opened key-value store");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_document(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| io_error(dir, &e))?;
        }

        let content = serde_json::to_vec_pretty(values)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let mut temp_name = self.path.as_os_str().to_os_string();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, content)
            .await
            .map_err(|e| io_error(&temp_path, &e))?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| io_error(&self.path, &e))
    }
}

fn io_error(path: &Path, err: &io::Error) -> StorageError {
    StorageError::Io(format!("{}: {err}", path.display()))
}

#[async_trait]
impl KeyValueStore for JsonFileKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let values = self.values.lock().await;
        values
            .get(key)
            .map(|encoded| {
                STANDARD
                    .decode(encoded)
                    .map_err(|e| StorageError::Encoding(format!("{key}: {e}")))
            })
            .transpose()
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut values = self.values.lock().await;
        values.insert(key.to_string(), STANDARD.encode(value));
        self.write_document(&values).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().await;
        if values.remove(key).is_none() {
            return Ok(());
        }
        self.write_document(&values).await
    }
}
