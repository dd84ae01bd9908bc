//! Persisted set of globally played item ids.
//!
//! Loaded once at construction, written through on every new insert.
//! Persistence failures never reach the caller: the in-memory set stays
//! authoritative for the running process and the failure is logged.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use newscast_core::{KeyValueStore, NewsItem};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::PlaybackError;

/// Storage key for the played id set.
pub const PLAYED_IDS_KEY: &str = "playedNewsIds";

/// Tracks which items have been spoken to completion or explicitly marked.
///
/// The set only grows. No expiry policy is applied.
pub struct PlayedItemTracker {
    store: Arc<dyn KeyValueStore>,
    ids: RwLock<HashSet<String>>,
    /// Serialises snapshot-and-write so an older snapshot never lands
    /// after a newer one.
    write_lock: Mutex<()>,
}

impl PlayedItemTracker {
    /// Load the persisted set from `store`.
    ///
    /// A missing, unreadable or corrupt value starts an empty set.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let ids = match store.get(PLAYED_IDS_KEY).await {
            Ok(Some(bytes)) => serde_json::from_slice::<Vec<String>>(&bytes)
                .map(|ids| ids.into_iter().collect())
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Played id set is corrupt, starting empty");
                    HashSet::new()
                }),
            Ok(None) => HashSet::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read played id set, starting empty");
                HashSet::new()
            }
        };

        debug!(count = ids.len(), "Loaded played id set");
        Self {
            store,
            ids: RwLock::new(ids),
            write_lock: Mutex::new(()),
        }
    }

    /// Whether `id` has been played.
    pub fn has(&self, id: &str) -> bool {
        self.ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Number of played ids.
    pub fn len(&self) -> usize {
        self.ids.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark `id` played. Marking twice is a no-op.
    ///
    /// Returns `true` when the id was newly inserted.
    pub async fn mark_played(&self, id: &str) -> bool {
        let inserted = self
            .ids
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string());

        if inserted {
            if let Err(e) = self.flush().await {
                warn!(error = %e, id, "Played id kept in memory only");
            }
        }
        inserted
    }

    /// Keep the items whose id is not played, preserving order.
    pub fn filter_unplayed(&self, items: Vec<NewsItem>) -> Vec<NewsItem> {
        let ids = self.ids.read().unwrap_or_else(PoisonError::into_inner);
        items.into_iter().filter(|item| !ids.contains(&item.id)).collect()
    }

    /// Whether every item in `items` is played. Vacuously true when empty.
    pub fn all_played(&self, items: &[NewsItem]) -> bool {
        let ids = self.ids.read().unwrap_or_else(PoisonError::into_inner);
        items.iter().all(|item| ids.contains(&item.id))
    }

    /// Write the current set to the store.
    pub async fn flush(&self) -> Result<(), PlaybackError> {
        let _guard = self.write_lock.lock().await;

        let mut snapshot: Vec<String> = self
            .ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        snapshot.sort_unstable();

        let bytes = serde_json::to_vec(&snapshot).map_err(|e| persistence_error(&e))?;
        self.store
            .set(PLAYED_IDS_KEY, &bytes)
            .await
            .map_err(|e| persistence_error(&e))
    }

    /// Forget every played id, in memory and in the store.
    pub async fn clear(&self) -> Result<(), PlaybackError> {
        let _guard = self.write_lock.lock().await;
        self.ids.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.store
            .remove(PLAYED_IDS_KEY)
            .await
            .map_err(|e| persistence_error(&e))
    }
}

fn persistence_error(err: &dyn std::fmt::Display) -> PlaybackError {
    PlaybackError::PersistenceWriteFailed {
        key: PLAYED_IDS_KEY.to_string(),
        reason: err.to_string(),
    }
}
