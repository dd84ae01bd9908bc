//! Persisted last-played index per category.
//!
//! Indices are stored raw and clamped at read time, because the category
//! list can shrink or grow between writes when it is refilled. Each index
//! may carry the id of the item it pointed at; when that item is still
//! listed, [`PlaybackPositionTracker::resolve`] follows the id instead of
//! the raw index.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use newscast_core::{CategoryId, KeyValueStore, NewsItem};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::PlaybackError;

/// Storage key for the per-category position map.
pub const POSITIONS_KEY: &str = "categoryLastIndex";

/// Storage key for the item ids the positions pointed at.
pub const POSITION_ANCHORS_KEY: &str = "categoryLastItemId";

#[derive(Default)]
struct Positions {
    indices: BTreeMap<CategoryId, usize>,
    anchors: BTreeMap<CategoryId, String>,
}

/// Remembers where each category's listening stopped.
pub struct PlaybackPositionTracker {
    store: Arc<dyn KeyValueStore>,
    positions: RwLock<Positions>,
    write_lock: Mutex<()>,
}

impl PlaybackPositionTracker {
    /// Load the persisted positions from `store`.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let positions = Positions {
            indices: load_map(store.as_ref(), POSITIONS_KEY).await,
            anchors: load_map(store.as_ref(), POSITION_ANCHORS_KEY).await,
        };

        Self {
            store,
            positions: RwLock::new(positions),
            write_lock: Mutex::new(()),
        }
    }

    /// Last recorded index for `category`, clamped to `[0, len - 1]`.
    ///
    /// `None` when the category has no items or nothing was recorded.
    pub fn get(&self, category: CategoryId, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        self.recorded(category).map(|index| index.min(len - 1))
    }

    /// Where to resume in `list`: the anchored item if it is still listed,
    /// else the clamped index.
    pub fn resolve(&self, category: CategoryId, list: &[NewsItem]) -> Option<usize> {
        let anchored = self
            .anchor(category)
            .and_then(|id| list.iter().position(|item| item.id == id));
        anchored.or_else(|| self.get(category, list.len()))
    }

    /// The raw recorded index, unclamped.
    pub fn recorded(&self, category: CategoryId) -> Option<usize> {
        self.positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .indices
            .get(&category)
            .copied()
    }

    /// Id of the item the recorded index pointed at, if known.
    pub fn anchor(&self, category: CategoryId) -> Option<String> {
        self.positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .anchors
            .get(&category)
            .cloned()
    }

    /// Snapshot of every recorded position.
    pub fn snapshot(&self) -> BTreeMap<CategoryId, usize> {
        self.positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .indices
            .clone()
    }

    /// Record `index` for `category` with no anchor and persist
    /// immediately.
    pub async fn set(&self, category: CategoryId, index: usize) {
        self.set_at(category, index, None).await;
    }

    /// Record `index` for `category`, anchored to the item `anchor` when
    /// given, and persist immediately.
    ///
    /// Persistence failures are logged; the in-memory value is kept.
    pub async fn set_at(&self, category: CategoryId, index: usize, anchor: Option<&str>) {
        {
            let mut positions = self.positions.write().unwrap_or_else(PoisonError::into_inner);
            positions.indices.insert(category, index);
            match anchor {
                Some(id) => positions.anchors.insert(category, id.to_string()),
                None => positions.anchors.remove(&category),
            };
        }
        debug!(%category, index, ?anchor, "Recorded playback position");

        if let Err(e) = self.flush().await {
            warn!(error = %e, %category, index, "Position kept in memory only");
        }
    }

    /// Write the current maps to the store.
    pub async fn flush(&self) -> Result<(), PlaybackError> {
        let _guard = self.write_lock.lock().await;
        let (indices, anchors) = {
            let positions = self.positions.read().unwrap_or_else(PoisonError::into_inner);
            (
                serde_json::to_vec(&positions.indices),
                serde_json::to_vec(&positions.anchors),
            )
        };

        let indices = indices.map_err(|e| persistence_error(POSITIONS_KEY, &e))?;
        self.store
            .set(POSITIONS_KEY, &indices)
            .await
            .map_err(|e| persistence_error(POSITIONS_KEY, &e))?;

        let anchors = anchors.map_err(|e| persistence_error(POSITION_ANCHORS_KEY, &e))?;
        self.store
            .set(POSITION_ANCHORS_KEY, &anchors)
            .await
            .map_err(|e| persistence_error(POSITION_ANCHORS_KEY, &e))
    }

    /// Forget every position, in memory and in the store.
    pub async fn clear(&self) -> Result<(), PlaybackError> {
        let _guard = self.write_lock.lock().await;
        *self.positions.write().unwrap_or_else(PoisonError::into_inner) = Positions::default();

        for key in [POSITIONS_KEY, POSITION_ANCHORS_KEY] {
            self.store
                .remove(key)
                .await
                .map_err(|e| persistence_error(key, &e))?;
        }
        Ok(())
    }
}

async fn load_map<V: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> BTreeMap<CategoryId, V> {
    match store.get(key).await {
        Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(key, error = %e, "Stored positions are corrupt, starting empty");
            BTreeMap::new()
        }),
        Ok(None) => BTreeMap::new(),
        Err(e) => {
            warn!(key, error = %e, "Failed to read stored positions, starting empty");
            BTreeMap::new()
        }
    }
}

fn persistence_error(key: &str, err: &dyn std::fmt::Display) -> PlaybackError {
    PlaybackError::PersistenceWriteFailed {
        key: key.to_string(),
        reason: err.to_string(),
    }
}
