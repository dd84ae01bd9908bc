//! In-memory news cache keyed by category.
//!
//! Every fetch runs the same pipeline:
//!
//! ```text
//!   fan out one fetch per channel → join → merge in channel order
//!     → dedupe by id (first seen wins) → shuffle (domestic only)
//!     → drop played items → swap the cached list
//! ```
//!
//! Lists are held as `Arc<[NewsItem]>` and swapped whole, so a reader
//! always sees one refill generation, never a mix.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::future::join_all;
use newscast_core::{
    CategoryId, ChannelItem, FetchError, NewsItem, NewsSourcePort, PlaybackSettings,
};
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::error::{CategoryReport, ChannelFailure, PlaybackError};
use crate::played::PlayedItemTracker;

/// Category-keyed cache of unplayed news items.
pub struct CategoryNewsStore {
    source: Arc<dyn NewsSourcePort>,
    played: Arc<PlayedItemTracker>,
    channels: HashMap<CategoryId, Vec<String>>,
    fetch_count: usize,
    lists: RwLock<HashMap<CategoryId, Arc<[NewsItem]>>>,
}

impl CategoryNewsStore {
    /// Create an empty store. Channel mapping and batch size come from
    /// `settings`.
    pub fn new(
        source: Arc<dyn NewsSourcePort>,
        played: Arc<PlayedItemTracker>,
        settings: &PlaybackSettings,
    ) -> Self {
        let channels = CategoryId::ALL
            .into_iter()
            .map(|c| (c, settings.channels_for(c)))
            .collect();

        Self {
            source,
            played,
            channels,
            fetch_count: settings.fetch_count,
            lists: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch every category in `categories` concurrently.
    ///
    /// A non-empty result replaces the category's list. An all-played
    /// batch leaves any prior list untouched. A failed category never
    /// affects its siblings.
    pub async fn preload(&self, categories: &[CategoryId]) -> CategoryReport {
        let fetches = categories.iter().map(|&category| async move {
            (category, self.fetch_category(category).await)
        });

        let mut report = CategoryReport::new();
        for (category, result) in join_all(fetches).await {
            let entry = match result {
                Ok(items) if items.is_empty() => {
                    debug!(%category, "Preload returned only played items, keeping prior list");
                    Ok(0)
                }
                Ok(items) => {
                    let count = items.len();
                    self.replace(category, items);
                    Ok(count)
                }
                Err(e) => {
                    warn!(%category, error = %e, "Category preload failed");
                    Err(e)
                }
            };
            report.insert(category, entry);
        }

        info!(
            categories = categories.len(),
            failed = report.values().filter(|r| r.is_err()).count(),
            "Preload finished"
        );
        report
    }

    /// Refetch one category and atomically replace its list.
    ///
    /// On failure the prior list is kept. Returns the new list length.
    pub async fn refill(&self, category: CategoryId) -> Result<usize, PlaybackError> {
        let items = self.fetch_category(category).await?;
        let count = items.len();
        self.replace(category, items);
        info!(%category, count, "Category refilled");
        Ok(count)
    }

    /// The cached list for `category`, possibly empty. Never fetches.
    pub fn current_list(&self, category: CategoryId) -> Arc<[NewsItem]> {
        self.lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&category)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Whether every cached item of `category` has been played.
    ///
    /// True for an empty list.
    pub fn is_exhausted(&self, category: CategoryId) -> bool {
        self.played.all_played(&self.current_list(category))
    }

    /// Seed a category list directly, bypassing the fetch pipeline.
    pub fn seed(&self, category: CategoryId, items: Vec<NewsItem>) {
        self.replace(category, items);
    }

    fn replace(&self, category: CategoryId, items: Vec<NewsItem>) {
        let list: Arc<[NewsItem]> = Arc::from(items);
        self.lists
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(category, list);
    }

    async fn fetch_category(&self, category: CategoryId) -> Result<Vec<NewsItem>, PlaybackError> {
        let channels = self
            .channels
            .get(&category)
            .filter(|c| !c.is_empty())
            .ok_or(PlaybackError::NoChannels(category))?;

        let fetches = channels.iter().map(|channel| async move {
            let result = self.source.fetch_channel(channel, self.fetch_count).await;
            (channel.clone(), result)
        });
        let batches = join_all(fetches).await;

        let mut items = merge_channel_batches(category, batches)?;
        if category.shuffles_on_refill() {
            items.shuffle(&mut rand::thread_rng());
        }

        let fetched = items.len();
        let unplayed = self.played.filter_unplayed(items);
        debug!(%category, fetched, unplayed = unplayed.len(), "Fetched category");
        Ok(unplayed)
    }
}

/// Merge per-channel results in channel order, keeping the first
/// occurrence of each id.
///
/// Fails only when no channel succeeded.
fn merge_channel_batches(
    category: CategoryId,
    batches: Vec<(String, Result<Vec<ChannelItem>, FetchError>)>,
) -> Result<Vec<NewsItem>, PlaybackError> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    let mut failures = Vec::new();
    let mut any_success = false;

    for (channel, result) in batches {
        match result {
            Ok(batch) => {
                any_success = true;
                debug!(%category, %channel, count = batch.len(), "Channel fetched");
                for item in batch {
                    if seen.insert(item.id.clone()) {
                        merged.push(NewsItem::from_channel(item, category));
                    }
                }
            }
            Err(error) => {
                warn!(%category, %channel, %error, "Channel fetch failed");
                failures.push(ChannelFailure { channel, error });
            }
        }
    }

    if !any_success {
        return Err(PlaybackError::AllChannelsFailed { category, failures });
    }
    Ok(merged)
}
