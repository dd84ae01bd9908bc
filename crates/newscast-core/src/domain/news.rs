//! News item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CategoryId;

/// One item as returned by a single upstream channel.
///
/// Channels know nothing about categories; the category store stamps the
/// category when it turns a batch into [`NewsItem`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelItem {
    /// Upstream identity. Two channels may return the same id.
    pub id: String,
    pub title: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
}

/// A fetched news item. Identity is `id`; immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub category: CategoryId,
}

impl NewsItem {
    /// Build a category item from a channel item.
    pub fn from_channel(item: ChannelItem, category: CategoryId) -> Self {
        Self {
            id: item.id,
            title: item.title,
            content: item.content,
            published_at: item.published_at,
            category,
        }
    }

    /// Text handed to the speech provider: title, a full-width stop, content.
    pub fn speech_text(&self) -> String {
        format!("{}。{}", self.title, self.content)
    }
}
