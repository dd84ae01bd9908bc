//! News categories and their upstream channel mapping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A logical news topic grouping one or more upstream channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryId {
    /// Finance, society and entertainment feeds.
    Domestic,
    /// Sports feed.
    International,
    /// Military feed.
    Life,
    /// Technology feed.
    Tech,
}

impl CategoryId {
    /// Every category, in display order.
    pub const ALL: [Self; 4] = [Self::Domestic, Self::International, Self::Life, Self::Tech];

    /// Stable lowercase key, used for persistence and the CLI.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Domestic => "domestic",
            Self::International => "international",
            Self::Life => "life",
            Self::Tech => "tech",
        }
    }

    /// Human-readable label shown to listeners.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Domestic => "国内",
            Self::International => "国际",
            Self::Life => "生活",
            Self::Tech => "科技",
        }
    }

    /// Upstream channel identifiers used when no override is configured.
    pub const fn default_channels(self) -> &'static [&'static str] {
        match self {
            Self::Domestic => &["2509", "2512", "2517"],
            Self::International => &["2518"],
            Self::Life => &["2513"],
            Self::Tech => &["2515"],
        }
    }

    /// Whether a refilled list is shuffled before it is cached.
    ///
    /// Only the domestic mix is shuffled; every other category keeps
    /// upstream order.
    pub const fn shuffles_on_refill(self) -> bool {
        matches!(self, Self::Domestic)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Returned when a string does not name a known category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown category '{0}' (expected one of: domestic, international, life, tech)")]
pub struct ParseCategoryError(pub String);

impl FromStr for CategoryId {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(needle) || c.label() == needle)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}
