//! Sina roll feed news source.
//!
//! One channel is one `lid` of the roll API:
//!
//! ```text
//! GET https://feed.mix.sina.com.cn/api/roll/get?pageid=153&lid=<channel>&num=<count>&page=1
//! ```
//!
//! Server errors and network failures are retried with exponential
//! backoff; client errors fail immediately.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use newscast_core::{ChannelItem, FetchError, NewsSourcePort};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Configuration for [`SinaRollSource`].
#[derive(Debug, Clone)]
pub struct SinaConfig {
    /// Roll API endpoint.
    pub base_url: String,
    /// Value of the `pageid` query parameter.
    pub page_id: u32,
    /// User agent for every request.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry attempts for transient failures.
    pub max_retries: u8,
    /// Base delay for exponential backoff.
    pub retry_base_delay: Duration,
}

impl Default for SinaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://feed.mix.sina.com.cn/api/roll/get".to_string(),
            page_id: 153,
            user_agent: concat!("newscast/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(15),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

/// [`NewsSourcePort`] backed by the Sina roll feed.
pub struct SinaRollSource {
    client: reqwest::Client,
    config: SinaConfig,
}

impl SinaRollSource {
    pub fn new(config: SinaConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// GET the channel, retrying server errors and network failures.
    async fn fetch_with_retry(
        &self,
        channel_id: &str,
        count: usize,
    ) -> Result<String, FetchError> {
        let mut last_error = FetchError::Network("no attempt made".to_string());

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = self.config.retry_base_delay * 2u32.pow(u32::from(attempt) - 1);
                debug!(channel = channel_id, attempt, ?delay, "Retrying channel fetch");
                tokio::time::sleep(delay).await;
            }

            let request = self.client.get(&self.config.base_url).query(&[
                ("pageid", self.config.page_id.to_string()),
                ("lid", channel_id.to_string()),
                ("num", count.to_string()),
                ("page", "1".to_string()),
            ]);

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    return response
                        .text()
                        .await
                        .map_err(|e| FetchError::Network(e.to_string()));
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    last_error = FetchError::Http { status };
                    if !response.status().is_server_error() {
                        break;
                    }
                }
                Err(e) => {
                    last_error = FetchError::Network(e.to_string());
                }
            }
            warn!(channel = channel_id, attempt, error = %last_error, "Channel fetch attempt failed");
        }

        Err(last_error)
    }
}

#[async_trait]
impl NewsSourcePort for SinaRollSource {
    async fn fetch_channel(
        &self,
        channel_id: &str,
        count: usize,
    ) -> Result<Vec<ChannelItem>, FetchError> {
        let body = self.fetch_with_retry(channel_id, count).await?;
        let items = decode_roll_response(&body)?;
        debug!(channel = channel_id, count = items.len(), "Decoded roll feed");
        Ok(items)
    }
}

// ── Wire format ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RollEnvelope {
    result: RollResult,
}

#[derive(Debug, Deserialize)]
struct RollResult {
    status: RollStatus,
    #[serde(default)]
    data: Vec<RollEntry>,
}

#[derive(Debug, Deserialize)]
struct RollStatus {
    code: i64,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
struct RollEntry {
    #[serde(default)]
    docid: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    intro: String,
    #[serde(default)]
    ctime: String,
    #[serde(default)]
    url: String,
}

/// Decode a roll API body into channel items.
///
/// Entries without a title are skipped.
pub fn decode_roll_response(body: &str) -> Result<Vec<ChannelItem>, FetchError> {
    let envelope: RollEnvelope =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    let RollResult { status, data } = envelope.result;
    if status.code != 0 {
        return Err(FetchError::Upstream {
            code: status.code,
            message: status.msg,
        });
    }

    Ok(data
        .into_iter()
        .filter(|entry| !entry.title.trim().is_empty())
        .map(into_channel_item)
        .collect())
}

fn into_channel_item(entry: RollEntry) -> ChannelItem {
    let id = if !entry.docid.is_empty() {
        entry.docid
    } else if !entry.url.is_empty() {
        entry.url
    } else {
        let mut hasher = Sha256::new();
        hasher.update(entry.title.as_bytes());
        hasher.update(entry.ctime.as_bytes());
        format!("{:x}", hasher.finalize())
    };

    ChannelItem {
        id,
        title: entry.title.trim().to_string(),
        content: entry.intro.trim().to_string(),
        published_at: parse_ctime(&entry.ctime),
    }
}

/// `ctime` is unix seconds as a string; anything else maps to the epoch.
fn parse_ctime(raw: &str) -> DateTime<Utc> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
