//! Terminal speech provider.
//!
//! Prints each utterance and holds it "on air" for as long as reading it
//! aloud would take, so the orchestrator sees realistic pacing without an
//! audio device.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use newscast_core::{SpeechEvent, SpeechPortError, SpeechSynthesisPort, Utterance, UtteranceControl};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default reading pace in characters per second.
pub const DEFAULT_CHARS_PER_SECOND: u32 = 8;

/// Shortest time any utterance stays on air.
const MIN_DURATION: Duration = Duration::from_millis(300);

/// Simulated speech that prints text and paces it by length.
pub struct ConsoleSpeech {
    chars_per_second: u32,
}

impl ConsoleSpeech {
    pub fn new(chars_per_second: u32) -> Result<Self, SpeechPortError> {
        if chars_per_second == 0 {
            return Err(SpeechPortError::Unavailable(
                "speech rate must be at least one character per second".to_string(),
            ));
        }
        Ok(Self { chars_per_second })
    }

    /// Time needed to read `text` at the configured pace.
    pub fn duration_for(&self, text: &str) -> Duration {
        let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        let millis = u64::from(chars) * 1000 / u64::from(self.chars_per_second);
        Duration::from_millis(millis).max(MIN_DURATION)
    }
}

impl Default for ConsoleSpeech {
    fn default() -> Self {
        Self {
            chars_per_second: DEFAULT_CHARS_PER_SECOND,
        }
    }
}

struct ConsoleControl {
    token: CancellationToken,
}

impl UtteranceControl for ConsoleControl {
    fn cancel(&self) {
        self.token.cancel();
    }
}

#[async_trait]
impl SpeechSynthesisPort for ConsoleSpeech {
    async fn synthesize(&self, text: &str) -> Result<Utterance, SpeechPortError> {
        if text.trim().is_empty() {
            return Err(SpeechPortError::Rejected("empty text".to_string()));
        }

        let token = CancellationToken::new();
        let (tx, utterance) = Utterance::channel(Arc::new(ConsoleControl {
            token: token.clone(),
        }));
        let duration = self.duration_for(text);
        let text = text.to_string();

        tokio::spawn(async move {
            let _ = tx.send(SpeechEvent::Started);
            println!("    {text}");
            debug!(?duration, "Console utterance on air");

            tokio::select! {
                () = token.cancelled() => {
                    let _ = tx.send(SpeechEvent::Canceled("stopped".to_string()));
                }
                () = tokio::time::sleep(duration) => {
                    let _ = tx.send(SpeechEvent::Completed);
                }
            }
        });

        Ok(utterance)
    }
}
