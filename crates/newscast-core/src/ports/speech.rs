//! Speech synthesis port.
//!
//! A provider turns text into an [`Utterance`]: a stream of lifecycle
//! events plus a cancel handle. The provider performs the audio output
//! itself; the orchestrator only observes the lifecycle.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Lifecycle events emitted by one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Audio output began.
    Started,
    /// The whole text was spoken.
    Completed,
    /// The provider stopped the utterance (after a cancel, or on its own).
    Canceled(String),
    /// The provider failed mid-utterance.
    Failed(String),
}

impl SpeechEvent {
    /// Whether no further events follow this one.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Started)
    }
}

/// Errors returned when a provider refuses to start an utterance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechPortError {
    /// The engine or audio device is not available.
    #[error("Speech provider unavailable: {0}")]
    Unavailable(String),

    /// The engine rejected the input text.
    #[error("Speech provider rejected the text: {0}")]
    Rejected(String),
}

/// Provider-side cancel hook for one utterance.
///
/// Must be safe to call any number of times, including after the
/// utterance has finished.
pub trait UtteranceControl: Send + Sync {
    fn cancel(&self);
}

/// One in-flight synthesis: its event stream and its cancel hook.
pub struct Utterance {
    events: mpsc::UnboundedReceiver<SpeechEvent>,
    control: Arc<dyn UtteranceControl>,
}

impl Utterance {
    /// Wrap an existing event receiver.
    pub fn new(
        events: mpsc::UnboundedReceiver<SpeechEvent>,
        control: Arc<dyn UtteranceControl>,
    ) -> Self {
        Self { events, control }
    }

    /// Create an utterance together with the sender a provider feeds.
    pub fn channel(control: Arc<dyn UtteranceControl>) -> (mpsc::UnboundedSender<SpeechEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx, control))
    }

    /// Wait for the next lifecycle event.
    ///
    /// Returns `None` once the provider drops its sender.
    pub async fn next_event(&mut self) -> Option<SpeechEvent> {
        self.events.recv().await
    }

    /// Ask the provider to stop speaking.
    pub fn cancel(&self) {
        self.control.cancel();
    }
}

impl fmt::Debug for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Utterance").finish_non_exhaustive()
    }
}

/// Text-to-speech provider.
#[async_trait]
pub trait SpeechSynthesisPort: Send + Sync {
    /// Begin speaking `text`.
    ///
    /// Returns as soon as the utterance is accepted; completion is
    /// reported through the utterance's event stream.
    async fn synthesize(&self, text: &str) -> Result<Utterance, SpeechPortError>;
}
