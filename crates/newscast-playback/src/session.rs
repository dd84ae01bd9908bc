//! One speech synthesis invocation and its lifecycle.
//!
//! ```text
//!   Created → Running → { Completed | Canceled | Failed }
//! ```
//!
//! A driver task owns the provider's [`Utterance`] and folds its event
//! stream into exactly one [`SessionOutcome`]. Terminal states are final.
//! The driver also enforces two bounds:
//!
//! - a watchdog: a provider that never terminates fails the session with
//!   [`SessionFailure::Timeout`];
//! - a cancel grace period: after asking the provider to stop, the driver
//!   waits at most that long for its acknowledgement.
//!
//! Each session owns its own event channel, so nothing a finished session
//! emits can reach a later one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use newscast_core::{PlaybackSettings, SpeechEvent, SpeechSynthesisPort, Utterance};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::PlaybackError;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

// ── Outcome types ──────────────────────────────────────────────────

/// Per-session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Running,
    Completed,
    Canceled,
    Failed,
}

impl SessionState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Failed)
    }
}

/// Why a session failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFailure {
    /// The provider reported a failure.
    Provider(String),
    /// No terminal event arrived before the watchdog fired.
    Timeout(Duration),
    /// The provider dropped its event stream without a terminal event.
    StreamClosed,
}

/// The single terminal outcome of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Canceled,
    Failed(SessionFailure),
}

impl SessionOutcome {
    const fn state(&self) -> SessionState {
        match self {
            Self::Completed => SessionState::Completed,
            Self::Canceled => SessionState::Canceled,
            Self::Failed(_) => SessionState::Failed,
        }
    }
}

impl From<SessionFailure> for PlaybackError {
    fn from(failure: SessionFailure) -> Self {
        match failure {
            SessionFailure::Provider(reason) => Self::SynthesisFailed(reason),
            SessionFailure::Timeout(after) => Self::SynthesisTimeout(after),
            SessionFailure::StreamClosed => {
                Self::SynthesisFailed("provider closed the event stream".to_string())
            }
        }
    }
}

// ── Configuration ──────────────────────────────────────────────────

/// Bounds applied to every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Watchdog for a provider that never terminates.
    pub timeout: Duration,
    /// Bounded wait for the provider to acknowledge a cancel.
    pub cancel_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&PlaybackSettings::default())
    }
}

impl From<&PlaybackSettings> for SessionConfig {
    fn from(settings: &PlaybackSettings) -> Self {
        Self {
            timeout: settings.speech_timeout(),
            cancel_grace: settings.cancel_grace(),
        }
    }
}

// ── Session ────────────────────────────────────────────────────────

/// A live (or finished) speech session.
///
/// Dropping the session cancels it.
#[derive(Debug)]
pub struct SpeechSession {
    id: u64,
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
    outcome: watch::Receiver<Option<SessionOutcome>>,
}

/// A detached handle that resolves to a session's outcome.
#[derive(Debug, Clone)]
pub struct SessionWaiter {
    outcome: watch::Receiver<Option<SessionOutcome>>,
}

impl SessionWaiter {
    /// Wait for the terminal outcome.
    pub async fn wait(mut self) -> SessionOutcome {
        loop {
            let current = self.outcome.borrow_and_update().clone();
            if let Some(outcome) = current {
                return outcome;
            }
            if self.outcome.changed().await.is_err() {
                // Driver went away without publishing; treat as a lost stream.
                let last = self.outcome.borrow().clone();
                return last.unwrap_or(SessionOutcome::Failed(SessionFailure::StreamClosed));
            }
        }
    }
}

impl SpeechSession {
    /// Ask `provider` to speak `text` and start driving its lifecycle.
    ///
    /// Fails immediately if the provider refuses the utterance.
    pub async fn start(
        provider: &dyn SpeechSynthesisPort,
        text: &str,
        config: SessionConfig,
    ) -> Result<Self, PlaybackError> {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);

        let utterance = provider
            .synthesize(text)
            .await
            .map_err(|e| PlaybackError::SynthesisFailed(e.to_string()))?;

        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(SessionState::Created);
        let (outcome_tx, outcome_rx) = watch::channel(None);

        debug!(session = id, text_len = text.chars().count(), "Speech session created");
        tokio::spawn(drive(
            id,
            utterance,
            cancel.clone(),
            config,
            state_tx,
            outcome_tx,
        ));

        Ok(Self {
            id,
            cancel,
            state: state_rx,
            outcome: outcome_rx,
        })
    }

    /// Process-unique session id.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// The outcome, once terminal.
    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome.borrow().clone()
    }

    /// Request cancellation. Safe to call repeatedly and after the session
    /// finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that resolves to the outcome without borrowing the session.
    pub fn waiter(&self) -> SessionWaiter {
        SessionWaiter {
            outcome: self.outcome.clone(),
        }
    }

    /// Wait for the terminal outcome.
    pub async fn wait(&self) -> SessionOutcome {
        self.waiter().wait().await
    }

    /// Cancel and wait until the provider released the utterance (or the
    /// grace period elapsed). Returns the outcome, which is `Completed`
    /// if the session finished before the cancel landed.
    pub async fn cancel_and_wait(&self) -> SessionOutcome {
        self.cancel();
        self.wait().await
    }
}

impl Drop for SpeechSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Driver ─────────────────────────────────────────────────────────

async fn drive(
    id: u64,
    mut utterance: Utterance,
    cancel: CancellationToken,
    config: SessionConfig,
    state_tx: watch::Sender<SessionState>,
    outcome_tx: watch::Sender<Option<SessionOutcome>>,
) {
    state_tx.send_replace(SessionState::Running);

    let watchdog = tokio::time::sleep(config.timeout);
    tokio::pin!(watchdog);

    let outcome = loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                utterance.cancel();
                await_release(id, &mut utterance, config.cancel_grace).await;
                break SessionOutcome::Canceled;
            }

            event = utterance.next_event() => match event {
                Some(SpeechEvent::Started) => debug!(session = id, "Provider started speaking"),
                Some(SpeechEvent::Completed) => break SessionOutcome::Completed,
                Some(SpeechEvent::Canceled(reason)) => {
                    debug!(session = id, %reason, "Provider canceled utterance");
                    break SessionOutcome::Canceled;
                }
                Some(SpeechEvent::Failed(reason)) => {
                    break SessionOutcome::Failed(SessionFailure::Provider(reason));
                }
                None => break SessionOutcome::Failed(SessionFailure::StreamClosed),
            },

            () = &mut watchdog => {
                warn!(session = id, timeout = ?config.timeout, "Speech session timed out");
                utterance.cancel();
                await_release(id, &mut utterance, config.cancel_grace).await;
                break SessionOutcome::Failed(SessionFailure::Timeout(config.timeout));
            }
        }
    };

    debug!(session = id, ?outcome, "Speech session finished");
    state_tx.send_replace(outcome.state());
    outcome_tx.send_replace(Some(outcome));
}

/// Wait for the provider to acknowledge a cancel with a terminal event or
/// by closing its stream, bounded by `grace`.
async fn await_release(id: u64, utterance: &mut Utterance, grace: Duration) {
    let released = tokio::time::timeout(grace, async {
        while let Some(event) = utterance.next_event().await {
            if event.is_terminal() {
                break;
            }
        }
    })
    .await;

    if released.is_err() {
        warn!(session = id, ?grace, "Provider did not acknowledge cancel within grace period");
    }
}
