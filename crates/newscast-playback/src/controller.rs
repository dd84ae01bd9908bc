//! The playback controller: one serialized state machine per app session.
//!
//! ```text
//!        play_category            session started
//!  Idle ───────────────▶ Transitioning ───────────────▶ Synthesizing
//!   ▲                        │   ▲                           │
//!   │  empty / superseded    │   │ Completed + auto-advance  │
//!   └────────────────────────┘   └───────────────────────────┤
//!   ▲                                                        │
//!   └──── stop / Canceled / Failed (via Error) ◀─────────────┘
//! ```
//!
//! All mutation of the state, the live session handle and the transition
//! guard happens while holding one async mutex. Slow work that does not
//! touch that state (refill, item selection) runs outside the lock and is
//! re-validated against an epoch counter before it is committed; any
//! `play_category` or `stop` in between bumps the epoch and supersedes it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::future::BoxFuture;
use newscast_core::{
    CategoryId, KeyValueStore, NewsItem, NewsSourcePort, PlaybackEvent, PlaybackSettings,
    PlaybackState, SpeechSynthesisPort,
};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{CategoryReport, PlaybackError};
use crate::played::PlayedItemTracker;
use crate::position::PlaybackPositionTracker;
use crate::session::{SessionConfig, SessionOutcome, SessionWaiter, SpeechSession};
use crate::store::CategoryNewsStore;

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What a `play_category` call ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayStart {
    /// A session was opened for this item.
    Started { item: NewsItem, index: usize },
    /// The category had nothing to play, even after a refill.
    Empty(CategoryId),
    /// A transition or session already owns the controller. No-op.
    AlreadyActive,
    /// A later `stop` or `play_category` took over before this one could
    /// open a session.
    Superseded,
}

impl PlayStart {
    /// Treat a call that lost to another in-flight transition as an error.
    pub fn reject_conflict(self) -> Result<Self, PlaybackError> {
        match self {
            Self::AlreadyActive | Self::Superseded => Err(PlaybackError::StateConflict),
            other => Ok(other),
        }
    }
}

/// The item a live session is speaking.
#[derive(Debug, Clone)]
struct NowPlaying {
    category: CategoryId,
    index: usize,
    item: NewsItem,
}

struct ActiveSession {
    session: SpeechSession,
    now_playing: NowPlaying,
}

/// State guarded by the serialization point.
struct Inner {
    state: PlaybackState,
    epoch: u64,
    active: Option<ActiveSession>,
}

/// Read-mostly mirrors for synchronous getters.
#[derive(Default)]
struct Snapshot {
    category: Option<CategoryId>,
    now_playing: Option<NowPlaying>,
    last_error: Option<PlaybackError>,
}

struct Shared {
    store: Arc<CategoryNewsStore>,
    played: Arc<PlayedItemTracker>,
    positions: Arc<PlaybackPositionTracker>,
    speech: Arc<dyn SpeechSynthesisPort>,
    session_config: SessionConfig,
    auto_advance: AtomicBool,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<PlaybackState>,
    snapshot: RwLock<Snapshot>,
    events: broadcast::Sender<PlaybackEvent>,
}

/// Continuous news playback over a category cache and a speech provider.
///
/// Cheap to clone; every clone drives the same state machine.
#[derive(Clone)]
pub struct PlaybackController {
    shared: Arc<Shared>,
}

impl PlaybackController {
    pub fn new(
        store: Arc<CategoryNewsStore>,
        played: Arc<PlayedItemTracker>,
        positions: Arc<PlaybackPositionTracker>,
        speech: Arc<dyn SpeechSynthesisPort>,
        settings: &PlaybackSettings,
    ) -> Self {
        let (state_tx, _) = watch::channel(PlaybackState::Idle);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                store,
                played,
                positions,
                speech,
                session_config: SessionConfig::from(settings),
                auto_advance: AtomicBool::new(settings.auto_advance),
                inner: Mutex::new(Inner {
                    state: PlaybackState::Idle,
                    epoch: 0,
                    active: None,
                }),
                state_tx,
                snapshot: RwLock::new(Snapshot::default()),
                events,
            }),
        }
    }

    /// Wire a controller from its ports, loading persisted history from
    /// `kv`.
    pub async fn from_ports(
        source: Arc<dyn NewsSourcePort>,
        speech: Arc<dyn SpeechSynthesisPort>,
        kv: Arc<dyn KeyValueStore>,
        settings: &PlaybackSettings,
    ) -> Self {
        let played = Arc::new(PlayedItemTracker::load(Arc::clone(&kv)).await);
        let positions = Arc::new(PlaybackPositionTracker::load(kv).await);
        let store = Arc::new(CategoryNewsStore::new(source, Arc::clone(&played), settings));
        Self::new(store, played, positions, speech, settings)
    }

    // ── Collaborators ──────────────────────────────────────────────

    pub fn store(&self) -> &CategoryNewsStore {
        &self.shared.store
    }

    pub fn played(&self) -> &PlayedItemTracker {
        &self.shared.played
    }

    pub fn positions(&self) -> &PlaybackPositionTracker {
        &self.shared.positions
    }

    // ── Queries ────────────────────────────────────────────────────

    pub fn state(&self) -> PlaybackState {
        *self.shared.state_tx.borrow()
    }

    /// Watch state changes. The receiver starts at the current state.
    pub fn watch_state(&self) -> watch::Receiver<PlaybackState> {
        self.shared.state_tx.subscribe()
    }

    /// Whether continuous playback currently owns the speech provider.
    pub fn is_playing(&self) -> bool {
        self.state().is_busy()
    }

    /// The item being spoken, if any.
    pub fn current_item(&self) -> Option<NewsItem> {
        self.read_snapshot(|s| s.now_playing.as_ref().map(|p| p.item.clone()))
    }

    /// The category most recently requested.
    pub fn active_category(&self) -> Option<CategoryId> {
        self.read_snapshot(|s| s.category)
    }

    /// The last surfaced failure. Cleared when a session starts.
    pub fn last_error(&self) -> Option<PlaybackError> {
        self.read_snapshot(|s| s.last_error.clone())
    }

    pub fn auto_advance(&self) -> bool {
        self.shared.auto_advance.load(Ordering::SeqCst)
    }

    pub fn set_auto_advance(&self, enabled: bool) {
        self.shared.auto_advance.store(enabled, Ordering::SeqCst);
        debug!(enabled, "Auto-advance toggled");
    }

    // ── Events ─────────────────────────────────────────────────────

    /// Subscribe to every playback event.
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.shared.events.subscribe()
    }

    /// Invoke `callback` for each item spoken to completion until the
    /// returned [`Subscription`] is dropped or unsubscribed.
    pub fn on_item_completed<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&NewsItem) + Send + 'static,
    {
        let mut rx = self.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(PlaybackEvent::ItemCompleted { item, .. }) => callback(&item),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Item-completed listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription { task }
    }

    // ── Operations ─────────────────────────────────────────────────

    /// Fetch every category concurrently. Failures stay per category.
    pub async fn preload(&self) -> CategoryReport {
        let report = self.shared.store.preload(&CategoryId::ALL).await;
        for (category, result) in &report {
            if let Ok(count) = result {
                if *count > 0 {
                    self.emit(PlaybackEvent::CategoryRefilled {
                        category: *category,
                        count: *count,
                    });
                }
            }
        }
        report
    }

    /// Start continuous playback of `category`.
    ///
    /// A no-op returning [`PlayStart::AlreadyActive`] while another
    /// transition or session owns the controller.
    pub async fn play_category(&self, category: CategoryId) -> Result<PlayStart, PlaybackError> {
        let epoch = {
            let mut inner = self.shared.inner.lock().await;
            if inner.state.is_busy() {
                debug!(%category, state = ?inner.state, "Play request ignored, controller busy");
                return Ok(PlayStart::AlreadyActive);
            }

            inner.epoch += 1;
            self.set_state(&mut inner, PlaybackState::Transitioning);
            self.write_snapshot(|s| s.category = Some(category));
            if let Some(active) = inner.active.take() {
                self.retire(active).await;
            }
            inner.epoch
        };

        info!(%category, "Starting playback");
        self.run_transition(category, epoch).await
    }

    /// Stop playback. Idempotent.
    ///
    /// Returns once the live session (if any) has been released by the
    /// provider or the cancel grace period elapsed. The interrupted item
    /// is not marked played.
    pub async fn stop(&self) {
        let mut inner = self.shared.inner.lock().await;
        inner.epoch += 1;

        if let Some(active) = inner.active.take() {
            info!(item = %active.now_playing.item.id, "Stopping playback");
            self.retire(active).await;
        }
        if inner.state != PlaybackState::Idle {
            self.set_state(&mut inner, PlaybackState::Idle);
        }
    }

    /// Stop, restore `category`'s position and start playing it.
    pub async fn switch_category(
        &self,
        category: CategoryId,
    ) -> Result<PlayStart, PlaybackError> {
        self.stop().await;

        let list = self.shared.store.current_list(category);
        if let Some(index) = self.shared.positions.resolve(category, &list) {
            let anchor = list.get(index).map(|item| item.id.as_str());
            self.shared.positions.set_at(category, index, anchor).await;
        }
        self.write_snapshot(|s| s.category = Some(category));
        info!(%category, "Switched category");

        self.play_category(category).await
    }

    /// Mark the current item played without waiting for it to finish.
    pub async fn mark_current_played(&self) -> Option<NewsItem> {
        let item = self.current_item()?;
        if self.shared.played.mark_played(&item.id).await {
            info!(item = %item.id, "Current item marked played");
        }
        Some(item)
    }

    /// Stop playback and flush persisted history.
    ///
    /// Both trackers are flushed even if the first fails; the first
    /// failure is returned.
    pub async fn shutdown(&self) -> Result<(), PlaybackError> {
        self.stop().await;

        let played = self.shared.played.flush().await;
        let positions = self.shared.positions.flush().await;
        for result in [&played, &positions] {
            if let Err(e) = result {
                warn!(error = %e, "Flush on shutdown failed");
            }
        }
        info!("Playback controller shut down");
        played.and(positions)
    }

    // ── Transitions ────────────────────────────────────────────────

    /// Select the next item for `category` and open a session for it,
    /// unless `epoch` has been superseded in the meantime.
    async fn run_transition(
        &self,
        category: CategoryId,
        epoch: u64,
    ) -> Result<PlayStart, PlaybackError> {
        let selection = self.select_next(category).await;

        let mut inner = self.shared.inner.lock().await;
        if inner.epoch != epoch {
            debug!(%category, "Transition superseded");
            return Ok(PlayStart::Superseded);
        }

        let (index, item) = match selection {
            Ok(Some(next)) => next,
            Ok(None) => {
                info!(%category, "Category has nothing to play");
                self.emit(PlaybackEvent::CategoryEmpty { category });
                self.set_state(&mut inner, PlaybackState::Idle);
                return Ok(PlayStart::Empty(category));
            }
            Err(e) => {
                self.surface_failure(&mut inner, &e);
                return Err(e);
            }
        };

        let session = match SpeechSession::start(
            self.shared.speech.as_ref(),
            &item.speech_text(),
            self.shared.session_config,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                self.surface_failure(&mut inner, &e);
                return Err(e);
            }
        };

        let now_playing = NowPlaying {
            category,
            index,
            item: item.clone(),
        };
        let waiter = session.waiter();
        let session_id = session.id();
        self.write_snapshot(|s| {
            s.now_playing = Some(now_playing.clone());
            s.last_error = None;
        });
        inner.active = Some(ActiveSession {
            session,
            now_playing,
        });
        self.set_state(&mut inner, PlaybackState::Synthesizing);
        self.emit(PlaybackEvent::ItemStarted {
            item: item.clone(),
            index,
        });
        info!(%category, index, item = %item.id, title = %item.title, "Speaking item");
        drop(inner);

        tokio::spawn(self.watch_session(session_id, waiter));

        Ok(PlayStart::Started { item, index })
    }

    /// Choose what to speak next in `category`, refilling once if the
    /// cached list is empty or fully played.
    async fn select_next(
        &self,
        category: CategoryId,
    ) -> Result<Option<(usize, NewsItem)>, PlaybackError> {
        let store = &self.shared.store;
        let played = &self.shared.played;

        if store.is_exhausted(category) {
            info!(%category, "Category exhausted, refilling");
            let count = store.refill(category).await?;
            self.shared.positions.set(category, 0).await;
            self.emit(PlaybackEvent::CategoryRefilled { category, count });
        }

        let list = store.current_list(category);
        if list.is_empty() {
            return Ok(None);
        }

        // Resume at the stored position, skipping items played since the
        // list was cached.
        let start = self.shared.positions.resolve(category, &list).unwrap_or(0);
        let next = (0..list.len())
            .map(|offset| (start + offset) % list.len())
            .find(|&i| !played.has(&list[i].id));

        Ok(next.map(|i| (i, list[i].clone())))
    }

    /// Boxed so the session watcher and the transition it may trigger do
    /// not form a recursive future type.
    fn watch_session(&self, session_id: u64, waiter: SessionWaiter) -> BoxFuture<'static, ()> {
        let this = self.clone();
        Box::pin(async move {
            let outcome = waiter.wait().await;
            this.on_session_finished(session_id, outcome).await;
        })
    }

    async fn on_session_finished(&self, session_id: u64, outcome: SessionOutcome) {
        let mut inner = self.shared.inner.lock().await;
        let Some(active) = inner
            .active
            .take_if(|active| active.session.id() == session_id)
        else {
            debug!(session = session_id, ?outcome, "Ignoring outcome of retired session");
            return;
        };
        self.write_snapshot(|s| s.now_playing = None);

        match outcome {
            SessionOutcome::Completed => {
                inner.epoch += 1;
                let epoch = inner.epoch;
                self.set_state(&mut inner, PlaybackState::Transitioning);
                drop(inner);
                self.advance(active.now_playing, epoch).await;
            }
            SessionOutcome::Canceled => {
                info!(item = %active.now_playing.item.id, "Provider canceled speech");
                self.set_state(&mut inner, PlaybackState::Idle);
            }
            SessionOutcome::Failed(failure) => {
                let err = PlaybackError::from(failure);
                self.surface_failure(&mut inner, &err);
            }
        }
    }

    /// Record a completed item and, with auto-advance on, continue with
    /// the next one.
    async fn advance(&self, completed: NowPlaying, epoch: u64) {
        let category = completed.category;
        self.record_completion(&completed).await;

        if !self.auto_advance() {
            let mut inner = self.shared.inner.lock().await;
            if inner.epoch == epoch {
                self.set_state(&mut inner, PlaybackState::Idle);
            }
            return;
        }

        match self.run_transition(category, epoch).await {
            Ok(PlayStart::Started { .. } | PlayStart::Superseded) => {}
            Ok(outcome) => debug!(%category, ?outcome, "Auto-advance ended"),
            Err(e) => warn!(%category, error = %e, "Auto-advance halted"),
        }
    }

    /// Mark `completed` played and move its category's position past it.
    async fn record_completion(&self, completed: &NowPlaying) {
        let NowPlaying {
            category,
            index,
            item,
        } = completed;

        self.shared.played.mark_played(&item.id).await;
        let list = self.shared.store.current_list(*category);
        let next = (index + 1).min(list.len().saturating_sub(1));
        let anchor = list.get(index + 1).map(|item| item.id.as_str());
        self.shared.positions.set_at(*category, next, anchor).await;

        debug!(%category, index, next, item = %item.id, "Item completed");
        self.emit(PlaybackEvent::ItemCompleted {
            item: item.clone(),
            index: *index,
        });
    }

    /// Cancel a session that is being replaced and wait for the provider
    /// to release it. A session that finished before the cancel landed is
    /// still recorded as completed, without auto-advancing.
    async fn retire(&self, active: ActiveSession) {
        self.write_snapshot(|s| s.now_playing = None);
        if active.session.cancel_and_wait().await == SessionOutcome::Completed {
            self.record_completion(&active.now_playing).await;
        }
    }

    /// Report a failure once and settle on `Idle` so an explicit play can
    /// retry.
    fn surface_failure(&self, inner: &mut Inner, err: &PlaybackError) {
        error!(error = %err, "Playback failed");
        self.write_snapshot(|s| s.last_error = Some(err.clone()));
        self.emit(PlaybackEvent::Error {
            message: err.to_string(),
        });
        self.set_state(inner, PlaybackState::Error);
        self.set_state(inner, PlaybackState::Idle);
    }

    // ── Helpers ────────────────────────────────────────────────────

    /// Requires the `inner` guard, so every state change is serialized.
    fn set_state(&self, inner: &mut Inner, state: PlaybackState) {
        if inner.state == state {
            return;
        }
        debug!(from = ?inner.state, to = ?state, "Playback state changed");
        inner.state = state;
        self.shared.state_tx.send_replace(state);
        self.emit(PlaybackEvent::StateChanged { state });
    }

    fn emit(&self, event: PlaybackEvent) {
        let name = event.name();
        if self.shared.events.send(event).is_err() {
            debug!(event = name, "No playback event subscribers");
        }
    }

    fn read_snapshot<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
        f(&self
            .shared
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner))
    }

    fn write_snapshot(&self, f: impl FnOnce(&mut Snapshot)) {
        f(&mut self
            .shared
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner));
    }
}

/// Handle for an [`PlaybackController::on_item_completed`] listener.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
