//! Integration tests for the `PlaybackController` state machine.
//!
//! The controller is driven with a scripted speech provider and an
//! in-memory news source. No network or audio device is involved; the
//! test decides when each utterance completes, fails or stays silent.
//!
//! # What is tested
//!
//! - At most one live speech session under concurrent play calls
//! - Idempotent `stop`
//! - Exactly one refill when an exhausted category is played again
//! - `switch_category` stops before it starts, with no overlap
//! - Resume at the interrupted item (the domestic A/B/C scenario)
//! - Failure and timeout halting auto-advance
//! - Clamped resume position after a list shrinks

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures_util::future::join_all;
use newscast_core::{
    CategoryId, ChannelItem, FetchError, NewsItem, NewsSourcePort, PlaybackEvent,
    PlaybackSettings, PlaybackState, SpeechEvent, SpeechPortError, SpeechSynthesisPort,
    Utterance, UtteranceControl,
};
use newscast_kv::InMemoryKvStore;
use newscast_playback::{PlayStart, PlaybackController, PlaybackError, PlayedItemTracker};
use tokio::sync::{broadcast, mpsc};

// ── Scripted speech provider ───────────────────────────────────────

#[derive(Default)]
struct Meter {
    live: AtomicUsize,
    max_live: AtomicUsize,
}

/// One utterance; finishing it is a one-shot.
struct FakeUtterance {
    text: String,
    tx: Mutex<Option<mpsc::UnboundedSender<SpeechEvent>>>,
    meter: Arc<Meter>,
    ack_cancel: bool,
    cancels: AtomicUsize,
}

impl FakeUtterance {
    fn finish(&self, event: SpeechEvent) -> bool {
        let Some(tx) = self.tx.lock().unwrap().take() else {
            return false;
        };
        self.meter.live.fetch_sub(1, Ordering::SeqCst);
        let _ = tx.send(event);
        true
    }
}

impl UtteranceControl for FakeUtterance {
    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        if self.ack_cancel {
            self.finish(SpeechEvent::Canceled("canceled by caller".into()));
        }
    }
}

#[derive(Default)]
struct FakeSpeech {
    meter: Arc<Meter>,
    utterances: Mutex<Vec<Arc<FakeUtterance>>>,
    refuse: AtomicBool,
}

impl FakeSpeech {
    fn started(&self) -> usize {
        self.utterances.lock().unwrap().len()
    }

    fn utterance(&self, n: usize) -> Arc<FakeUtterance> {
        self.utterances.lock().unwrap()[n].clone()
    }

    fn current(&self) -> Arc<FakeUtterance> {
        self.utterances.lock().unwrap().last().unwrap().clone()
    }

    fn complete_current(&self) {
        assert!(self.current().finish(SpeechEvent::Completed));
    }

    fn fail_current(&self, reason: &str) {
        assert!(self.current().finish(SpeechEvent::Failed(reason.into())));
    }

    fn max_live(&self) -> usize {
        self.meter.max_live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesisPort for FakeSpeech {
    async fn synthesize(&self, text: &str) -> Result<Utterance, SpeechPortError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(SpeechPortError::Unavailable("no audio device".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(SpeechEvent::Started).unwrap();
        let utterance = Arc::new(FakeUtterance {
            text: text.to_string(),
            tx: Mutex::new(Some(tx)),
            meter: Arc::clone(&self.meter),
            ack_cancel: true,
            cancels: AtomicUsize::new(0),
        });

        let live = self.meter.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.meter.max_live.fetch_max(live, Ordering::SeqCst);
        self.utterances.lock().unwrap().push(Arc::clone(&utterance));

        Ok(Utterance::new(rx, utterance))
    }
}

// ── In-memory news source ──────────────────────────────────────────

#[derive(Default)]
struct FakeSource {
    feeds: Mutex<HashMap<String, Vec<ChannelItem>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeSource {
    fn set_feed(&self, channel: &str, ids: &[&str]) {
        let items = ids.iter().map(|id| channel_item(id)).collect();
        self.feeds.lock().unwrap().insert(channel.to_string(), items);
    }

    fn calls(&self, channel: &str) -> usize {
        self.calls.lock().unwrap().get(channel).copied().unwrap_or(0)
    }
}

#[async_trait]
impl NewsSourcePort for FakeSource {
    async fn fetch_channel(
        &self,
        channel_id: &str,
        count: usize,
    ) -> Result<Vec<ChannelItem>, FetchError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(channel_id.to_string())
            .or_default() += 1;

        let feeds = self.feeds.lock().unwrap();
        let items = feeds
            .get(channel_id)
            .ok_or(FetchError::Http { status: 404 })?;
        Ok(items.iter().take(count).cloned().collect())
    }
}

// ── Harness ────────────────────────────────────────────────────────

fn channel_item(id: &str) -> ChannelItem {
    ChannelItem {
        id: id.to_string(),
        title: format!("Title {id}"),
        content: format!("Content {id}"),
        published_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    }
}

fn items(category: CategoryId, ids: &[&str]) -> Vec<NewsItem> {
    ids.iter()
        .map(|id| NewsItem::from_channel(channel_item(id), category))
        .collect()
}

struct Harness {
    controller: PlaybackController,
    speech: Arc<FakeSpeech>,
    source: Arc<FakeSource>,
    kv: Arc<InMemoryKvStore>,
    events: broadcast::Receiver<PlaybackEvent>,
}

fn settings(auto_advance: bool) -> PlaybackSettings {
    let channels = BTreeMap::from([
        (CategoryId::Domestic, vec!["d".to_string()]),
        (CategoryId::International, vec!["i".to_string()]),
        (CategoryId::Life, vec!["l".to_string()]),
        (CategoryId::Tech, vec!["t".to_string()]),
    ]);
    PlaybackSettings {
        auto_advance,
        channels,
        ..PlaybackSettings::default()
    }
}

async fn harness_with(settings: PlaybackSettings) -> Harness {
    let speech = Arc::new(FakeSpeech::default());
    let source = Arc::new(FakeSource::default());
    let kv = Arc::new(InMemoryKvStore::new());

    let controller =
        PlaybackController::from_ports(source.clone(), speech.clone(), kv.clone(), &settings)
            .await;
    let events = controller.subscribe();

    Harness {
        controller,
        speech,
        source,
        kv,
        events,
    }
}

async fn harness(auto_advance: bool) -> Harness {
    harness_with(settings(auto_advance)).await
}

/// Wait for the next event matching `pred`, skipping the rest.
async fn wait_event(
    rx: &mut broadcast::Receiver<PlaybackEvent>,
    pred: impl Fn(&PlaybackEvent) -> bool,
) -> PlaybackEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => {}
                Err(e) => panic!("event stream broke: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for playback event")
}

fn is_idle(event: &PlaybackEvent) -> bool {
    matches!(
        event,
        PlaybackEvent::StateChanged {
            state: PlaybackState::Idle
        }
    )
}

fn started_index(event: &PlaybackEvent) -> Option<usize> {
    match event {
        PlaybackEvent::ItemStarted { index, .. } => Some(*index),
        _ => None,
    }
}

/// Complete the live utterance and wait until the controller settled.
async fn complete_and_settle(h: &mut Harness) {
    h.speech.complete_current();
    wait_event(&mut h.events, is_idle).await;
}

fn started_id(result: &Result<PlayStart, PlaybackError>) -> &str {
    match result {
        Ok(PlayStart::Started { item, .. }) => &item.id,
        other => panic!("expected a started session, got {other:?}"),
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn initial_state_is_idle() {
    let h = harness(true).await;
    assert_eq!(h.controller.state(), PlaybackState::Idle);
    assert!(!h.controller.is_playing());
    assert_eq!(h.controller.current_item(), None);
    assert_eq!(h.controller.last_error(), None);
}

#[tokio::test]
async fn play_speaks_title_and_content() {
    let h = harness(true).await;
    h.controller
        .store()
        .seed(CategoryId::Domestic, items(CategoryId::Domestic, &["a", "b"]));

    let result = h.controller.play_category(CategoryId::Domestic).await;
    assert_eq!(started_id(&result), "a");
    assert_eq!(h.controller.state(), PlaybackState::Synthesizing);
    assert!(h.controller.is_playing());
    assert_eq!(h.controller.current_item().unwrap().id, "a");
    assert_eq!(h.speech.current().text, "Title a。Content a");
}

#[tokio::test]
async fn domestic_scenario_resumes_at_interrupted_item() {
    let mut h = harness(true).await;
    h.controller.store().seed(
        CategoryId::Domestic,
        items(CategoryId::Domestic, &["A", "B", "C"]),
    );

    let result = h.controller.play_category(CategoryId::Domestic).await;
    assert_eq!(started_id(&result), "A");

    // A completes, auto-advance speaks B.
    h.speech.complete_current();
    let event = wait_event(&mut h.events, |e| started_index(e) == Some(1)).await;
    assert!(matches!(event, PlaybackEvent::ItemStarted { ref item, .. } if item.id == "B"));
    assert!(h.controller.played().has("A"));
    assert_eq!(h.controller.positions().recorded(CategoryId::Domestic), Some(1));

    // The user stops mid-B.
    h.controller.stop().await;
    assert_eq!(h.controller.state(), PlaybackState::Idle);
    assert!(!h.controller.played().has("B"));
    assert_eq!(h.controller.positions().recorded(CategoryId::Domestic), Some(1));
    assert_eq!(h.speech.utterance(1).cancels.load(Ordering::SeqCst), 1);

    // Playing again resumes at B.
    let result = h.controller.play_category(CategoryId::Domestic).await;
    assert_eq!(started_id(&result), "B");
    assert!(matches!(result, Ok(PlayStart::Started { index: 1, .. })));
}

#[tokio::test]
async fn concurrent_play_calls_open_at_most_one_session() {
    let h = harness(true).await;
    for category in CategoryId::ALL {
        h.controller
            .store()
            .seed(category, items(category, &["x", "y", "z"]));
    }

    let calls = (0..8).map(|n| {
        let controller = h.controller.clone();
        let category = CategoryId::ALL[n % CategoryId::ALL.len()];
        async move { controller.play_category(category).await }
    });
    let results = join_all(calls).await;

    let started = results
        .iter()
        .filter(|r| matches!(r, Ok(PlayStart::Started { .. })))
        .count();
    assert_eq!(started, 1);
    assert!(
        results
            .iter()
            .all(|r| matches!(r, Ok(PlayStart::Started { .. } | PlayStart::AlreadyActive)))
    );
    assert_eq!(h.speech.started(), 1);
    assert_eq!(h.speech.max_live(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_operations_never_overlap_sessions() {
    let h = harness(true).await;
    for category in CategoryId::ALL {
        h.controller
            .store()
            .seed(category, items(category, &["x", "y", "z"]));
    }

    let mut tasks = Vec::new();
    for n in 0..24 {
        let controller = h.controller.clone();
        let category = CategoryId::ALL[n % CategoryId::ALL.len()];
        tasks.push(tokio::spawn(async move {
            match n % 3 {
                0 => drop(controller.play_category(category).await),
                1 => drop(controller.switch_category(category).await),
                _ => controller.stop().await,
            }
        }));
    }
    for task in join_all(tasks).await {
        task.unwrap();
    }

    h.controller.stop().await;
    assert!(h.speech.max_live() <= 1);
    assert_eq!(h.speech.meter.live.load(Ordering::SeqCst), 0);
    assert_eq!(h.controller.state(), PlaybackState::Idle);
}

#[tokio::test]
async fn stop_is_idempotent() {
    let h = harness(true).await;
    h.controller.stop().await;
    h.controller.stop().await;
    assert_eq!(h.controller.state(), PlaybackState::Idle);

    h.controller
        .store()
        .seed(CategoryId::Tech, items(CategoryId::Tech, &["a"]));
    h.controller.play_category(CategoryId::Tech).await.unwrap();

    h.controller.stop().await;
    let after_first = (
        h.controller.state(),
        h.controller.current_item(),
        h.controller.last_error(),
    );
    h.controller.stop().await;
    let after_second = (
        h.controller.state(),
        h.controller.current_item(),
        h.controller.last_error(),
    );

    assert_eq!(after_first, after_second);
    assert_eq!(after_second, (PlaybackState::Idle, None, None));
    assert_eq!(h.speech.current().cancels.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exhausted_category_refills_exactly_once() {
    let mut h = harness(false).await;
    h.source.set_feed("t", &["A", "B", "C"]);

    let report = h.controller.preload().await;
    assert_eq!(report[&CategoryId::Tech], Ok(3));
    assert_eq!(h.source.calls("t"), 1);

    for expected in ["A", "B", "C"] {
        let result = h.controller.play_category(CategoryId::Tech).await;
        assert_eq!(started_id(&result), expected);
        complete_and_settle(&mut h).await;
    }
    assert!(h.controller.store().is_exhausted(CategoryId::Tech));
    assert_eq!(h.source.calls("t"), 1);

    h.source.set_feed("t", &["A", "D", "E"]);
    let result = h.controller.play_category(CategoryId::Tech).await;

    // Played items are filtered out of the refilled list.
    assert_eq!(started_id(&result), "D");
    assert_eq!(h.source.calls("t"), 2);
    assert_eq!(h.controller.store().current_list(CategoryId::Tech).len(), 2);
    assert_eq!(h.controller.positions().recorded(CategoryId::Tech), Some(0));
    assert_eq!(h.speech.started(), 4);
}

#[tokio::test]
async fn auto_advance_refills_after_last_item() {
    let mut h = harness(true).await;
    h.source.set_feed("t", &["A"]);
    h.controller.preload().await;

    h.controller.play_category(CategoryId::Tech).await.unwrap();
    h.source.set_feed("t", &["B"]);
    h.speech.complete_current();

    wait_event(&mut h.events, |e| {
        matches!(e, PlaybackEvent::ItemStarted { item, .. } if item.id == "B")
    })
    .await;
    assert!(h.controller.played().has("A"));
    assert_eq!(h.source.calls("t"), 2);
}

#[tokio::test]
async fn empty_category_reports_no_items() {
    let mut h = harness(true).await;
    h.source.set_feed("l", &[]);

    let result = h.controller.play_category(CategoryId::Life).await;
    assert_eq!(result, Ok(PlayStart::Empty(CategoryId::Life)));
    wait_event(&mut h.events, |e| {
        matches!(e, PlaybackEvent::CategoryEmpty { category: CategoryId::Life })
    })
    .await;
    assert_eq!(h.controller.state(), PlaybackState::Idle);
    assert_eq!(h.speech.started(), 0);
}

#[tokio::test]
async fn failed_refill_surfaces_category_error() {
    let h = harness(true).await;

    // No feed registered for "i": every channel fails.
    let result = h.controller.play_category(CategoryId::International).await;
    assert!(matches!(
        result,
        Err(PlaybackError::AllChannelsFailed {
            category: CategoryId::International,
            ..
        })
    ));
    assert_eq!(h.controller.state(), PlaybackState::Idle);
    assert!(h.controller.last_error().is_some());
}

#[tokio::test]
async fn switch_category_stops_before_playing() {
    let mut h = harness(true).await;
    h.controller
        .store()
        .seed(CategoryId::Domestic, items(CategoryId::Domestic, &["a", "b"]));
    h.controller
        .store()
        .seed(CategoryId::Tech, items(CategoryId::Tech, &["x", "y"]));

    h.controller
        .play_category(CategoryId::Domestic)
        .await
        .unwrap();
    let result = h.controller.switch_category(CategoryId::Tech).await;
    assert_eq!(started_id(&result), "x");

    assert_eq!(h.speech.max_live(), 1);
    assert_eq!(h.speech.utterance(0).cancels.load(Ordering::SeqCst), 1);
    assert!(!h.controller.played().has("a"));
    assert_eq!(h.controller.active_category(), Some(CategoryId::Tech));

    // Exactly one stop (to Idle) between the two sessions.
    let mut sequence = Vec::new();
    while let Ok(event) = h.events.try_recv() {
        match event {
            PlaybackEvent::ItemStarted { item, .. } => sequence.push(item.id),
            e if is_idle(&e) => sequence.push("idle".to_string()),
            _ => {}
        }
    }
    assert_eq!(sequence, vec!["a", "idle", "x"]);
}

#[tokio::test]
async fn switch_restores_clamped_position() {
    let h = harness(true).await;
    h.controller
        .store()
        .seed(CategoryId::Tech, items(CategoryId::Tech, &["a", "b", "c"]));
    h.controller.positions().set(CategoryId::Tech, 5).await;

    assert_eq!(h.controller.positions().get(CategoryId::Tech, 3), Some(2));

    let result = h.controller.switch_category(CategoryId::Tech).await;
    assert_eq!(started_id(&result), "c");
    assert_eq!(h.controller.positions().recorded(CategoryId::Tech), Some(2));
}

#[tokio::test]
async fn resume_skips_items_played_elsewhere() {
    let h = harness(true).await;
    h.controller
        .store()
        .seed(CategoryId::Tech, items(CategoryId::Tech, &["a", "b", "c"]));
    h.controller.positions().set(CategoryId::Tech, 1).await;
    h.controller.played().mark_played("b").await;

    let result = h.controller.play_category(CategoryId::Tech).await;
    assert_eq!(started_id(&result), "c");
}

#[tokio::test]
async fn synthesis_failure_halts_auto_advance() {
    let mut h = harness(true).await;
    h.controller
        .store()
        .seed(CategoryId::Domestic, items(CategoryId::Domestic, &["a", "b"]));

    h.controller
        .play_category(CategoryId::Domestic)
        .await
        .unwrap();
    h.speech.fail_current("engine crashed");

    let event = wait_event(&mut h.events, |e| matches!(e, PlaybackEvent::Error { .. })).await;
    assert!(matches!(event, PlaybackEvent::Error { ref message } if message.contains("engine crashed")));
    wait_event(&mut h.events, is_idle).await;

    assert_eq!(
        h.controller.last_error(),
        Some(PlaybackError::SynthesisFailed("engine crashed".into()))
    );
    assert_eq!(h.speech.started(), 1);
    assert!(!h.controller.played().has("a"));

    // An explicit play retries the same item.
    let result = h.controller.play_category(CategoryId::Domestic).await;
    assert_eq!(started_id(&result), "a");
    assert_eq!(h.controller.last_error(), None);
}

#[tokio::test]
async fn provider_refusal_is_returned_to_caller() {
    let h = harness(true).await;
    h.controller
        .store()
        .seed(CategoryId::Tech, items(CategoryId::Tech, &["a"]));
    h.speech.refuse.store(true, Ordering::SeqCst);

    let err = h
        .controller
        .play_category(CategoryId::Tech)
        .await
        .unwrap_err();
    assert!(err.is_synthesis());
    assert_eq!(h.controller.state(), PlaybackState::Idle);
    assert_eq!(h.controller.last_error(), Some(err));
}

#[tokio::test(start_paused = true)]
async fn silent_provider_times_out_and_halts() {
    let mut h = harness_with(PlaybackSettings {
        speech_timeout_secs: 2,
        ..settings(true)
    })
    .await;
    h.controller
        .store()
        .seed(CategoryId::Tech, items(CategoryId::Tech, &["a", "b"]));

    h.controller.play_category(CategoryId::Tech).await.unwrap();
    wait_event(&mut h.events, |e| matches!(e, PlaybackEvent::Error { .. })).await;
    wait_event(&mut h.events, is_idle).await;

    assert_eq!(
        h.controller.last_error(),
        Some(PlaybackError::SynthesisTimeout(Duration::from_secs(2)))
    );
    assert_eq!(h.speech.current().cancels.load(Ordering::SeqCst), 1);
    assert_eq!(h.speech.started(), 1);
}

#[tokio::test]
async fn item_completed_callback_can_unsubscribe() {
    let mut h = harness(false).await;
    h.controller
        .store()
        .seed(CategoryId::Tech, items(CategoryId::Tech, &["a", "b"]));

    let (tx, mut completed) = mpsc::unbounded_channel();
    let subscription = h.controller.on_item_completed(move |item| {
        let _ = tx.send(item.id.clone());
    });

    h.controller.play_category(CategoryId::Tech).await.unwrap();
    complete_and_settle(&mut h).await;
    let id = tokio::time::timeout(Duration::from_secs(5), completed.recv())
        .await
        .unwrap();
    assert_eq!(id.as_deref(), Some("a"));

    subscription.unsubscribe();
    h.controller.play_category(CategoryId::Tech).await.unwrap();
    complete_and_settle(&mut h).await;
    // The listener task is gone, so its sender is dropped.
    let rest = tokio::time::timeout(Duration::from_secs(5), completed.recv())
        .await
        .unwrap();
    assert_eq!(rest, None);
}

#[tokio::test]
async fn mark_current_played_keeps_speaking() {
    let h = harness(true).await;
    h.controller
        .store()
        .seed(CategoryId::Tech, items(CategoryId::Tech, &["a", "b"]));
    h.controller.play_category(CategoryId::Tech).await.unwrap();

    let marked = h.controller.mark_current_played().await;
    assert_eq!(marked.map(|i| i.id), Some("a".to_string()));
    assert!(h.controller.played().has("a"));
    assert_eq!(h.controller.state(), PlaybackState::Synthesizing);
}

#[tokio::test]
async fn manual_mode_settles_idle_after_completion() {
    let mut h = harness(false).await;
    h.controller
        .store()
        .seed(CategoryId::Tech, items(CategoryId::Tech, &["a", "b"]));
    assert!(!h.controller.auto_advance());

    h.controller.play_category(CategoryId::Tech).await.unwrap();
    complete_and_settle(&mut h).await;

    assert_eq!(h.controller.state(), PlaybackState::Idle);
    assert_eq!(h.speech.started(), 1);
    assert_eq!(h.controller.positions().recorded(CategoryId::Tech), Some(1));

    h.controller.set_auto_advance(true);
    assert!(h.controller.auto_advance());
}

#[tokio::test]
async fn shutdown_flushes_history() {
    let mut h = harness(false).await;
    h.controller
        .store()
        .seed(CategoryId::Tech, items(CategoryId::Tech, &["a", "b"]));
    h.controller.play_category(CategoryId::Tech).await.unwrap();
    complete_and_settle(&mut h).await;
    h.controller.play_category(CategoryId::Tech).await.unwrap();

    h.controller.shutdown().await.unwrap();
    assert_eq!(h.controller.state(), PlaybackState::Idle);

    let reloaded = PlayedItemTracker::load(h.kv.clone()).await;
    assert!(reloaded.has("a"));
    assert!(!reloaded.has("b"));
}

#[tokio::test]
async fn busy_play_is_a_conflict_when_asked_strictly() {
    let mut h = harness(false).await;
    h.controller
        .store()
        .seed(CategoryId::Tech, items(CategoryId::Tech, &["a"]));

    let first = h.controller.play_category(CategoryId::Tech).await.unwrap();
    assert!(first.clone().reject_conflict().is_ok());

    let second = h.controller.play_category(CategoryId::Tech).await.unwrap();
    assert_eq!(second, PlayStart::AlreadyActive);
    assert_eq!(
        second.reject_conflict(),
        Err(PlaybackError::StateConflict)
    );
    assert_eq!(h.speech.started(), 1);

    h.controller.stop().await;
}

#[tokio::test]
async fn restart_resumes_at_the_interrupted_item() {
    let mut h = harness(false).await;
    h.source.set_feed("t", &["A", "B", "C"]);
    h.controller.preload().await;

    let first = h.controller.play_category(CategoryId::Tech).await;
    assert_eq!(started_id(&first), "A");
    complete_and_settle(&mut h).await;

    let second = h.controller.play_category(CategoryId::Tech).await;
    assert_eq!(started_id(&second), "B");
    h.controller.stop().await;
    h.controller.shutdown().await.unwrap();

    // A fresh controller over the same storage sees [B, C] after the
    // played filter; the stored index 1 would now point at C.
    let restarted = PlaybackController::from_ports(
        h.source.clone(),
        h.speech.clone(),
        h.kv.clone(),
        &settings(false),
    )
    .await;
    restarted.preload().await;
    assert_eq!(restarted.store().current_list(CategoryId::Tech).len(), 2);

    let resumed = restarted.play_category(CategoryId::Tech).await;
    assert_eq!(started_id(&resumed), "B");
    restarted.stop().await;
}
