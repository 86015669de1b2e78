//! Integration tests for the playback orchestrator.
//!
//! The orchestrator runs against a scripted volume manager and a recording
//! playback engine; the catalog store is real.
//!
//! Tests cover:
//! - Waiting for media and starting playback
//! - Natural end of file, skip, previous and guide jumps
//! - Mark seen, volume and mute actions
//! - Late events from a previously loaded file
//! - Player failures (error, quit, exit, rejected file)
//! - Drive disconnect and shutdown

use media_kiosk::core::catalog::CatalogStore;
use media_kiosk::core::orchestrator::Orchestrator;
use media_kiosk::models::action::Action;
use media_kiosk::models::catalog::{Catalog, CatalogEntry, MovieEntry, WatchState, WatchStatus};
use media_kiosk::models::config::Config;
use media_kiosk::services::player::{
    EndReason, EngineLauncher, EntryId, FileEvent, PlaybackEngine, PlayerEvent, SeekTarget,
};
use media_kiosk::services::volume::VolumeManager;
use media_kiosk::utils::shutdown::ShutdownSignal;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

const TIMEOUT: Duration = Duration::from_secs(5);

// ========== MOCKS ==========

#[derive(Default)]
struct VolumeState {
    connected: AtomicBool,
    find_calls: AtomicUsize,
}

struct MockVolume {
    root: PathBuf,
    state: Arc<VolumeState>,
}

impl VolumeManager for MockVolume {
    fn find_media_volume(&mut self) -> Option<PathBuf> {
        self.state.find_calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .connected
            .load(Ordering::SeqCst)
            .then(|| self.root.clone())
    }

    fn is_still_connected(&mut self, _root: &Path) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Play(PathBuf, u64),
    Pause(bool),
    Seek(SeekTarget),
    Volume(u8),
    Stop,
    Text(String),
    Shutdown,
}

struct EngineLog {
    events: Option<UnboundedSender<PlayerEvent>>,
    calls: Vec<Call>,
    launches: usize,
    announce_start: bool,
    fail_play: bool,
    entry: EntryId,
}

struct MockLauncher {
    log: Arc<Mutex<EngineLog>>,
}

impl EngineLauncher for MockLauncher {
    fn launch(
        &mut self,
        events: UnboundedSender<PlayerEvent>,
        _volume: u8,
    ) -> media_kiosk::Result<Box<dyn PlaybackEngine>> {
        let mut log = self.log.lock().unwrap();
        log.events = Some(events);
        log.launches += 1;
        Ok(Box::new(MockEngine {
            log: Arc::clone(&self.log),
        }))
    }
}

struct MockEngine {
    log: Arc<Mutex<EngineLog>>,
}

impl MockEngine {
    fn record(&self, call: Call) {
        self.log.lock().unwrap().calls.push(call);
    }
}

impl PlaybackEngine for MockEngine {
    fn play(&mut self, path: &Path, start_offset: u64) -> media_kiosk::Result<EntryId> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(Call::Play(path.to_path_buf(), start_offset));
        if log.fail_play {
            return Err(media_kiosk::Error::PlayerIpc("broken pipe".to_string()));
        }
        log.entry += 1;
        let entry = log.entry;
        if log.announce_start {
            if let Some(events) = &log.events {
                let _ = events.send(PlayerEvent::File(entry, FileEvent::Started));
            }
        }
        Ok(entry)
    }

    fn set_paused(&mut self, paused: bool) -> media_kiosk::Result<()> {
        self.record(Call::Pause(paused));
        Ok(())
    }

    fn seek(&mut self, target: SeekTarget) -> media_kiosk::Result<()> {
        self.record(Call::Seek(target));
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> media_kiosk::Result<()> {
        self.record(Call::Volume(volume));
        Ok(())
    }

    fn stop(&mut self) -> media_kiosk::Result<()> {
        self.record(Call::Stop);
        Ok(())
    }

    fn show_text(&mut self, text: &str, _duration: Duration) -> media_kiosk::Result<()> {
        self.record(Call::Text(text.to_string()));
        Ok(())
    }

    fn shutdown(&mut self) {
        self.record(Call::Shutdown);
    }
}

// ========== HARNESS ==========

struct Kiosk {
    _dir: TempDir,
    root: PathBuf,
    volume: Arc<VolumeState>,
    engine: Arc<Mutex<EngineLog>>,
    actions: UnboundedSender<Action>,
    shutdown: ShutdownSignal,
    handle: JoinHandle<media_kiosk::Result<()>>,
}

fn movie_path(name: &str) -> String {
    format!("Movies/{}/{}.mkv", name, name)
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.volume.retry_interval_secs = 1;
    config.library.rescan_on_mount = false;
    config.playback.connection_check_interval_ms = 20;
    config.playback.resume_checkpoint_secs = 0;
    config.playback.empty_playlist_cooldown_secs = 1;
    config
}

/// Start an orchestrator over a drive holding the given movies.
fn start(movies: &[&str], connected: bool, announce_start: bool) -> Kiosk {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    std::fs::create_dir_all(root.join("Movies")).unwrap();

    let config = test_config();
    let mut catalog = Catalog::new();
    for name in movies {
        catalog.insert(CatalogEntry::Movie(MovieEntry::new(*name, None, movie_path(name))));
    }
    CatalogStore::new(config.library.catalog_path(&root))
        .save(&catalog)
        .unwrap();

    let volume = Arc::new(VolumeState::default());
    volume.connected.store(connected, Ordering::SeqCst);
    let engine = Arc::new(Mutex::new(EngineLog {
        events: None,
        calls: Vec::new(),
        launches: 0,
        announce_start,
        fail_play: false,
        entry: 0,
    }));

    let (actions, action_rx) = mpsc::unbounded_channel();
    let shutdown = ShutdownSignal::new();
    let mut orchestrator = Orchestrator::new(
        config,
        Box::new(MockVolume {
            root: root.clone(),
            state: Arc::clone(&volume),
        }),
        Box::new(MockLauncher {
            log: Arc::clone(&engine),
        }),
        action_rx,
        shutdown.clone(),
    );
    let handle = tokio::spawn(async move { orchestrator.run().await });

    Kiosk {
        _dir: dir,
        root,
        volume,
        engine,
        actions,
        shutdown,
        handle,
    }
}

impl Kiosk {
    fn calls(&self) -> Vec<Call> {
        self.engine.lock().unwrap().calls.clone()
    }

    fn plays(&self) -> Vec<(PathBuf, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Play(path, start) => Some((path, start)),
                _ => None,
            })
            .collect()
    }

    fn volumes(&self) -> Vec<u8> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Volume(volume) => Some(volume),
                _ => None,
            })
            .collect()
    }

    fn launches(&self) -> usize {
        self.engine.lock().unwrap().launches
    }

    /// Id of the most recently loaded file.
    fn entry(&self) -> EntryId {
        self.engine.lock().unwrap().entry
    }

    fn send(&self, event: PlayerEvent) {
        let log = self.engine.lock().unwrap();
        log.events.as_ref().unwrap().send(event).unwrap();
    }

    /// Report an event for the file currently loaded.
    fn event(&self, event: FileEvent) {
        self.send(PlayerEvent::File(self.entry(), event));
    }

    fn action(&self, action: Action) {
        self.actions.send(action).unwrap();
    }

    fn watch(&self, file_path: &str) -> WatchState {
        CatalogStore::new(self.root.join("media_library.json"))
            .load()
            .watch_state(file_path)
            .unwrap()
    }

    /// Catalog path of the item currently playing.
    fn playing(&self) -> String {
        let (path, _) = self.plays().last().cloned().unwrap();
        path.strip_prefix(&self.root)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/")
    }

    async fn wait_for_plays(&self, count: usize) {
        wait_until("playback", || self.plays().len() >= count).await;
    }

    async fn stop(self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(TIMEOUT, self.handle)
            .await
            .expect("orchestrator did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}

async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {}", what);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Give the orchestrator time to drain events before an action is sent.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

// ========== LIFECYCLE ==========

#[tokio::test]
async fn test_waits_for_media_then_plays() {
    let kiosk = start(&["Heat"], false, true);

    wait_until("discovery retries", || kiosk.volume.find_calls.load(Ordering::SeqCst) >= 1).await;
    assert!(kiosk.plays().is_empty());

    kiosk.volume.connected.store(true, Ordering::SeqCst);
    kiosk.wait_for_plays(1).await;

    let (path, start) = kiosk.plays()[0].clone();
    assert_eq!(path, kiosk.root.join("Movies").join("Heat").join("Heat.mkv"));
    assert_eq!(start, 0);
    assert!(kiosk.calls().contains(&Call::Text("Heat".to_string())));

    kiosk.stop().await;
}

#[tokio::test]
async fn test_natural_end_marks_seen() {
    let kiosk = start(&["Heat"], true, true);
    kiosk.wait_for_plays(1).await;

    kiosk.event(FileEvent::TimePos(10.0));
    kiosk.event(FileEvent::Duration(5400.0));
    kiosk.event(FileEvent::End(EndReason::Eof));

    let path = movie_path("Heat");
    wait_until("seen status", || kiosk.watch(&path).status == WatchStatus::Seen).await;
    assert_eq!(kiosk.watch(&path).resume_position, 0);

    kiosk.stop().await;
}

#[tokio::test]
async fn test_late_events_from_skipped_file_are_ignored() {
    let kiosk = start(&["Heat", "Ronin"], true, false);
    kiosk.wait_for_plays(1).await;
    let skipped = kiosk.entry();

    // Skip before the first file reported that it started.
    kiosk.action(Action::Next);
    kiosk.wait_for_plays(2).await;
    let second = kiosk.playing();

    kiosk.send(PlayerEvent::File(skipped, FileEvent::Started));
    kiosk.send(PlayerEvent::File(skipped, FileEvent::TimePos(5000.0)));
    kiosk.send(PlayerEvent::File(skipped, FileEvent::End(EndReason::Stop)));
    kiosk.event(FileEvent::Started);
    settle().await;

    assert_eq!(kiosk.plays().len(), 2);
    assert!(!kiosk.calls().contains(&Call::Shutdown));
    assert_eq!(kiosk.watch(&second), WatchState::default());

    kiosk.event(FileEvent::TimePos(12.0));
    kiosk.action(Action::Next);
    wait_until("resume position", || kiosk.watch(&second).resume_position == 12).await;

    kiosk.stop().await;
}

// ========== NAVIGATION ==========

#[tokio::test]
async fn test_next_saves_resume_position() {
    let kiosk = start(&["Heat"], true, true);
    kiosk.wait_for_plays(1).await;

    kiosk.event(FileEvent::TimePos(120.7));
    kiosk.event(FileEvent::Duration(5400.0));
    settle().await;
    kiosk.action(Action::Next);

    let path = movie_path("Heat");
    wait_until("resume position", || kiosk.watch(&path).resume_position == 120).await;
    assert_eq!(kiosk.watch(&path).status, WatchStatus::Unseen);

    // The playlist is exhausted; the next session resumes where we left.
    kiosk.wait_for_plays(2).await;
    assert_eq!(kiosk.plays()[1].1, 120);
    assert!(kiosk.calls().contains(&Call::Shutdown));

    kiosk.stop().await;
}

#[tokio::test]
async fn test_previous_on_first_item_replays_it() {
    let kiosk = start(&["Heat"], true, true);
    kiosk.wait_for_plays(1).await;

    kiosk.action(Action::Previous);
    kiosk.wait_for_plays(2).await;

    let plays = kiosk.plays();
    assert_eq!(plays[0].0, plays[1].0);
    assert_eq!(kiosk.launches(), 1);

    kiosk.stop().await;
}

#[tokio::test]
async fn test_guide_jump() {
    let kiosk = start(&["Heat", "Ronin"], true, true);
    kiosk.wait_for_plays(1).await;
    let first = kiosk.playing();

    kiosk.action(Action::ShowGuide);
    kiosk.action(Action::Down);
    kiosk.action(Action::Select);
    kiosk.wait_for_plays(2).await;

    assert_ne!(kiosk.playing(), first);
    assert!(kiosk
        .calls()
        .iter()
        .any(|call| matches!(call, Call::Text(text) if text.starts_with("--- Guide ---"))));
    assert_eq!(kiosk.watch(&first).status, WatchStatus::Unseen);

    kiosk.stop().await;
}

// ========== ACTIONS ==========

#[tokio::test]
async fn test_mark_seen_keeps_playing() {
    let kiosk = start(&["Heat"], true, true);
    kiosk.wait_for_plays(1).await;
    let path = movie_path("Heat");

    kiosk.event(FileEvent::TimePos(30.0));
    kiosk.action(Action::MarkSeen);
    wait_until("seen status", || kiosk.watch(&path).status == WatchStatus::Seen).await;

    settle().await;
    assert_eq!(kiosk.plays().len(), 1);
    assert!(!kiosk.calls().contains(&Call::Stop));

    kiosk.stop().await;
}

#[tokio::test]
async fn test_volume_and_pause() {
    let kiosk = start(&["Heat"], true, true);
    kiosk.wait_for_plays(1).await;

    kiosk.action(Action::VolumeUp);
    kiosk.action(Action::ToggleMute);
    kiosk.action(Action::ToggleMute);
    kiosk.action(Action::VolumeDown);
    kiosk.action(Action::TogglePause);
    kiosk.action(Action::Restart);

    wait_until("volume changes", || kiosk.volumes().len() == 4).await;
    assert_eq!(kiosk.volumes(), vec![75, 0, 70, 65]);
    wait_until("restart", || kiosk.calls().contains(&Call::Seek(SeekTarget::Absolute(0.0)))).await;
    assert!(kiosk.calls().contains(&Call::Pause(true)));

    kiosk.stop().await;
}

#[tokio::test]
async fn test_item_end_closes_guide() {
    let kiosk = start(&["Heat", "Ronin"], true, true);
    kiosk.wait_for_plays(1).await;

    kiosk.action(Action::ShowGuide);
    settle().await;
    kiosk.event(FileEvent::End(EndReason::Eof));
    kiosk.wait_for_plays(2).await;

    // Playback keys work again on the next item.
    kiosk.action(Action::VolumeUp);
    wait_until("volume change", || kiosk.volumes() == vec![75]).await;

    kiosk.stop().await;
}

// ========== PLAYER FAILURES ==========

#[tokio::test]
async fn test_player_error_saves_resume_and_advances() {
    let kiosk = start(&["Heat"], true, true);
    kiosk.wait_for_plays(1).await;

    kiosk.event(FileEvent::TimePos(600.0));
    kiosk.event(FileEvent::Duration(5400.0));
    kiosk.event(FileEvent::End(EndReason::Error));

    let path = movie_path("Heat");
    wait_until("resume position", || kiosk.watch(&path).resume_position == 600).await;
    assert_eq!(kiosk.watch(&path).status, WatchStatus::Unseen);

    // Advancing past the last item starts a new session that resumes.
    kiosk.wait_for_plays(2).await;
    assert_eq!(kiosk.plays()[1].1, 600);

    kiosk.stop().await;
}

#[tokio::test]
async fn test_player_exit_restarts_session() {
    let kiosk = start(&["Heat"], true, true);
    kiosk.wait_for_plays(1).await;

    kiosk.event(FileEvent::TimePos(42.0));
    settle().await;
    kiosk.send(PlayerEvent::Exited);

    wait_until("engine teardown", || kiosk.calls().contains(&Call::Shutdown)).await;
    assert_eq!(kiosk.watch(&movie_path("Heat")).resume_position, 42);

    wait_until("relaunch", || kiosk.launches() == 2).await;
    kiosk.wait_for_plays(2).await;
    assert_eq!(kiosk.plays()[1].1, 42);

    kiosk.stop().await;
}

#[tokio::test]
async fn test_player_quit_restarts_session() {
    let kiosk = start(&["Heat"], true, true);
    kiosk.wait_for_plays(1).await;

    kiosk.event(FileEvent::End(EndReason::Quit));

    wait_until("engine teardown", || kiosk.calls().contains(&Call::Shutdown)).await;
    wait_until("relaunch", || kiosk.launches() == 2).await;
    assert_eq!(kiosk.watch(&movie_path("Heat")).status, WatchStatus::Unseen);

    kiosk.stop().await;
}

#[tokio::test]
async fn test_rejected_file_backs_off_and_retries() {
    let kiosk = start(&["Heat"], true, true);
    kiosk.engine.lock().unwrap().fail_play = true;

    kiosk.wait_for_plays(1).await;
    wait_until("engine teardown", || kiosk.calls().contains(&Call::Shutdown)).await;
    assert_eq!(kiosk.launches(), 1);

    wait_until("relaunch", || kiosk.launches() == 2).await;
    kiosk.wait_for_plays(2).await;
    assert_eq!(kiosk.plays()[1].0, kiosk.plays()[0].0);
    assert_eq!(kiosk.watch(&movie_path("Heat")), WatchState::default());

    kiosk.stop().await;
}

// ========== DISCONNECT AND SHUTDOWN ==========

#[tokio::test]
async fn test_disconnect_stops_without_status_change() {
    let kiosk = start(&["Heat"], true, true);
    kiosk.wait_for_plays(1).await;
    let finds = kiosk.volume.find_calls.load(Ordering::SeqCst);

    kiosk.event(FileEvent::TimePos(200.0));
    settle().await;
    kiosk.volume.connected.store(false, Ordering::SeqCst);

    wait_until("engine stop", || kiosk.calls().contains(&Call::Stop)).await;
    wait_until("rediscovery", || kiosk.volume.find_calls.load(Ordering::SeqCst) > finds).await;

    let watch = kiosk.watch(&movie_path("Heat"));
    assert_eq!(watch.status, WatchStatus::Unseen);
    assert_eq!(watch.resume_position, 0);
    assert!(kiosk.calls().contains(&Call::Shutdown));

    kiosk.stop().await;
}

#[tokio::test]
async fn test_shutdown_action_saves_resume() {
    let kiosk = start(&["Heat"], true, true);
    kiosk.wait_for_plays(1).await;

    kiosk.event(FileEvent::TimePos(300.0));
    kiosk.event(FileEvent::Duration(5400.0));
    settle().await;
    kiosk.action(Action::Shutdown);

    let result = tokio::time::timeout(TIMEOUT, kiosk.handle)
        .await
        .expect("orchestrator did not stop")
        .unwrap();
    assert!(result.is_ok());
    assert!(kiosk.shutdown.is_triggered());

    let calls = kiosk.engine.lock().unwrap().calls.clone();
    assert!(calls.contains(&Call::Stop));
    assert_eq!(calls.last(), Some(&Call::Shutdown));

    let watch = CatalogStore::new(kiosk.root.join("media_library.json"))
        .load()
        .watch_state(&movie_path("Heat"))
        .unwrap();
    assert_eq!(watch.resume_position, 300);
}
