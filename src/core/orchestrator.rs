//! Playback orchestrator.
//!
//! Drives the appliance lifecycle: wait for a media drive, bring its
//! catalog up to date, play the playlist item by item while reacting to
//! input actions and engine events, and fall back to waiting whenever
//! something goes away.

use crate::core::catalog::{CatalogStore, LoadOutcome};
use crate::core::guide::{Guide, GuideOutcome};
use crate::core::playlist::select_playlist;
use crate::core::scanner::LibraryScanner;
use crate::core::watch_policy::{decide, ExitKind, Progress, StatusDecision};
use crate::models::action::Action;
use crate::models::catalog::WatchStatus;
use crate::models::config::{Config, VolumeSettings};
use crate::models::playlist::PlaylistItem;
use crate::services::player::{
    EndReason, EngineLauncher, EntryId, FileEvent, PlaybackEngine, PlayerEvent, SeekTarget,
};
use crate::services::volume::VolumeManager;
use crate::utils::shutdown::ShutdownSignal;
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::MissedTickBehavior;

/// How long the guide stays on screen without input.
const GUIDE_DISPLAY: Duration = Duration::from_secs(3600);
/// How long volume and status notices stay on screen.
const NOTICE_DISPLAY: Duration = Duration::from_secs(2);

/// Lifecycle state of the appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Starting,
    WaitingForMedia,
    Initializing,
    Playing,
    ShuttingDown,
}

impl std::fmt::Display for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AppState::Starting => "STARTING",
            AppState::WaitingForMedia => "WAITING_FOR_MEDIA",
            AppState::Initializing => "INITIALIZING",
            AppState::Playing => "PLAYING",
            AppState::ShuttingDown => "SHUTTING_DOWN",
        };
        write!(f, "{}", name)
    }
}

/// How playback of one item ended, from the playlist's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Advance,
    Back,
    Jump(usize),
    Disconnected,
    EngineFailed,
    Shutdown,
}

/// Why a media session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    PlaylistDone,
    Disconnected,
    EngineFailed,
    Shutdown,
}

/// Everything that lives for one attached drive.
struct MediaSession {
    root: PathBuf,
    store: Arc<CatalogStore>,
    settings: VolumeSettings,
    engine: Box<dyn PlaybackEngine>,
    events: UnboundedReceiver<PlayerEvent>,
    playlist: Vec<PlaylistItem>,
    index: usize,
    guide: Guide,
    volume: u8,
}

/// Per-item playback bookkeeping.
struct ItemTracker {
    file_path: String,
    entry: EntryId,
    progress: Progress,
    started: bool,
    paused: bool,
    marked_seen: bool,
    last_checkpoint: Instant,
    checkpointed: u64,
}

/// The appliance state machine.
pub struct Orchestrator {
    config: Config,
    volumes: Box<dyn VolumeManager>,
    launcher: Arc<Mutex<Box<dyn EngineLauncher>>>,
    actions: UnboundedReceiver<Action>,
    input_open: bool,
    shutdown: ShutdownSignal,
    state: AppState,
    media_root: Option<PathBuf>,
    session: Option<MediaSession>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        volumes: Box<dyn VolumeManager>,
        launcher: Box<dyn EngineLauncher>,
        actions: UnboundedReceiver<Action>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            config,
            volumes,
            launcher: Arc::new(Mutex::new(launcher)),
            actions,
            input_open: true,
            shutdown,
            state: AppState::Starting,
            media_root: None,
            session: None,
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    /// Run until shutdown is requested. Recoverable problems never end the
    /// loop; they send it back to waiting for media.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Media kiosk starting");

        loop {
            if self.shutdown.is_triggered() {
                self.transition(AppState::ShuttingDown);
            }

            let next = match self.state {
                AppState::Starting => AppState::WaitingForMedia,
                AppState::WaitingForMedia => self.wait_for_media().await,
                AppState::Initializing => self.initialize().await,
                AppState::Playing => self.play().await,
                AppState::ShuttingDown => break,
            };
            self.transition(next);
        }

        if let Some(session) = self.session.take() {
            teardown(session).await;
        }
        tracing::info!("Media kiosk stopped");
        Ok(())
    }

    fn transition(&mut self, next: AppState) {
        if next != self.state {
            tracing::info!("State transition: {} -> {}", self.state, next);
            self.state = next;
        }
    }

    async fn wait_for_media(&mut self) -> AppState {
        if let Some(root) = self.volumes.find_media_volume() {
            self.media_root = Some(root);
            return AppState::Initializing;
        }

        tracing::info!(
            "No media drive found, retrying in {}s",
            self.config.volume.retry_interval().as_secs()
        );
        if self.idle(self.config.volume.retry_interval()).await {
            AppState::WaitingForMedia
        } else {
            AppState::ShuttingDown
        }
    }

    async fn initialize(&mut self) -> AppState {
        let Some(root) = self.media_root.clone() else {
            return AppState::WaitingForMedia;
        };

        let store = Arc::new(CatalogStore::new(self.config.library.catalog_path(&root)));
        let settings = VolumeSettings::load_or_create(&root);

        let needs_scan = self.config.library.rescan_on_mount
            || match store.load_checked() {
                LoadOutcome::Loaded(catalog) => catalog.is_empty(),
                LoadOutcome::Missing | LoadOutcome::Invalid(_) => true,
            };

        if needs_scan {
            let scanner = LibraryScanner::new(root.clone(), &self.config.library);
            let scan_store = Arc::clone(&store);
            let scanned = tokio::task::spawn_blocking(move || scanner.scan_into_store(&scan_store, false)).await;

            let failure = match scanned {
                Ok(Ok(_)) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(e) => Some(format!("scan task failed: {}", e)),
            };
            if let Some(reason) = failure {
                tracing::error!("Library scan of {} failed: {}", root.display(), reason);
                return self.cool_down().await;
            }
        }

        let playlist = select_playlist(&store.load());
        if playlist.is_empty() {
            tracing::info!("Nothing left to watch on {}", root.display());
            return self.cool_down().await;
        }

        let (event_tx, events) = mpsc::unbounded_channel();
        let volume = settings.player.volume_default;
        let launcher = Arc::clone(&self.launcher);
        let launched = tokio::task::spawn_blocking(move || {
            let mut launcher = launcher.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            launcher.launch(event_tx, volume)
        })
        .await;

        let engine = match launched {
            Ok(Ok(engine)) => engine,
            Ok(Err(e)) => {
                tracing::error!("Failed to start playback engine: {}", e);
                return self.cool_down().await;
            }
            Err(e) => {
                tracing::error!("Playback engine launch task failed: {}", e);
                return self.cool_down().await;
            }
        };

        self.session = Some(MediaSession {
            root,
            store,
            guide: Guide::new(settings.ui.guide_page_size),
            settings,
            engine,
            events,
            playlist,
            index: 0,
            volume,
        });
        AppState::Playing
    }

    async fn cool_down(&mut self) -> AppState {
        if self.idle(self.config.playback.empty_playlist_cooldown()).await {
            AppState::WaitingForMedia
        } else {
            AppState::ShuttingDown
        }
    }

    /// Sleep while still honoring shutdown. Returns false on shutdown.
    async fn idle(&mut self, duration: Duration) -> bool {
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = self.shutdown.wait() => return false,
                _ = &mut sleep => return true,
                action = self.actions.recv(), if self.input_open => match action {
                    Some(Action::Shutdown) => {
                        self.shutdown.trigger();
                        return false;
                    }
                    Some(other) => tracing::debug!("Ignoring {} while nothing is playing", other),
                    None => self.input_open = false,
                },
            }
        }
    }

    async fn play(&mut self) -> AppState {
        let Some(mut session) = self.session.take() else {
            return AppState::WaitingForMedia;
        };
        let end = self.play_session(&mut session).await;
        teardown(session).await;

        match end {
            SessionEnd::PlaylistDone | SessionEnd::Disconnected => AppState::WaitingForMedia,
            SessionEnd::Shutdown => AppState::ShuttingDown,
            SessionEnd::EngineFailed => {
                let retry = self.config.volume.retry_interval();
                tracing::warn!("Playback engine failed, restarting in {}s", retry.as_secs());
                if self.idle(retry).await {
                    AppState::WaitingForMedia
                } else {
                    AppState::ShuttingDown
                }
            }
        }
    }

    async fn play_session(&mut self, session: &mut MediaSession) -> SessionEnd {
        while session.index < session.playlist.len() {
            if self.shutdown.is_triggered() {
                return SessionEnd::Shutdown;
            }
            if !self.volumes.is_still_connected(&session.root) {
                tracing::warn!("Media drive {} disconnected", session.root.display());
                return SessionEnd::Disconnected;
            }

            match self.play_item(session).await {
                ItemOutcome::Advance => session.index += 1,
                ItemOutcome::Back => session.index = session.index.saturating_sub(1),
                ItemOutcome::Jump(index) => session.index = index,
                ItemOutcome::Disconnected => return SessionEnd::Disconnected,
                ItemOutcome::EngineFailed => return SessionEnd::EngineFailed,
                ItemOutcome::Shutdown => return SessionEnd::Shutdown,
            }
        }

        tracing::info!("Playlist finished");
        SessionEnd::PlaylistDone
    }

    async fn play_item(&mut self, session: &mut MediaSession) -> ItemOutcome {
        let item = session.playlist[session.index].clone();
        let path = absolute_path(&session.root, &item.file_path);
        session.guide.close();

        let start = session
            .store
            .load()
            .watch_state(&item.file_path)
            .map(|watch| if watch.is_unseen() { watch.resume_position } else { 0 })
            .unwrap_or(item.resume_position);

        tracing::info!(
            "Playing [{}/{}]: {} (from {}s)",
            session.index + 1,
            session.playlist.len(),
            item.display_title(),
            start
        );
        let entry = match session.engine.play(&path, start) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!("Player rejected {}: {}", item.file_path, e);
                return ItemOutcome::EngineFailed;
            }
        };

        let overlay = session.settings.title_overlay_duration();
        if !overlay.is_zero() {
            notify(session.engine.as_mut(), &item.display_title(), overlay);
        }

        let mut tracker = ItemTracker {
            file_path: item.file_path.clone(),
            entry,
            progress: Progress {
                position: start as f64,
                duration: None,
            },
            started: false,
            paused: false,
            marked_seen: false,
            last_checkpoint: Instant::now(),
            checkpointed: start,
        };

        let mut ticker = tokio::time::interval(self.config.playback.connection_check_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown.wait() => {
                    stop_engine(session.engine.as_mut());
                    self.finish(session, &tracker, ExitKind::Interrupted);
                    return ItemOutcome::Shutdown;
                }
                event = session.events.recv() => {
                    if let Some(outcome) = self.handle_event(session, &mut tracker, event) {
                        return outcome;
                    }
                }
                action = self.actions.recv(), if self.input_open => match action {
                    Some(action) => {
                        tracing::debug!("Action: {}", action);
                        if let Some(outcome) = self.handle_action(session, &mut tracker, action) {
                            return outcome;
                        }
                    }
                    None => {
                        tracing::debug!("Input source closed");
                        self.input_open = false;
                    }
                },
                _ = ticker.tick() => {
                    if !self.volumes.is_still_connected(&session.root) {
                        tracing::warn!("Media drive disconnected during playback");
                        stop_engine(session.engine.as_mut());
                        return ItemOutcome::Disconnected;
                    }
                    self.checkpoint(session, &mut tracker);
                }
            }
        }
    }

    fn handle_event(
        &mut self,
        session: &mut MediaSession,
        tracker: &mut ItemTracker,
        event: Option<PlayerEvent>,
    ) -> Option<ItemOutcome> {
        let event = match event {
            Some(PlayerEvent::File(entry, event)) if entry == tracker.entry => event,
            Some(PlayerEvent::File(entry, event)) => {
                tracing::debug!("Ignoring {:?} from earlier entry {}", event, entry);
                return None;
            }
            Some(PlayerEvent::Exited) | None => {
                tracing::error!("Player exited unexpectedly");
                self.finish(session, tracker, ExitKind::Failed);
                return Some(ItemOutcome::EngineFailed);
            }
        };

        match event {
            FileEvent::Started => tracker.started = true,
            FileEvent::TimePos(position) => tracker.progress.position = position,
            FileEvent::Duration(duration) => tracker.progress.duration = Some(duration),
            FileEvent::End(reason) => {
                return Some(match reason {
                    EndReason::Eof => {
                        tracing::info!("Finished: {}", tracker.file_path);
                        self.finish(session, tracker, ExitKind::Completed);
                        ItemOutcome::Advance
                    }
                    EndReason::Error => {
                        tracing::error!("Player failed on {}", tracker.file_path);
                        self.finish(session, tracker, ExitKind::Failed);
                        ItemOutcome::Advance
                    }
                    EndReason::Quit => {
                        self.finish(session, tracker, ExitKind::Failed);
                        ItemOutcome::EngineFailed
                    }
                    EndReason::Stop | EndReason::Redirect => {
                        self.finish(session, tracker, ExitKind::Interrupted);
                        ItemOutcome::Advance
                    }
                });
            }
        }
        None
    }

    fn handle_action(
        &mut self,
        session: &mut MediaSession,
        tracker: &mut ItemTracker,
        action: Action,
    ) -> Option<ItemOutcome> {
        if session.guide.is_visible() {
            return self.handle_guide_action(session, tracker, action);
        }

        match action {
            Action::TogglePause => {
                tracker.paused = !tracker.paused;
                if let Err(e) = session.engine.set_paused(tracker.paused) {
                    tracing::warn!("Failed to toggle pause: {}", e);
                }
            }
            Action::Next => {
                self.finish(session, tracker, ExitKind::Interrupted);
                return Some(ItemOutcome::Advance);
            }
            Action::Previous => {
                self.finish(session, tracker, ExitKind::Interrupted);
                return Some(ItemOutcome::Back);
            }
            Action::Restart => {
                if let Err(e) = session.engine.seek(SeekTarget::Absolute(0.0)) {
                    tracing::warn!("Failed to restart: {}", e);
                }
            }
            Action::VolumeUp | Action::VolumeDown => {
                let step = session.settings.player.volume_step;
                let volume = if action == Action::VolumeUp {
                    session.volume.saturating_add(step).min(100)
                } else {
                    session.volume.saturating_sub(step)
                };
                set_volume(session, volume);
            }
            Action::ToggleMute => {
                let volume = if session.volume > 0 {
                    0
                } else {
                    session.settings.player.volume_default
                };
                set_volume(session, volume);
            }
            Action::MarkSeen => {
                match session
                    .store
                    .update_item_status(&tracker.file_path, WatchStatus::Seen, None)
                {
                    Ok(true) => {
                        tracker.marked_seen = true;
                        notify(session.engine.as_mut(), "Marked as seen", NOTICE_DISPLAY);
                    }
                    Ok(false) => tracing::warn!("{} is not in the catalog", tracker.file_path),
                    Err(e) => tracing::error!("Failed to mark {} as seen: {}", tracker.file_path, e),
                }
            }
            Action::ShowGuide => {
                session.guide.open(session.index);
                let text = session.guide.render(&session.playlist);
                notify(session.engine.as_mut(), &text, GUIDE_DISPLAY);
            }
            Action::Shutdown => {
                self.shutdown.trigger();
                stop_engine(session.engine.as_mut());
                self.finish(session, tracker, ExitKind::Interrupted);
                return Some(ItemOutcome::Shutdown);
            }
            Action::Up | Action::Down | Action::Select => {
                tracing::debug!("Ignoring {} outside the guide", action);
            }
        }
        None
    }

    fn handle_guide_action(
        &mut self,
        session: &mut MediaSession,
        tracker: &mut ItemTracker,
        action: Action,
    ) -> Option<ItemOutcome> {
        match session.guide.handle(action, session.playlist.len()) {
            GuideOutcome::Redraw => {
                let text = session.guide.render(&session.playlist);
                notify(session.engine.as_mut(), &text, GUIDE_DISPLAY);
            }
            GuideOutcome::Hidden => notify(session.engine.as_mut(), "", Duration::ZERO),
            GuideOutcome::Jump(index) => {
                notify(session.engine.as_mut(), "", Duration::ZERO);
                tracing::info!("Guide jump to item {}", index + 1);
                self.finish(session, tracker, ExitKind::Interrupted);
                return Some(ItemOutcome::Jump(index));
            }
            GuideOutcome::Shutdown => {
                self.shutdown.trigger();
                stop_engine(session.engine.as_mut());
                self.finish(session, tracker, ExitKind::Interrupted);
                return Some(ItemOutcome::Shutdown);
            }
            GuideOutcome::Ignored => tracing::debug!("Guide ignores {}", action),
        }
        None
    }

    /// Persist the resume position periodically so a power loss loses at
    /// most one interval of progress.
    fn checkpoint(&self, session: &MediaSession, tracker: &mut ItemTracker) {
        let Some(interval) = self.config.playback.resume_checkpoint_interval() else {
            return;
        };
        if !tracker.started || tracker.marked_seen || tracker.last_checkpoint.elapsed() < interval {
            return;
        }
        tracker.last_checkpoint = Instant::now();

        if let StatusDecision::SaveResume(seconds) = decide(tracker.progress, ExitKind::Interrupted, false) {
            if seconds != tracker.checkpointed {
                save_resume(&session.store, &tracker.file_path, seconds);
                tracker.checkpointed = seconds;
            }
        }
    }

    /// Apply the status/resume policy for the item being left.
    fn finish(&self, session: &MediaSession, tracker: &ItemTracker, exit: ExitKind) {
        match decide(tracker.progress, exit, tracker.marked_seen) {
            StatusDecision::MarkSeen => {
                match session
                    .store
                    .update_item_status(&tracker.file_path, WatchStatus::Seen, None)
                {
                    Ok(_) => tracing::info!("Marked as seen: {}", tracker.file_path),
                    Err(e) => tracing::error!("Failed to mark {} as seen: {}", tracker.file_path, e),
                }
            }
            StatusDecision::SaveResume(seconds) => save_resume(&session.store, &tracker.file_path, seconds),
            StatusDecision::Unchanged => {}
        }
    }
}

/// Release the engine off the async threads; mpv may take a moment to quit.
async fn teardown(session: MediaSession) {
    let MediaSession { root, mut engine, .. } = session;
    if let Err(e) = tokio::task::spawn_blocking(move || engine.shutdown()).await {
        tracing::error!("Engine shutdown task failed: {}", e);
    }
    tracing::info!("Media session on {} closed", root.display());
}

/// Record a resume position without touching the status; seen entries keep
/// a zero position.
fn save_resume(store: &CatalogStore, file_path: &str, seconds: u64) {
    let result = store.modify(|catalog| match catalog.watch_state_mut(file_path) {
        Some(watch) => {
            watch.set_resume_position(seconds);
            true
        }
        None => false,
    });
    match result {
        Ok(true) => tracing::info!("Saved resume position {}s for {}", seconds, file_path),
        Ok(false) => tracing::warn!("{} is not in the catalog", file_path),
        Err(e) => tracing::error!("Failed to save resume position for {}: {}", file_path, e),
    }
}

fn set_volume(session: &mut MediaSession, volume: u8) {
    session.volume = volume;
    match session.engine.set_volume(volume) {
        Ok(()) => notify(session.engine.as_mut(), &format!("Volume: {}%", volume), NOTICE_DISPLAY),
        Err(e) => tracing::warn!("Failed to set volume: {}", e),
    }
}

fn notify(engine: &mut dyn PlaybackEngine, text: &str, duration: Duration) {
    if let Err(e) = engine.show_text(text, duration) {
        tracing::debug!("Overlay failed: {}", e);
    }
}

fn stop_engine(engine: &mut dyn PlaybackEngine) {
    if let Err(e) = engine.stop() {
        tracing::debug!("Stop failed: {}", e);
    }
}

/// Resolve a `/`-separated catalog path against the media root.
fn absolute_path(root: &Path, file_path: &str) -> PathBuf {
    file_path
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |path, part| path.join(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path() {
        assert_eq!(
            absolute_path(Path::new("/media/usb"), "TV_Shows/Foo/Season 1/e.mkv"),
            PathBuf::from("/media/usb/TV_Shows/Foo/Season 1/e.mkv")
        );
    }

    #[test]
    fn test_state_names() {
        assert_eq!(AppState::WaitingForMedia.to_string(), "WAITING_FOR_MEDIA");
        assert_eq!(AppState::ShuttingDown.to_string(), "SHUTTING_DOWN");
    }
}
