//! mpv playback engine over the JSON IPC socket.

use crate::models::config::PlaybackConfig;
use crate::services::player::{
    EndReason, EngineLauncher, EntryId, FileEvent, PlaybackEngine, PlayerEvent, SeekTarget,
};
use crate::Result;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_RETRY: Duration = Duration::from_millis(100);
const QUIT_GRACE: Duration = Duration::from_secs(1);

/// Starts an idle mpv process per media session.
#[derive(Debug, Clone)]
pub struct MpvLauncher {
    mpv_path: String,
    fullscreen: bool,
    socket_path: PathBuf,
}

impl MpvLauncher {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            mpv_path: config.mpv_path.clone(),
            fullscreen: config.fullscreen,
            socket_path: std::env::temp_dir().join(format!("media-kiosk-mpv-{}.sock", std::process::id())),
        }
    }
}

impl EngineLauncher for MpvLauncher {
    /// Blocks for up to five seconds while mpv creates its socket.
    fn launch(&mut self, events: UnboundedSender<PlayerEvent>, volume: u8) -> Result<Box<dyn PlaybackEngine>> {
        let _ = std::fs::remove_file(&self.socket_path);

        let mut cmd = Command::new(&self.mpv_path);
        cmd.arg("--idle=yes")
            .arg("--force-window=yes")
            .arg(format!("--input-ipc-server={}", self.socket_path.display()))
            .arg("--no-terminal")
            .arg("--osc=no")
            .arg("--keep-open=no")
            .arg(format!("--volume={}", volume.min(100)));
        if self.fullscreen {
            cmd.arg("--fullscreen");
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

        tracing::info!("Starting player: {}", self.mpv_path);
        let mut child = cmd
            .spawn()
            .map_err(|e| crate::Error::PlayerLaunch(format!("{}: {}", self.mpv_path, e)))?;

        let stream = match connect(&mut child, &self.socket_path) {
            Ok(stream) => stream,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };

        let reader = stream
            .try_clone()
            .map_err(|e| crate::Error::PlayerIpc(e.to_string()))?;
        std::thread::Builder::new()
            .name("mpv-events".to_string())
            .spawn(move || read_events(reader, events))?;

        let mut engine = MpvEngine {
            child,
            stream,
            socket_path: self.socket_path.clone(),
            request_id: 1,
            loaded_entries: 0,
            closed: false,
        };
        engine.command(json!(["observe_property", 1, "time-pos"]))?;
        engine.command(json!(["observe_property", 2, "duration"]))?;

        Ok(Box::new(engine))
    }
}

fn connect(child: &mut Child, socket_path: &Path) -> Result<UnixStream> {
    let deadline = Instant::now() + CONNECT_TIMEOUT;
    loop {
        if let Some(status) = child.try_wait()? {
            return Err(crate::Error::PlayerLaunch(format!("mpv exited early: {}", status)));
        }
        match UnixStream::connect(socket_path) {
            Ok(stream) => return Ok(stream),
            Err(e) if Instant::now() >= deadline => {
                return Err(crate::Error::PlayerLaunch(format!(
                    "IPC socket {} not available: {}",
                    socket_path.display(),
                    e
                )));
            }
            Err(_) => std::thread::sleep(CONNECT_RETRY),
        }
    }
}

/// Translate IPC messages into player events until the socket closes.
///
/// `start-file` and `end-file` carry mpv's `playlist_entry_id`; property
/// changes are attributed to the entry that started last.
fn read_events(stream: UnixStream, events: UnboundedSender<PlayerEvent>) {
    let mut current: Option<EntryId> = None;

    for line in BufReader::new(stream).lines() {
        let Ok(line) = line else { break };
        let Ok(msg) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        let entry = msg["playlist_entry_id"].as_u64();

        let event = match msg["event"].as_str() {
            Some("start-file") => {
                current = entry.or(current);
                current.map(|id| PlayerEvent::File(id, FileEvent::Started))
            }
            Some("end-file") => entry.or(current).map(|id| {
                let reason = EndReason::from_mpv(msg["reason"].as_str().unwrap_or("stop"));
                PlayerEvent::File(id, FileEvent::End(reason))
            }),
            Some("property-change") => match (current, msg["name"].as_str(), msg["data"].as_f64()) {
                (Some(id), Some("time-pos"), Some(pos)) => Some(PlayerEvent::File(id, FileEvent::TimePos(pos))),
                (Some(id), Some("duration"), Some(dur)) => Some(PlayerEvent::File(id, FileEvent::Duration(dur))),
                _ => None,
            },
            Some("shutdown") => break,
            _ => None,
        };

        if let Some(event) = event {
            if events.send(event).is_err() {
                return;
            }
        }
    }

    tracing::debug!("Player event stream closed");
    let _ = events.send(PlayerEvent::Exited);
}

/// Handle to a running mpv process.
pub struct MpvEngine {
    child: Child,
    stream: UnixStream,
    socket_path: PathBuf,
    request_id: u64,
    /// mpv numbers playlist entries from 1 and `loadfile replace` adds one
    /// per call, so the n-th `play` is entry n.
    loaded_entries: EntryId,
    closed: bool,
}

impl MpvEngine {
    fn command(&mut self, args: Value) -> Result<()> {
        if self.closed {
            return Err(crate::Error::PlayerNotRunning);
        }
        let command = json!({
            "command": args,
            "request_id": self.request_id,
        });
        self.request_id += 1;

        writeln!(self.stream, "{}", command).map_err(|e| crate::Error::PlayerIpc(e.to_string()))?;
        self.stream
            .flush()
            .map_err(|e| crate::Error::PlayerIpc(e.to_string()))
    }
}

impl PlaybackEngine for MpvEngine {
    fn play(&mut self, path: &Path, start_offset: u64) -> Result<EntryId> {
        self.command(json!(["set_property", "start", start_offset.to_string()]))?;
        self.command(json!(["set_property", "pause", false]))?;
        self.command(json!(["loadfile", path.to_string_lossy(), "replace"]))?;
        self.loaded_entries += 1;
        Ok(self.loaded_entries)
    }

    fn set_paused(&mut self, paused: bool) -> Result<()> {
        self.command(json!(["set_property", "pause", paused]))
    }

    fn seek(&mut self, target: SeekTarget) -> Result<()> {
        match target {
            SeekTarget::Relative(secs) => self.command(json!(["seek", secs, "relative"])),
            SeekTarget::Absolute(secs) => self.command(json!(["seek", secs, "absolute"])),
        }
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        self.command(json!(["set_property", "volume", volume.min(100)]))
    }

    fn stop(&mut self) -> Result<()> {
        self.command(json!(["stop"]))
    }

    fn show_text(&mut self, text: &str, duration: Duration) -> Result<()> {
        self.command(json!(["show-text", text, duration.as_millis() as u64]))
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        let _ = self.command(json!(["quit"]));
        self.closed = true;

        let deadline = Instant::now() + QUIT_GRACE;
        while Instant::now() < deadline {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => std::thread::sleep(Duration::from_millis(50)),
                Err(_) => break,
            }
        }
        if let Ok(None) = self.child.try_wait() {
            tracing::warn!("Player did not quit in time, killing it");
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        let _ = std::fs::remove_file(&self.socket_path);
        tracing::info!("Player stopped");
    }
}

impl Drop for MpvEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
