//! Playback engine seam.
//!
//! The orchestrator never talks to mpv directly; it drives a
//! [`PlaybackEngine`] and consumes [`PlayerEvent`]s from a channel.

use crate::Result;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Why the engine stopped playing a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Reached the end of the file.
    Eof,
    /// Stopped by a command (stop, loadfile replace).
    Stop,
    /// The engine is quitting.
    Quit,
    /// Playback failed.
    Error,
    /// The file redirected to another one (playlists).
    Redirect,
}

impl EndReason {
    /// Parse mpv's `end-file` reason.
    pub fn from_mpv(reason: &str) -> Self {
        match reason {
            "eof" => EndReason::Eof,
            "quit" => EndReason::Quit,
            "error" => EndReason::Error,
            "redirect" => EndReason::Redirect,
            _ => EndReason::Stop,
        }
    }
}

/// Identifies one `play` request. Events for older requests can still be in
/// flight after a newer file was loaded.
pub type EntryId = u64;

/// Something that happened to one loaded file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileEvent {
    /// The file started playing.
    Started,
    /// Current position in seconds.
    TimePos(f64),
    /// Duration of the file in seconds.
    Duration(f64),
    /// The file ended.
    End(EndReason),
}

/// Asynchronous notification from the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    /// An event for the file loaded by the `play` call that returned the id.
    File(EntryId, FileEvent),
    /// The engine process went away.
    Exited,
}

/// Seek target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    Relative(f64),
    Absolute(f64),
}

/// Control surface of a running playback engine.
pub trait PlaybackEngine: Send {
    /// Play `path`, starting `start_offset` seconds in. Events about this
    /// file carry the returned id.
    fn play(&mut self, path: &Path, start_offset: u64) -> Result<EntryId>;

    fn set_paused(&mut self, paused: bool) -> Result<()>;

    fn seek(&mut self, target: SeekTarget) -> Result<()>;

    /// Volume in percent (0-100).
    fn set_volume(&mut self, volume: u8) -> Result<()>;

    /// Stop the current file; the engine stays alive.
    fn stop(&mut self) -> Result<()>;

    /// Show text on the on-screen display.
    fn show_text(&mut self, text: &str, duration: Duration) -> Result<()>;

    /// Release the engine completely.
    fn shutdown(&mut self);
}

/// Starts one engine per media session.
pub trait EngineLauncher: Send {
    /// Start an engine that reports to `events`, at `volume` percent.
    fn launch(&mut self, events: UnboundedSender<PlayerEvent>, volume: u8) -> Result<Box<dyn PlaybackEngine>>;
}
