//! External collaborators: playback engine, media drives and input.

pub mod input;
#[cfg(unix)]
pub mod mpv;
pub mod player;
pub mod volume;
