//! Media Kiosk Library
//!
//! Catalogs the video content of a removable media drive and drives an
//! unattended "next unwatched item" playback loop on top of mpv.

pub mod cli;
pub mod core;
pub mod error;
pub mod models;
pub mod preflight;
pub mod services;
pub mod utils;

pub use error::{Error, Result};
