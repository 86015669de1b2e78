//! Data models.

pub mod action;
pub mod catalog;
pub mod config;
pub mod playlist;
