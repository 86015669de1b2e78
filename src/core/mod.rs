//! Core business logic modules.

pub mod catalog;
pub mod guide;
pub mod orchestrator;
pub mod parser;
pub mod playlist;
pub mod scanner;
pub mod watch_policy;
