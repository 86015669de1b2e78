//! Line-based input source.
//!
//! Reads one action per line on a dedicated OS thread and forwards it to
//! the orchestrator over an unbounded channel, so the reader never waits on
//! the consumer.

use crate::models::action::Action;
use std::io::{BufRead, BufReader};
use std::thread::JoinHandle;
use tokio::sync::mpsc::UnboundedSender;

/// Read actions from standard input.
pub fn spawn_stdin_source(tx: UnboundedSender<Action>) -> std::io::Result<JoinHandle<()>> {
    spawn_line_source(BufReader::new(std::io::stdin()), tx)
}

/// Read actions from any line-oriented reader until it ends or the
/// receiving side is dropped.
pub fn spawn_line_source<R>(reader: R, tx: UnboundedSender<Action>) -> std::io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name("input".to_string())
        .spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                match line.parse::<Action>() {
                    Ok(action) => {
                        if tx.send(action).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::debug!("{}", e),
                }
            }
            tracing::debug!("Input source closed");
        })
}
