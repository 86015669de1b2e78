//! Run command implementation.

use crate::core::orchestrator::Orchestrator;
use crate::models::config::Config;
use crate::services::input;
use crate::services::player::EngineLauncher;
use crate::services::volume::MountVolumeManager;
use crate::utils::shutdown::ShutdownSignal;
use anyhow::{Context, Result};
use tokio::sync::mpsc;

/// Run the appliance loop until a signal or the shutdown action stops it.
pub async fn run(config: Config) -> Result<()> {
    let shutdown = ShutdownSignal::new();
    spawn_signal_handlers(shutdown.clone());

    let (action_tx, actions) = mpsc::unbounded_channel();
    input::spawn_stdin_source(action_tx).context("Failed to start input reader")?;

    let volumes = Box::new(MountVolumeManager::new(config.volume.clone()));
    let launcher = player_launcher(&config)?;

    let mut orchestrator = Orchestrator::new(config, volumes, launcher, actions, shutdown);
    orchestrator.run().await?;

    Ok(())
}

#[cfg(unix)]
fn player_launcher(config: &Config) -> Result<Box<dyn EngineLauncher>> {
    Ok(Box::new(crate::services::mpv::MpvLauncher::new(&config.playback)))
}

#[cfg(not(unix))]
fn player_launcher(_config: &Config) -> Result<Box<dyn EngineLauncher>> {
    anyhow::bail!("Playback through mpv IPC requires a Unix platform")
}

/// Route SIGINT and SIGTERM to the shutdown signal.
fn spawn_signal_handlers(shutdown: ShutdownSignal) {
    let on_interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            on_interrupt.trigger();
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                if terminate.recv().await.is_some() {
                    tracing::info!("Termination signal received");
                    shutdown.trigger();
                }
            }
            Err(e) => tracing::warn!("Cannot listen for SIGTERM: {}", e),
        }
    });
}
