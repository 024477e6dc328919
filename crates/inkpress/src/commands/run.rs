//! Long-running regeneration command.

use anyhow::Result;
use inkpress_runtime::{Coordinator, WatchEvent};
use tokio::sync::broadcast::error::RecvError;

use super::settings::Settings;
use super::{generator, load_configurations};

/// Generate every configuration, then watch until Ctrl-C.
pub async fn run(settings: &Settings) -> Result<()> {
    let configs = load_configurations(settings)?;

    let mut coordinator = Coordinator::new(generator(), settings.watch.schedule());
    let mut events = coordinator.events().subscribe();

    if let Err(e) = coordinator.start(&configs).await {
        coordinator.shutdown().await;
        return Err(e.into());
    }

    if coordinator.watchers().is_empty() {
        tracing::info!("No configurations to watch");
        return Ok(());
    }

    tracing::info!("Watching for changes, press Ctrl-C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                break;
            }
            event = events.recv() => match event {
                Ok(WatchEvent::Unchanged { scope }) => {
                    tracing::debug!("{} unchanged", scope);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Skipped {} watch events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::info!("Shutting down...");
    coordinator.shutdown().await;

    Ok(())
}
