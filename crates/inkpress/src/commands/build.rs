//! Static snapshot build command.

use anyhow::{Context, Result};

use super::settings::Settings;
use super::{generator, load_configurations};

/// Run one generation pass per configuration, in order.
pub async fn run(settings: &Settings, force: bool) -> Result<()> {
    tracing::info!("Building static snapshots...");

    let configs = load_configurations(settings)?;
    let generator = generator();

    let mut pages = 0;
    let mut regenerated = 0;

    for config in configs {
        let scope = config.path_scope.clone();
        let generator = generator.clone();

        let report = tokio::task::spawn_blocking(move || {
            if force {
                generator.rebuild(&config)
            } else {
                generator.generate(&config)
            }
        })
        .await?
        .with_context(|| format!("Failed to generate {}", scope))?;

        pages += report.pages;
        if report.regenerated {
            regenerated += 1;
        }
    }

    tracing::info!(
        "Indexed {} pages, {} configurations regenerated",
        pages,
        regenerated
    );

    Ok(())
}
