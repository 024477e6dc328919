//! Single document render command.

use anyhow::{Context, Result};

use super::settings::Settings;
use super::{generator, load_configurations};

/// Render `request_path` with the configuration whose scope covers it.
///
/// The scope's link index is built first so relative links resolve.
pub fn run(settings: &Settings, request_path: &str) -> Result<()> {
    let configs = load_configurations(settings)?;
    let generator = generator();

    // Most specific scope wins.
    let config = configs
        .iter()
        .filter(|c| c.matches(request_path))
        .max_by_key(|c| c.path_scope.len())
        .with_context(|| format!("No configuration covers {}", request_path))?;

    generator
        .generate(config)
        .with_context(|| format!("Failed to index {}", config.path_scope))?;

    let html = generator
        .render_page(config, request_path)
        .with_context(|| format!("Failed to render {}", request_path))?;

    print!("{}", html);

    Ok(())
}
