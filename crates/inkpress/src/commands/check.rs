//! Directive check command.

use anyhow::Result;

use super::load_configurations;
use super::settings::Settings;

/// Parse the directive file and print the configurations.
pub fn run(settings: &Settings) -> Result<()> {
    let configs = load_configurations(settings)?;
    let configs: Vec<_> = configs.iter().map(|c| c.as_ref()).collect();

    println!("{}", serde_json::to_string_pretty(&configs)?);

    Ok(())
}
