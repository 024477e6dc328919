//! Settings file (inkpress.toml).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use inkpress_runtime::WatchSchedule;
use serde::Deserialize;

/// Settings file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Document root
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// File holding the directives
    #[serde(default = "default_directives")]
    pub directives: PathBuf,

    /// Name of the top-level directive
    #[serde(default = "default_directive")]
    pub directive: String,

    #[serde(default)]
    pub watch: WatchSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchSettings {
    /// Seconds between passes (the fallback period in `events` mode)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default)]
    pub mode: WatchMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// Regenerate on a fixed period
    #[default]
    Poll,

    /// Regenerate on file events
    Events,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_directives() -> PathBuf {
    PathBuf::from("Inkpressfile")
}
fn default_directive() -> String {
    "mmark".to_string()
}
fn default_interval_secs() -> u64 {
    inkpress_runtime::DEFAULT_INTERVAL.as_secs()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: default_root(),
            directives: default_directives(),
            directive: default_directive(),
            watch: WatchSettings::default(),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            mode: WatchMode::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path` if it exists.
    ///
    /// Relative paths are resolved against the settings file's directory.
    /// Returns an error if the file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if let Some(base) = path.parent() {
            settings.root = base.join(&settings.root);
            settings.directives = base.join(&settings.directives);
        }

        tracing::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}

impl WatchSettings {
    /// Watch schedule for the runtime.
    pub fn schedule(&self) -> WatchSchedule {
        let period = Duration::from_secs(self.interval_secs.max(1));
        match self.mode {
            WatchMode::Poll => WatchSchedule::Interval(period),
            WatchMode::Events => WatchSchedule::Events { fallback: period },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().unwrap();

        let settings = Settings::load(&temp.path().join("inkpress.toml")).unwrap();

        assert_eq!(settings.root, PathBuf::from("."));
        assert_eq!(settings.directives, PathBuf::from("Inkpressfile"));
        assert_eq!(settings.directive, "mmark");
        assert_eq!(settings.watch.interval_secs, 60);
        assert_eq!(settings.watch.mode, WatchMode::Poll);
    }

    #[test]
    fn loads_and_resolves_paths() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("inkpress.toml");
        fs::write(
            &path,
            "root = \"site\"\ndirective = \"markdown\"\n\n[watch]\ninterval_secs = 5\nmode = \"events\"\n",
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();

        assert_eq!(settings.root, temp.path().join("site"));
        assert_eq!(settings.directives, temp.path().join("Inkpressfile"));
        assert_eq!(settings.directive, "markdown");
        assert!(matches!(
            settings.watch.schedule(),
            WatchSchedule::Events { fallback } if fallback == Duration::from_secs(5)
        ));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("inkpress.toml");
        fs::write(&path, "[watch]\nmode = \"sometimes\"\n").unwrap();

        let err = Settings::load(&path).unwrap_err();

        assert!(format!("{err:#}").contains("Failed to parse"));
    }

    #[test]
    fn poll_mode_uses_interval() {
        let watch = WatchSettings::default();

        assert!(matches!(
            watch.schedule(),
            WatchSchedule::Interval(period) if period == Duration::from_secs(60)
        ));
    }
}
