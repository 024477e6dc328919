//! CLI subcommands.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use inkpress_directive::{parse, Configuration, ParseOptions};
use inkpress_static::{MarkdownRenderer, SnapshotGenerator};

use settings::Settings;

pub mod build;
pub mod check;
pub mod render;
pub mod run;
pub mod settings;

/// Read and parse the directive file named by `settings`.
pub fn load_configurations(settings: &Settings) -> Result<Vec<Arc<Configuration>>> {
    let source = fs::read_to_string(&settings.directives)
        .with_context(|| format!("Failed to read {}", settings.directives.display()))?;

    let options = ParseOptions {
        directive: settings.directive.clone(),
        root: settings.root.clone(),
        file: Some(settings.directives.display().to_string()),
    };

    let configs = parse(&source, &options).map_err(|partial| {
        if !partial.parsed.is_empty() {
            tracing::debug!(
                "{} configurations parsed before the error",
                partial.parsed.len()
            );
        }
        partial.error
    })?;

    tracing::info!(
        "Loaded {} configurations from {}",
        configs.len(),
        settings.directives.display()
    );

    Ok(configs.into_iter().map(Arc::new).collect())
}

/// Generator rendering through the markdown engine.
pub fn generator() -> SnapshotGenerator {
    SnapshotGenerator::new(Arc::new(MarkdownRenderer::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn settings(dir: &Path) -> Settings {
        Settings {
            root: dir.to_path_buf(),
            directives: dir.join("Inkpressfile"),
            ..Settings::default()
        }
    }

    #[test]
    fn loads_configurations_in_order() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("Inkpressfile"),
            "mmark /blog {\n  sitegen\n}\nmmark /docs\n",
        )
        .unwrap();

        let configs = load_configurations(&settings(temp.path())).unwrap();

        let scopes: Vec<_> = configs.iter().map(|c| c.path_scope.as_str()).collect();
        assert_eq!(scopes, ["/blog", "/docs"]);
        assert_eq!(
            configs[0].static_dir,
            Some(temp.path().join("generated_site"))
        );
    }

    #[test]
    fn reports_positioned_syntax_errors() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("Inkpressfile"), "mmark /blog {\n  bogus\n}\n").unwrap();

        let err = load_configurations(&settings(temp.path())).unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Inkpressfile:2:3"), "{message}");
        assert!(message.contains("bogus"), "{message}");
    }

    #[test]
    fn missing_directive_file_is_an_error() {
        let temp = tempdir().unwrap();

        let err = load_configurations(&settings(temp.path())).unwrap_err();

        assert!(err.to_string().contains("Failed to read"));
    }
}
