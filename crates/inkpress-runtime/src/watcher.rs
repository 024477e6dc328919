//! Periodic regeneration of one configuration.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use inkpress_directive::Configuration;
use inkpress_static::SnapshotGenerator;

use crate::events::{WatchEvent, WatchEvents};
use crate::ticks::Ticks;

/// Errors that can occur when starting a watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Configuration {0} is in development mode and is not watched")]
    Development(String),

    #[error("Failed to watch {path}: {source}")]
    Notify {
        path: PathBuf,
        source: notify::Error,
    },
}

/// Background task regenerating one configuration on every tick.
#[derive(Debug)]
pub struct Watcher {
    scope: String,
    handle: JoinHandle<()>,
}

impl Watcher {
    /// Start watching `config`.
    ///
    /// Passes run on the blocking pool one at a time. The task stops when
    /// `shutdown` flips to `true` or its sender goes away.
    pub fn spawn(
        generator: SnapshotGenerator,
        config: Arc<Configuration>,
        ticks: Ticks,
        events: WatchEvents,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, WatchError> {
        if config.development {
            return Err(WatchError::Development(config.path_scope.clone()));
        }

        let scope = config.path_scope.clone();
        tracing::info!("Watching {} for changes", scope);

        let handle = tokio::spawn(watch_loop(generator, config, ticks, events, shutdown));

        Ok(Self { scope, handle })
    }

    /// Path scope being watched.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Wait for the task to stop.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::warn!("Watcher for {} ended abnormally: {}", self.scope, e);
        }
    }
}

async fn watch_loop(
    generator: SnapshotGenerator,
    config: Arc<Configuration>,
    mut ticks: Ticks,
    events: WatchEvents,
    mut shutdown: watch::Receiver<bool>,
) {
    while !*shutdown.borrow() {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            more = ticks.next() => if !more { break },
        }

        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            event = run_pass(&generator, &config) => events.send(event),
        }
    }

    tracing::debug!("Stopped watching {}", config.path_scope);
}

/// Run one generation pass, turning its outcome into an event.
async fn run_pass(generator: &SnapshotGenerator, config: &Arc<Configuration>) -> WatchEvent {
    let scope = config.path_scope.clone();
    let generator = generator.clone();
    let config = Arc::clone(config);

    match tokio::task::spawn_blocking(move || generator.generate(&config)).await {
        Ok(Ok(report)) if report.regenerated => WatchEvent::Regenerated {
            scope: report.scope,
            pages: report.pages,
            duration_ms: report.duration_ms,
        },
        Ok(Ok(report)) => WatchEvent::Unchanged {
            scope: report.scope,
        },
        Ok(Err(e)) => {
            tracing::error!("Failed to regenerate {}: {}", scope, e);
            WatchEvent::Failed {
                scope,
                error: e.to_string(),
            }
        }
        Err(e) => {
            tracing::error!("Generation task for {} did not complete: {}", scope, e);
            WatchEvent::Failed {
                scope,
                error: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticks::ManualClock;
    use inkpress_static::MarkdownRenderer;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::sync::broadcast;

    fn generator() -> SnapshotGenerator {
        SnapshotGenerator::new(Arc::new(MarkdownRenderer::new()))
    }

    fn blog_config(root: &Path) -> Arc<Configuration> {
        let mut config = Configuration::new(root, "/blog");
        config.static_dir = Some(root.join("generated_site"));
        config.finish();
        Arc::new(config)
    }

    async fn next_event(rx: &mut broadcast::Receiver<WatchEvent>) -> WatchEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timeout waiting for watch event")
            .expect("event hub closed")
    }

    struct Harness {
        clock: ManualClock,
        events: WatchEvents,
        shutdown: watch::Sender<bool>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                clock: ManualClock::new(),
                events: WatchEvents::new(),
                shutdown: watch::channel(false).0,
            }
        }

        fn spawn(&self, config: Arc<Configuration>) -> Result<Watcher, WatchError> {
            Watcher::spawn(
                generator(),
                config,
                self.clock.ticks(),
                self.events.clone(),
                self.shutdown.subscribe(),
            )
        }
    }

    #[tokio::test]
    async fn tick_regenerates_changed_sources() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("blog")).unwrap();
        fs::write(root.join("blog/a.md"), "# Before").unwrap();
        let config = blog_config(root);
        generator().generate(&config).unwrap();

        let harness = Harness::new();
        let mut rx = harness.events.subscribe();
        let watcher = harness.spawn(Arc::clone(&config)).unwrap();
        assert_eq!(watcher.scope(), "/blog");

        fs::write(root.join("blog/a.md"), "# After").unwrap();
        harness.clock.tick();

        let event = next_event(&mut rx).await;
        assert!(
            matches!(event, WatchEvent::Regenerated { ref scope, pages: 1, .. } if scope == "/blog"),
            "unexpected event {event:?}"
        );
        let html = fs::read_to_string(config.static_file("/blog/a.md").unwrap()).unwrap();
        assert!(html.contains("<h1>After</h1>"));
        assert!(watcher.is_active());
    }

    #[tokio::test]
    async fn unchanged_sources_report_unchanged() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("blog")).unwrap();
        fs::write(root.join("blog/a.md"), "a").unwrap();
        let config = blog_config(root);
        generator().generate(&config).unwrap();

        let harness = Harness::new();
        let mut rx = harness.events.subscribe();
        let _watcher = harness.spawn(config).unwrap();

        harness.clock.tick();

        assert_eq!(
            next_event(&mut rx).await,
            WatchEvent::Unchanged {
                scope: "/blog".to_string()
            }
        );
    }

    #[tokio::test]
    async fn failed_pass_keeps_snapshot_and_recovers() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("blog")).unwrap();
        fs::write(root.join("blog/a.md"), "a").unwrap();
        let config = blog_config(root);
        generator().generate(&config).unwrap();
        let before = config.static_files();

        let harness = Harness::new();
        let mut rx = harness.events.subscribe();
        let watcher = harness.spawn(Arc::clone(&config)).unwrap();

        fs::write(root.join("blog/b.md"), "---\ntitle: [oops\n---\n").unwrap();
        harness.clock.tick();

        let event = next_event(&mut rx).await;
        assert!(
            matches!(event, WatchEvent::Failed { ref error, .. } if error.contains("/blog/b.md")),
            "unexpected event {event:?}"
        );
        assert_eq!(config.static_files(), before);
        assert!(watcher.is_active());

        fs::write(root.join("blog/b.md"), "---\ntitle: Fixed\n---\n").unwrap();
        harness.clock.tick();

        let event = next_event(&mut rx).await;
        assert!(
            matches!(event, WatchEvent::Regenerated { pages: 2, .. }),
            "unexpected event {event:?}"
        );
        assert!(config.static_file("/blog/b.md").is_some());
    }

    #[tokio::test]
    async fn refuses_development_configuration() {
        let temp = tempdir().unwrap();
        let mut config = Configuration::new(temp.path(), "/blog");
        config.development = true;
        config.finish();

        let result = Harness::new().spawn(Arc::new(config));

        assert!(matches!(result, Err(WatchError::Development(ref scope)) if scope == "/blog"));
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("blog")).unwrap();
        let harness = Harness::new();
        let watcher = harness.spawn(blog_config(temp.path())).unwrap();

        harness.shutdown.send_replace(true);

        tokio::time::timeout(Duration::from_secs(5), watcher.join())
            .await
            .expect("watcher did not stop");
    }

    #[tokio::test]
    async fn stops_when_ticks_run_out() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("blog")).unwrap();
        let harness = Harness::new();
        let watcher = harness.spawn(blog_config(temp.path())).unwrap();

        drop(harness.clock);

        tokio::time::timeout(Duration::from_secs(5), watcher.join())
            .await
            .expect("watcher did not stop");
    }
}
