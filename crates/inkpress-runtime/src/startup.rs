//! Startup coordination.
//!
//! Every configuration is generated once, in parse order, before its watcher
//! starts. The first failed generation stops startup; watchers started
//! before it keep running.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use inkpress_directive::Configuration;
use inkpress_static::{GenerateError, SnapshotGenerator};

use crate::events::WatchEvents;
use crate::ticks::{ManualClock, Ticks};
use crate::watcher::{WatchError, Watcher};

/// Period between watcher passes unless configured otherwise.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// What drives the watchers.
#[derive(Debug, Clone)]
pub enum WatchSchedule {
    /// Fixed period
    Interval(Duration),

    /// File events under each scope, plus a fallback period
    Events { fallback: Duration },

    /// A clock advanced by hand
    Manual(ManualClock),
}

impl WatchSchedule {
    fn ticks(&self, config: &Configuration) -> Result<Ticks, WatchError> {
        match self {
            Self::Interval(period) => Ok(Ticks::interval(*period)),
            Self::Events { fallback } => {
                Ticks::events(&config.scope_dir(), config.static_dir.clone(), *fallback)
            }
            Self::Manual(clock) => Ok(clock.ticks()),
        }
    }
}

impl Default for WatchSchedule {
    fn default() -> Self {
        Self::Interval(DEFAULT_INTERVAL)
    }
}

/// One startup action, by configuration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Generate(usize),
    Watch(usize),
}

/// Startup plan: generate each configuration, then watch it unless it is in
/// development mode.
pub fn plan(configs: &[Arc<Configuration>]) -> Vec<Step> {
    let mut steps = Vec::with_capacity(configs.len() * 2);

    for (i, config) in configs.iter().enumerate() {
        steps.push(Step::Generate(i));
        if !config.development {
            steps.push(Step::Watch(i));
        }
    }

    steps
}

/// Errors that can occur during startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to generate {scope}: {source}")]
    Generate {
        scope: String,
        source: GenerateError,
    },

    #[error("Generation task for {scope} did not complete: {source}")]
    Join {
        scope: String,
        source: tokio::task::JoinError,
    },

    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// Runs the startup plan and owns the watchers it starts.
pub struct Coordinator {
    generator: SnapshotGenerator,
    schedule: WatchSchedule,
    events: WatchEvents,
    shutdown: watch::Sender<bool>,
    watchers: Vec<Watcher>,
}

impl Coordinator {
    pub fn new(generator: SnapshotGenerator, schedule: WatchSchedule) -> Self {
        Self {
            generator,
            schedule,
            events: WatchEvents::new(),
            shutdown: watch::channel(false).0,
            watchers: Vec::new(),
        }
    }

    /// Hub receiving the outcome of every watcher pass.
    pub fn events(&self) -> &WatchEvents {
        &self.events
    }

    /// Watchers started so far, in start order.
    pub fn watchers(&self) -> &[Watcher] {
        &self.watchers
    }

    /// Generate and watch `configs` in order.
    ///
    /// Stops at the first error. Watchers started before it stay active.
    pub async fn start(&mut self, configs: &[Arc<Configuration>]) -> Result<(), StartupError> {
        for step in plan(configs) {
            match step {
                Step::Generate(i) => self.generate(&configs[i]).await?,
                Step::Watch(i) => self.watch(&configs[i])?,
            }
        }

        tracing::info!(
            "Started {} configurations, {} watched",
            configs.len(),
            self.watchers.len()
        );

        Ok(())
    }

    async fn generate(&self, config: &Arc<Configuration>) -> Result<(), StartupError> {
        let scope = config.path_scope.clone();
        let generator = self.generator.clone();
        let config = Arc::clone(config);

        let report = tokio::task::spawn_blocking(move || generator.generate(&config))
            .await
            .map_err(|source| StartupError::Join {
                scope: scope.clone(),
                source,
            })?
            .map_err(|source| StartupError::Generate { scope, source })?;

        tracing::info!(
            "Generated {} ({} pages) in {}ms",
            report.scope,
            report.pages,
            report.duration_ms
        );

        Ok(())
    }

    fn watch(&mut self, config: &Arc<Configuration>) -> Result<(), StartupError> {
        let ticks = self.schedule.ticks(config)?;
        let watcher = Watcher::spawn(
            self.generator.clone(),
            Arc::clone(config),
            ticks,
            self.events.clone(),
            self.shutdown.subscribe(),
        )?;
        self.watchers.push(watcher);

        Ok(())
    }

    /// Stop every watcher and wait for them to finish.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);

        for watcher in self.watchers {
            watcher.join().await;
        }

        tracing::info!("All watchers stopped");
    }
}
