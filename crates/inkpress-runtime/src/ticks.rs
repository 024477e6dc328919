//! Tick sources that drive watcher passes.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::broadcast;
use tokio::sync::mpsc as async_mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::watcher::WatchError;

/// Quiet period that closes a burst of file events.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// When a watcher should run its next pass.
pub enum Ticks {
    /// Fixed period, first tick one period after start
    Interval(Interval),

    /// Driven by a [`ManualClock`]
    Manual(broadcast::Receiver<()>),

    /// File system changes under a directory, with a fallback period
    Events {
        _watcher: RecommendedWatcher,
        changes: async_mpsc::Receiver<()>,
        fallback: Interval,
    },
}

impl Ticks {
    /// Tick every `period`.
    pub fn interval(period: Duration) -> Self {
        Ticks::Interval(delayed_interval(period))
    }

    /// Tick when anything under `dir` changes, and at least every `fallback`.
    ///
    /// Changes under `ignore` (the static mirror) do not tick.
    pub fn events(
        dir: &Path,
        ignore: Option<PathBuf>,
        fallback: Duration,
    ) -> Result<Self, WatchError> {
        // Event paths are reported under the watched path as given.
        let dir = std::path::absolute(dir).map_err(|e| WatchError::Notify {
            path: dir.to_path_buf(),
            source: notify::Error::io(e),
        })?;
        let ignore = ignore.and_then(|p| std::path::absolute(p).ok());
        let dir = dir.as_path();

        let (sync_tx, sync_rx) = mpsc::channel();
        let (changes_tx, changes) = async_mpsc::channel(1);

        let notify_err = |source| WatchError::Notify {
            path: dir.to_path_buf(),
            source,
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(notify_err)?;

        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(notify_err)?;

        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                if !is_relevant(&event, ignore.as_deref()) {
                    continue;
                }

                // Fold the rest of the burst into this tick.
                while sync_rx.recv_timeout(DEBOUNCE).is_ok() {}

                match changes_tx.try_send(()) {
                    Ok(()) | Err(async_mpsc::error::TrySendError::Full(())) => {}
                    Err(async_mpsc::error::TrySendError::Closed(())) => break,
                }
            }
        });

        tracing::debug!("Watching {} for file events", dir.display());

        Ok(Ticks::Events {
            _watcher: watcher,
            changes,
            fallback: delayed_interval(fallback),
        })
    }

    /// Wait for the next tick. Returns `false` once the source is exhausted.
    pub async fn next(&mut self) -> bool {
        match self {
            Ticks::Interval(interval) => {
                interval.tick().await;
                true
            }
            Ticks::Manual(rx) => match rx.recv().await {
                Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => true,
                Err(broadcast::error::RecvError::Closed) => false,
            },
            Ticks::Events {
                changes, fallback, ..
            } => {
                tokio::select! {
                    change = changes.recv() => change.is_some(),
                    _ = fallback.tick() => true,
                }
            }
        }
    }
}

fn delayed_interval(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

fn is_relevant(event: &notify::Event, ignore: Option<&Path>) -> bool {
    use notify::EventKind;

    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return false;
    }

    event
        .paths
        .iter()
        .any(|path| ignore.map_or(true, |dir| !path.starts_with(dir)))
}

/// Hand-driven tick source.
#[derive(Debug, Clone)]
pub struct ManualClock {
    sender: broadcast::Sender<()>,
}

impl ManualClock {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Tick every source created from this clock.
    pub fn tick(&self) {
        let _ = self.sender.send(());
    }

    /// A new tick source following this clock.
    pub fn ticks(&self) -> Ticks {
        Ticks::Manual(self.sender.subscribe())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test(start_paused = true)]
    async fn first_interval_tick_waits_a_period() {
        let start = Instant::now();
        let mut ticks = Ticks::interval(Duration::from_secs(60));

        assert!(ticks.next().await);
        assert!(start.elapsed() >= Duration::from_secs(60));

        assert!(ticks.next().await);
        assert!(start.elapsed() >= Duration::from_secs(120));
    }

    #[tokio::test]
    async fn manual_clock_ticks_all_sources() {
        let clock = ManualClock::new();
        let mut a = clock.ticks();
        let mut b = clock.ticks();

        clock.tick();

        assert!(a.next().await);
        assert!(b.next().await);
    }

    #[tokio::test]
    async fn dropped_clock_ends_source() {
        let clock = ManualClock::new();
        let mut ticks = clock.ticks();
        drop(clock);

        assert!(!ticks.next().await);
    }

    #[tokio::test]
    async fn file_changes_tick() {
        let temp = tempdir().unwrap();
        let mut ticks = Ticks::events(temp.path(), None, Duration::from_secs(3600)).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(temp.path().join("post.md"), "# Created").unwrap();

        let tick = tokio::time::timeout(Duration::from_secs(3), ticks.next()).await;
        assert!(tick.is_ok(), "timeout waiting for file event tick");
        assert!(tick.unwrap());
    }

    #[test]
    fn ignores_events_under_mirror() {
        let event = |path: &str| {
            notify::Event::new(notify::EventKind::Create(notify::event::CreateKind::File))
                .add_path(PathBuf::from(path))
        };
        let mirror = Path::new("/site/generated_site");

        assert!(is_relevant(&event("/site/blog/a.md"), Some(mirror)));
        assert!(!is_relevant(&event("/site/generated_site/a.md/index.html"), Some(mirror)));
        assert!(is_relevant(&event("/site/generated_site/a.md"), None));

        let access = notify::Event::new(notify::EventKind::Access(
            notify::event::AccessKind::Any,
        ))
        .add_path(PathBuf::from("/site/blog/a.md"));
        assert!(!is_relevant(&access, None));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let temp = tempdir().unwrap();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();

        let result = Ticks::events(&temp.path().join("nope"), None, Duration::from_secs(1));

        assert!(matches!(result, Err(WatchError::Notify { .. })));
    }
}
