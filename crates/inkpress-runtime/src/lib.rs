//! Runtime for inkpress.
//!
//! Runs the initial generation pass for every configuration and keeps the
//! static snapshots fresh with one watcher task per configuration.

pub mod events;
pub mod startup;
pub mod ticks;
pub mod watcher;

pub use events::{WatchEvent, WatchEvents};
pub use startup::{plan, Coordinator, StartupError, Step, WatchSchedule, DEFAULT_INTERVAL};
pub use ticks::{ManualClock, Ticks};
pub use watcher::{WatchError, Watcher};
