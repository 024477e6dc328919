//! Outcomes of watcher passes.

use serde::Serialize;
use tokio::sync::broadcast;

/// Outcome of one watcher pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchEvent {
    /// Sources changed and the snapshot was rebuilt
    Regenerated {
        /// Path scope of the configuration
        scope: String,
        /// Documents indexed
        pages: usize,
        /// Pass duration in milliseconds
        duration_ms: u64,
    },

    /// Nothing changed since the last pass
    Unchanged {
        /// Path scope of the configuration
        scope: String,
    },

    /// The pass failed; the previous snapshot is still published
    Failed {
        /// Path scope of the configuration
        scope: String,
        /// Error message
        error: String,
    },
}

impl WatchEvent {
    /// Path scope the event belongs to.
    pub fn scope(&self) -> &str {
        match self {
            Self::Regenerated { scope, .. }
            | Self::Unchanged { scope }
            | Self::Failed { scope, .. } => scope,
        }
    }
}

/// Hub broadcasting watcher outcomes to every subscriber.
#[derive(Debug, Clone)]
pub struct WatchEvents {
    sender: broadcast::Sender<WatchEvent>,
}

impl WatchEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send an event to all subscribers.
    pub fn send(&self, event: WatchEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for WatchEvents {
    fn default() -> Self {
        Self::new()
    }
}
