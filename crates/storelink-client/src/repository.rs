//! Observable cache of the last known store configuration
//!
//! The fetch step and the connector are the only writers. Everything else
//! subscribes and renders.

use chrono::Utc;
use storelink_core::{RepositoryState, StoreConfig};
use tokio::sync::watch;

/// Shared store-configuration cache backed by a `watch` channel
///
/// All operations are total. Every mutation notifies subscribers.
#[derive(Debug)]
pub struct ConfigRepository {
    state: watch::Sender<RepositoryState>,
}

impl ConfigRepository {
    /// Create an empty repository (no snapshot, disconnected, no error)
    pub fn new() -> Self {
        let (state, _) = watch::channel(RepositoryState::default());
        Self { state }
    }

    /// Current snapshot, `None` before the first successful fetch or message
    pub fn get(&self) -> Option<StoreConfig> {
        self.state.borrow().config.clone()
    }

    /// Full observable state
    pub fn snapshot(&self) -> RepositoryState {
        self.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Replace the snapshot wholesale and clear any stored error
    pub fn set(&self, config: StoreConfig) {
        self.state.send_modify(|state| {
            state.config = Some(config);
            state.error = None;
            state.last_updated = Some(Utc::now());
        });
    }

    /// Update the connection flag only
    pub fn set_connected(&self, connected: bool) {
        self.state.send_modify(|state| state.connected = connected);
    }

    /// Record an error/status message
    ///
    /// A non-null message also clears the connection flag: the repository never
    /// reports an error while flagged connected.
    pub fn set_error(&self, error: Option<String>) {
        self.state.send_modify(|state| {
            if error.is_some() {
                state.connected = false;
            }
            state.error = error;
        });
    }

    /// Drop back to the empty state
    pub fn reset(&self) {
        self.state.send_replace(RepositoryState::default());
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<RepositoryState> {
        self.state.subscribe()
    }
}

impl Default for ConfigRepository {
    fn default() -> Self {
        Self::new()
    }
}
