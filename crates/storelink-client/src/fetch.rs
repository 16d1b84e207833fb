//! One-shot initial load of the store configuration
//!
//! Failure here is never fatal: it is recorded on the repository and the
//! stream may still populate it later.

use crate::api::ConfigSource;
use crate::repository::ConfigRepository;
use std::sync::Arc;

/// Loads the current configuration into the repository
#[derive(Clone)]
pub struct FetchStep {
    source: Arc<dyn ConfigSource>,
    repository: Arc<ConfigRepository>,
}

impl FetchStep {
    pub fn new(source: Arc<dyn ConfigSource>, repository: Arc<ConfigRepository>) -> Self {
        Self { source, repository }
    }

    /// Fetch once and write the outcome to the repository
    ///
    /// Never returns an error. Success replaces the snapshot; failure sets a
    /// human-readable error message.
    pub async fn fetch_initial(&self) {
        match self.source.fetch_config().await {
            Ok(config) => {
                tracing::info!("Initial store config loaded: {}", config.status_line());
                self.repository.set(config);
            }
            Err(e) => {
                tracing::warn!("Initial store config fetch failed: {}", e);
                self.repository
                    .set_error(Some(format!("Failed to load store status: {}", e)));
            }
        }
    }
}
