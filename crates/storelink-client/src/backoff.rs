//! Reconnect policy: capped exponential backoff with a retry ceiling

use std::time::Duration;
use storelink_core::SyncSettings;

/// Reconnect timing for the streaming connector
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use storelink_client::ReconnectPolicy;
///
/// let policy = ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(30), 5);
///
/// assert_eq!(policy.delay_for(1), Duration::from_secs(1));
/// assert_eq!(policy.delay_for(3), Duration::from_secs(4));
/// assert_eq!(policy.delay_for(6), Duration::from_secs(30));
/// assert!(policy.exhausted(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    max_retries: u32,
}

impl ReconnectPolicy {
    /// Create a policy
    ///
    /// # Arguments
    ///
    /// * `initial_delay` - Delay before the first retry
    /// * `max_delay` - Cap for the exponential growth
    /// * `max_retries` - Consecutive failures after which the connector gives up
    pub fn new(initial_delay: Duration, max_delay: Duration, max_retries: u32) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_retries,
        }
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// `min(initial * 2^(retry_count - 1), max)`
    ///
    /// `retry_count` is 1-based; 0 is treated as 1.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1).min(31);
        self.initial_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// The retry ceiling has been reached
    pub fn exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }
}

impl From<&SyncSettings> for ReconnectPolicy {
    fn from(settings: &SyncSettings) -> Self {
        Self::new(
            settings.initial_reconnect_delay(),
            settings.max_reconnect_delay(),
            settings.max_retries,
        )
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&SyncSettings::default())
    }
}
