//! Shared storelink types
//!
//! These types are the contract between the REST fetch, the streaming
//! connector and anything observing the repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public shop status as stored on the server
///
/// Every field defaults when missing from a payload, so a snapshot held by the
/// repository is always fully defined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Shop is accepting customers
    pub is_shop_open: bool,
    /// Kitchen is actively cooking
    pub is_cooking: bool,
    /// Holiday closure in effect
    pub is_holiday: bool,
    pub holiday_message: String,
    /// Notice banner shown to customers
    pub is_notice_active: bool,
    pub notice_message: String,
    pub description: String,
    /// Status text derived server-side
    pub current_status_msg: String,
}

impl StoreConfig {
    /// One-line human summary of the snapshot
    pub fn status_line(&self) -> String {
        let mut parts = vec![if self.is_shop_open { "OPEN" } else { "CLOSED" }.to_string()];

        if self.is_cooking {
            parts.push("cooking".to_string());
        }
        if self.is_holiday {
            if self.holiday_message.is_empty() {
                parts.push("holiday".to_string());
            } else {
                parts.push(format!("holiday: {}", self.holiday_message));
            }
        }
        if self.is_notice_active && !self.notice_message.is_empty() {
            parts.push(format!("notice: {}", self.notice_message));
        }
        if !self.current_status_msg.is_empty() {
            parts.push(self.current_status_msg.clone());
        }

        parts.join(" | ")
    }
}

/// Partial update sent to the update endpoint
///
/// Absent fields are omitted from the request body and left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_shop_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_cooking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_holiday: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holiday_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_notice_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StoreConfigPatch {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Health of the streaming link
///
/// `connected == true` implies `retry_count == 0` and `last_error == None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub connected: bool,
    pub last_error: Option<String>,
    /// Consecutive failures in the current failure episode
    pub retry_count: u32,
    /// Most recently computed reconnect delay
    pub current_backoff: Duration,
}

impl ConnectionState {
    /// Fresh state with the backoff at its initial value
    pub fn new(initial_backoff: Duration) -> Self {
        Self {
            connected: false,
            last_error: None,
            retry_count: 0,
            current_backoff: initial_backoff,
        }
    }
}

/// What repository observers see
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryState {
    /// Last known snapshot, `None` until the first successful fetch or message
    pub config: Option<StoreConfig>,
    /// Live stream is connected
    pub connected: bool,
    /// Error or status text to surface to the user
    pub error: Option<String>,
    /// When the snapshot was last replaced
    pub last_updated: Option<DateTime<Utc>>,
}
