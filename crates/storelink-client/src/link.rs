//! Pure state machine for the streaming link
//!
//! No I/O, no timers, no async. `transition(link, input, policy)` returns the
//! next link and the side effects the connector must perform, in order.
//!
//! Inputs that make no sense in the current phase (a failure after
//! `disconnect`, a reconnect timer after an explicit `connect`) produce no
//! actions and leave the link unchanged.

use crate::backoff::ReconnectPolicy;
use std::time::Duration;
use storelink_core::{ConnectionState, StoreConfig};

/// Status surfaced when a streamed payload cannot be decoded
pub const PARSE_ERROR_MESSAGE: &str = "Failed to parse server data";

/// Connector phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    /// Never connected
    Idle,
    /// Channel opened, waiting for `open`
    Connecting,
    /// Receiving updates
    Open,
    /// Channel failed, reconnect timer pending
    ReconnectScheduled,
    /// Retry ceiling reached; only an explicit connect leaves this phase
    GaveUp,
    /// Explicitly disconnected
    Closed,
}

/// Phase plus health counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub phase: LinkPhase,
    pub connection: ConnectionState,
}

impl Link {
    pub fn new(policy: &ReconnectPolicy) -> Self {
        Self {
            phase: LinkPhase::Idle,
            connection: ConnectionState::new(policy.initial_delay()),
        }
    }
}

/// Inputs driving the link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Open (or re-open) the stream
    Connect,
    /// Channel reported `open`
    Opened,
    /// Channel delivered a `message` payload
    Message(String),
    /// Channel reported `error`, or could not be created
    Failed(String),
    /// Backoff timer fired
    ReconnectDue,
    /// Tear everything down
    Disconnect,
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Close and detach the current channel, if any
    CloseChannel,
    /// Open a fresh channel
    OpenChannel,
    /// Cancel a pending reconnect timer, if any
    CancelReconnect,
    /// Arm a single reconnect timer
    ScheduleReconnect { delay: Duration },
    /// Replace the repository snapshot
    Publish(StoreConfig),
    /// Update the repository connection flag
    SetConnected(bool),
    /// Set or clear the repository status message
    ReportStatus(Option<String>),
}

/// Pure transition function
///
/// Deterministic and panic-free for every (phase, input) pair.
pub fn transition(link: Link, input: Input, policy: &ReconnectPolicy) -> (Link, Vec<Action>) {
    use LinkPhase::*;

    match (link.phase, input) {
        (_, Input::Disconnect) => (
            Link {
                phase: Closed,
                connection: ConnectionState::new(policy.initial_delay()),
            },
            vec![
                Action::CancelReconnect,
                Action::CloseChannel,
                Action::SetConnected(false),
            ],
        ),

        (phase, Input::Connect) => {
            let connection = match phase {
                // A fresh session starts a fresh failure episode
                Idle | Closed | GaveUp => ConnectionState::new(policy.initial_delay()),
                Connecting | Open | ReconnectScheduled => link.connection,
            };
            (
                Link {
                    phase: Connecting,
                    connection,
                },
                vec![
                    Action::CancelReconnect,
                    Action::CloseChannel,
                    Action::OpenChannel,
                ],
            )
        }

        (ReconnectScheduled, Input::ReconnectDue) => (
            Link {
                phase: Connecting,
                connection: link.connection,
            },
            vec![Action::OpenChannel],
        ),

        (Connecting | Open, Input::Opened) => (
            Link {
                phase: Open,
                connection: healthy(policy),
            },
            vec![Action::ReportStatus(None), Action::SetConnected(true)],
        ),

        (Connecting | Open, Input::Message(payload)) => {
            match serde_json::from_str::<StoreConfig>(&payload) {
                Ok(config) => (
                    Link {
                        phase: Open,
                        connection: healthy(policy),
                    },
                    vec![Action::Publish(config), Action::SetConnected(true)],
                ),
                // A single bad payload does not tear down the link
                Err(_) => (
                    link,
                    vec![Action::ReportStatus(Some(PARSE_ERROR_MESSAGE.to_string()))],
                ),
            }
        }

        (Connecting | Open, Input::Failed(reason)) => {
            let retry_count = link.connection.retry_count.saturating_add(1);
            let mut actions = vec![Action::CloseChannel, Action::SetConnected(false)];

            if policy.exhausted(retry_count) {
                actions.push(Action::ReportStatus(Some(gave_up_message(policy))));
                (
                    Link {
                        phase: GaveUp,
                        connection: ConnectionState {
                            connected: false,
                            last_error: Some(reason),
                            retry_count,
                            current_backoff: link.connection.current_backoff,
                        },
                    },
                    actions,
                )
            } else {
                let delay = policy.delay_for(retry_count);
                actions.push(Action::ReportStatus(Some(reconnecting_message(
                    delay,
                    retry_count,
                    policy,
                ))));
                actions.push(Action::ScheduleReconnect { delay });
                (
                    Link {
                        phase: ReconnectScheduled,
                        connection: ConnectionState {
                            connected: false,
                            last_error: Some(reason),
                            retry_count,
                            current_backoff: delay,
                        },
                    },
                    actions,
                )
            }
        }

        // Stale or out-of-phase input
        (_, _) => (link, Vec::new()),
    }
}

fn healthy(policy: &ReconnectPolicy) -> ConnectionState {
    ConnectionState {
        connected: true,
        ..ConnectionState::new(policy.initial_delay())
    }
}

/// Status shown while a reconnect is pending
pub fn reconnecting_message(delay: Duration, attempt: u32, policy: &ReconnectPolicy) -> String {
    let secs = delay.as_millis().div_ceil(1000);
    format!(
        "Connection lost. Reconnecting in {}s (attempt {}/{})...",
        secs,
        attempt,
        policy.max_retries()
    )
}

/// Terminal status once the retry ceiling is reached
pub fn gave_up_message(policy: &ReconnectPolicy) -> String {
    format!(
        "Unable to reach server after {} attempts; using cached data",
        policy.max_retries()
    )
}
