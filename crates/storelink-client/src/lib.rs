//! # storelink-client
//!
//! Fetch-then-stream synchronization of the shop's public configuration.
//!
//! ## Flow
//!
//! ```text
//! LiveConfigController::start()
//!   ├─ FetchStep ── GET /store-config ──────────────▶ ConfigRepository
//!   └─ (startup delay) ─▶ StreamConnector
//!                          ├─ GET /store-config/sse ─▶ ConfigRepository
//!                          └─ error ─▶ backoff timer ─▶ reconnect … give up
//! ```
//!
//! The repository is the only shared state. The fetch step and the connector
//! write to it; everything else subscribes. No failure in this crate is
//! surfaced as an error to the caller; it becomes repository state instead.
//!
//! The connector's decisions live in [`link::transition`], a pure function
//! that can be exercised without any network or timer.

mod api;
mod auth;
mod backoff;
mod channel;
mod connector;
mod fetch;
mod lifecycle;
pub mod link;
mod repository;
pub mod sse;
mod timer;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ConfigSource};
pub use auth::{MemoryTokenStore, TokenStore};
pub use backoff::ReconnectPolicy;
pub use channel::{ChannelEvent, ChannelFactory, ChannelSink, EventChannel, HttpChannelFactory};
pub use connector::{ConnectorEvent, ConnectorHandle, StreamConnector};
pub use fetch::FetchStep;
pub use lifecycle::LiveConfigController;
pub use link::{Link, LinkPhase};
pub use repository::ConfigRepository;
pub use timer::TimerHandle;
