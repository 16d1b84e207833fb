//! # storelink-core
//!
//! Core types for the storelink live store-configuration client.
//!
//! The shop's public status (open/closed, cooking, holiday and notice banners)
//! lives on the server. Clients load it once over REST and then follow it over
//! a server-sent-events stream. This crate holds the pieces every layer shares:
//!
//! - `StoreConfig` / `StoreConfigPatch`: the synchronized snapshot and its partial update
//! - `ConnectionState`: health of the streaming link
//! - `StoreLinkError`: the unified error type
//! - `StoreLinkConfig`: file and environment configuration

pub mod config;
mod error;
mod types;

pub use config::{ApiSettings, Environment, StoreLinkConfig, SyncSettings};
pub use error::{Result, StoreLinkError};
pub use types::*;
