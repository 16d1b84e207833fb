//! Credential storage for authenticated requests
//!
//! The persisted-credential store lives outside this crate. `TokenStore` is the
//! seam; `MemoryTokenStore` covers the CLI and tests.

use std::env;
use std::sync::RwLock;

const TOKEN_ENV: &str = "STORELINK_TOKEN";

/// Bearer token holder
pub trait TokenStore: Send + Sync {
    /// Current token, if logged in
    fn token(&self) -> Option<String>;

    /// Replace the stored token
    fn store(&self, token: String);

    /// Forget the token (logout or expired session)
    fn clear(&self);
}

/// In-process token store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Seed from `STORELINK_TOKEN` when set
    pub fn from_env() -> Self {
        match env::var(TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => {
                tracing::info!("Using bearer token from {}", TOKEN_ENV);
                Self::with_token(token.trim())
            }
            _ => Self::new(),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn store(&self, token: String) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token);
        }
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}
