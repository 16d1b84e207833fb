//! REST client for the store-configuration endpoints
//!
//! Thin JSON wrapper: bearer auth from the token store, uniform mapping of
//! non-2xx responses onto `StoreLinkError`.

use crate::auth::TokenStore;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use storelink_core::{ApiSettings, Result, StoreConfig, StoreConfigPatch, StoreLinkError};

/// Anything that can produce the current store configuration
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch_config(&self) -> Result<StoreConfig>;
}

/// JSON client for `<base>/store-config`
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    settings: ApiSettings,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a client for the given endpoint settings
    pub fn new(settings: ApiSettings, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        // No client-wide timeout: the same client may carry the long-lived stream
        let http = reqwest::Client::builder()
            .connect_timeout(settings.request_timeout())
            .build()
            .map_err(|e| StoreLinkError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            settings,
            tokens,
        })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    pub fn tokens(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.tokens)
    }

    /// Underlying HTTP client, shared with the stream channel
    pub fn http(&self) -> reqwest::Client {
        self.http.clone()
    }

    /// `GET <base>/store-config`
    pub async fn get_config(&self) -> Result<StoreConfig> {
        let url = self.settings.config_url();
        tracing::debug!("GET {}", url);

        let response = self
            .authorize(self.http.get(&url))
            .timeout(self.settings.request_timeout())
            .send()
            .await
            .map_err(|e| StoreLinkError::Http(format!("GET {} failed: {}", url, e)))?;

        tracing::debug!("GET {} - Status: {}", url, response.status());
        self.handle_response(response).await
    }

    /// `PUT <base>/store-config` with a partial update; returns the server's full snapshot
    pub async fn update_config(&self, patch: &StoreConfigPatch) -> Result<StoreConfig> {
        let url = self.settings.config_url();
        tracing::debug!("PUT {}", url);

        if self.tokens.token().is_none() {
            tracing::warn!("Updating store config without a bearer token");
        }

        let response = self
            .authorize(self.http.put(&url))
            .timeout(self.settings.request_timeout())
            .json(patch)
            .send()
            .await
            .map_err(|e| StoreLinkError::Http(format!("PUT {} failed: {}", url, e)))?;

        tracing::debug!("PUT {} - Status: {}", url, response.status());
        self.handle_response(response).await
    }

    /// Attach the bearer header when a token is held
    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreLinkError::Http(format!("Failed to read response body: {}", e)))?;

        if status == StatusCode::UNAUTHORIZED {
            // Only an expired session if we were actually logged in
            if self.tokens.token().is_some() {
                tracing::warn!("401 Unauthorized - session expired, clearing token");
                self.tokens.clear();
                return Err(StoreLinkError::SessionExpired);
            }
            return Err(StoreLinkError::Unauthorized(
                server_message(&body).unwrap_or_else(|| "Invalid credentials".to_string()),
            ));
        }

        if !status.is_success() {
            let message = server_message(&body).unwrap_or_else(|| {
                format!(
                    "API Error: {}",
                    status.canonical_reason().unwrap_or(status.as_str())
                )
            });
            return Err(StoreLinkError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| StoreLinkError::Parse(format!("Malformed response body: {}", e)))
    }
}

#[async_trait]
impl ConfigSource for ApiClient {
    async fn fetch_config(&self) -> Result<StoreConfig> {
        self.get_config().await
    }
}

/// `message` field of a JSON error body, if any
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
