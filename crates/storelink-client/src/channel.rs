//! Server-push channel seam and its HTTP implementation
//!
//! A channel reports `open`, `message` and `error` into the connector's inbox
//! through a `ChannelSink`. Every sink carries the generation of the channel
//! it belongs to; the connector drops events from any other generation, which
//! detaches a closed channel even if its task has already queued events.

use crate::api::ApiClient;
use crate::auth::TokenStore;
use crate::connector::ConnectorEvent;
use crate::sse::SseParser;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use std::sync::Arc;
use storelink_core::{Result, StoreLinkError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Events a channel reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Open,
    /// Raw `data` of a `message` event
    Message(String),
    /// Transport failure, including a server-side close
    Error(String),
}

/// Where a channel delivers its events
#[derive(Debug, Clone)]
pub struct ChannelSink {
    generation: u64,
    inbox: mpsc::UnboundedSender<ConnectorEvent>,
}

impl ChannelSink {
    pub fn new(generation: u64, inbox: mpsc::UnboundedSender<ConnectorEvent>) -> Self {
        Self { generation, inbox }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver an event; `false` once the connector is gone
    pub fn emit(&self, event: ChannelEvent) -> bool {
        self.inbox
            .send(ConnectorEvent::Channel {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// An open server-push channel
pub trait EventChannel: Send {
    /// Stop delivering events and release the connection
    fn close(&mut self);
}

/// Opens channels for the connector
pub trait ChannelFactory: Send + Sync {
    fn open(&self, sink: ChannelSink) -> Result<Box<dyn EventChannel>>;
}

/// SSE over HTTP using `reqwest`
#[derive(Clone)]
pub struct HttpChannelFactory {
    http: reqwest::Client,
    url: String,
    tokens: Arc<dyn TokenStore>,
}

impl HttpChannelFactory {
    pub fn new(http: reqwest::Client, url: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            http,
            url: url.into(),
            tokens,
        }
    }

    /// Stream endpoint and credentials of an existing API client
    pub fn from_client(client: &ApiClient) -> Self {
        Self::new(
            client.http(),
            client.settings().stream_url(),
            client.tokens(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChannelFactory for HttpChannelFactory {
    fn open(&self, sink: ChannelSink) -> Result<Box<dyn EventChannel>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| StoreLinkError::Channel(format!("no async runtime: {}", e)))?;

        let mut request = self
            .http
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(token) = self.tokens.token() {
            request = request.bearer_auth(token);
        }

        tracing::info!("Connecting to SSE: {}", self.url);
        let task = runtime.spawn(read_stream(request, sink));
        Ok(Box::new(HttpChannel { task }))
    }
}

struct HttpChannel {
    task: JoinHandle<()>,
}

impl EventChannel for HttpChannel {
    fn close(&mut self) {
        self.task.abort();
    }
}

impl Drop for HttpChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn read_stream(request: reqwest::RequestBuilder, sink: ChannelSink) {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            sink.emit(ChannelEvent::Error(format!("request failed: {}", e)));
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        sink.emit(ChannelEvent::Error(format!("server responded {}", status)));
        return;
    }

    if !sink.emit(ChannelEvent::Open) {
        return;
    }

    let mut parser = SseParser::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                sink.emit(ChannelEvent::Error(format!("stream error: {}", e)));
                return;
            }
        };

        for frame in parser.push(&bytes) {
            if !frame.is_message() {
                tracing::debug!("Ignoring SSE event '{}'", frame.event.unwrap_or_default());
                continue;
            }
            if !sink.emit(ChannelEvent::Message(frame.data)) {
                return;
            }
        }
    }

    sink.emit(ChannelEvent::Error("stream closed by server".to_string()));
}
