//! In-process store-config server for integration tests

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{
        header::{ACCEPT, AUTHORIZATION},
        HeaderMap, StatusCode,
    },
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use storelink_core::{StoreConfig, StoreConfigPatch};

pub const TOKEN: &str = "owner-token";

/// Knobs and counters shared with the handlers
#[derive(Default)]
pub struct ServerState {
    pub config: Mutex<StoreConfig>,
    pub fail_fetch: AtomicBool,
    pub malformed_fetch: AtomicBool,
    /// The first N streams end right after their first event
    pub close_streams: AtomicUsize,
    pub stream_hits: AtomicUsize,
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<ServerState>,
}

impl TestServer {
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn stream_hits(&self) -> usize {
        self.state.stream_hits.load(Ordering::SeqCst)
    }
}

/// Bind on an ephemeral port and serve until the test runtime ends
pub async fn spawn_server(config: StoreConfig) -> TestServer {
    let state = Arc::new(ServerState {
        config: Mutex::new(config),
        ..Default::default()
    });

    let app = Router::new()
        .route("/api/store-config", get(get_config).put(put_config))
        .route("/api/store-config/sse", get(stream_config))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, state }
}

async fn get_config(State(state): State<Arc<ServerState>>) -> Response {
    if state.fail_fetch.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "message": "Database unavailable" })),
        )
            .into_response();
    }
    if state.malformed_fetch.load(Ordering::SeqCst) {
        return (StatusCode::OK, "<html>maintenance</html>").into_response();
    }

    let config = state.config.lock().unwrap().clone();
    Json(config).into_response()
}

async fn put_config(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(patch): Json<StoreConfigPatch>,
) -> Response {
    let expected = format!("Bearer {}", TOKEN);
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "message": "Missing token" })),
            )
                .into_response()
        }
        Some(value) if value != expected => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "message": "Invalid token" })),
            )
                .into_response()
        }
        Some(_) => {}
    }

    let updated = {
        let mut config = state.config.lock().unwrap();
        if let Some(v) = patch.is_shop_open {
            config.is_shop_open = v;
        }
        if let Some(v) = patch.is_cooking {
            config.is_cooking = v;
        }
        if let Some(v) = patch.is_holiday {
            config.is_holiday = v;
        }
        if let Some(v) = patch.holiday_message {
            config.holiday_message = v;
        }
        if let Some(v) = patch.is_notice_active {
            config.is_notice_active = v;
        }
        if let Some(v) = patch.notice_message {
            config.notice_message = v;
        }
        if let Some(v) = patch.description {
            config.description = v;
        }
        config.clone()
    };

    Json(updated).into_response()
}

async fn stream_config(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let accepts_sse = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/event-stream"));
    if !accepts_sse {
        return StatusCode::NOT_ACCEPTABLE.into_response();
    }

    let hit = state.stream_hits.fetch_add(1, Ordering::SeqCst) + 1;
    let close = hit <= state.close_streams.load(Ordering::SeqCst);
    let payload = serde_json::to_string(&state.config.lock().unwrap().clone()).unwrap();

    let stream = async_stream::stream! {
        yield Ok::<Event, Infallible>(Event::default().data(payload));
        if !close {
            futures::future::pending::<()>().await;
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}
