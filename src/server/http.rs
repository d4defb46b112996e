//! HTTP routes
//!
//! `GET /udp/{addr}` resolves (or creates) the hub for `addr` with the
//! configured interface list and streams its datagrams as a chunked
//! response. `GET /status` reports every registered hub.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::Error;
use crate::hub::{Hub, HubRegistry, HubStatus};
use crate::session::{ChannelSink, OnActive, StreamSession};

/// Shared state for the relay routes
#[derive(Clone)]
pub struct RelayState {
    registry: Arc<HubRegistry>,
    interfaces: Vec<String>,
    content_type: String,
}

impl RelayState {
    /// State serving MPEG-TS from the given registry
    pub fn new(registry: Arc<HubRegistry>) -> Self {
        Self {
            registry,
            interfaces: Vec::new(),
            content_type: "video/mp2t".to_string(),
        }
    }

    /// Interfaces to join multicast groups on, in preference order
    pub fn interfaces(mut self, interfaces: Vec<String>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Content type sent to subscribers
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// The registry behind this state
    pub fn registry(&self) -> &Arc<HubRegistry> {
        &self.registry
    }
}

/// Build the relay router
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/udp/:addr", get(serve_stream))
        .route("/status", get(serve_status))
        .with_state(state)
}

async fn serve_stream(Path(addr): Path<String>, State(state): State<RelayState>) -> Response {
    let hub = match state.registry.get_or_create(&addr, &state.interfaces).await {
        Ok(hub) => hub,
        Err(e @ Error::AddressResolution { .. }) => {
            tracing::warn!(addr = %addr, error = %e, "rejecting stream request");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "source bind failed");
            return (StatusCode::BAD_GATEWAY, e.to_string()).into_response();
        }
    };

    stream_response(&hub, &state.content_type, None)
}

/// Subscribe to `hub` and build the streaming response.
///
/// Answers 503 when the hub has already shut down (the next request will
/// construct a fresh one) and 500 when the streaming response cannot be
/// built. The delivery session runs detached and deregisters itself on any
/// exit.
pub fn stream_response(hub: &Hub, content_type: &str, on_active: Option<OnActive>) -> Response {
    let Some(subscription) = hub.subscribe() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "stream hub closed").into_response();
    };

    let (sink, body_rx) = ChannelSink::new();
    tokio::spawn(StreamSession::new(subscription, sink, on_active).run());

    let built = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache, no-store")
        .body(Body::from_stream(ReceiverStream::new(body_rx)));

    match built {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(hub = %hub.key(), error = %e, "failed to build streaming response");
            (StatusCode::INTERNAL_SERVER_ERROR, "streaming unsupported").into_response()
        }
    }
}

/// Body of `GET /status`
#[derive(Debug, Serialize)]
pub struct RelayStatus {
    /// Every registered hub
    pub hubs: Vec<HubStatus>,
}

async fn serve_status(State(state): State<RelayState>) -> Json<RelayStatus> {
    Json(RelayStatus {
        hubs: state.registry.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_response_on_closed_hub_is_503() {
        let registry = HubRegistry::new();
        let hub = registry.get_or_create("127.0.0.1:0", &[]).await.unwrap();
        hub.close();

        let response = stream_response(&hub, "video/mp2t", None);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_stream_response_sets_content_type() {
        let registry = HubRegistry::new();
        let hub = registry.get_or_create("127.0.0.1:0", &[]).await.unwrap();

        let response = stream_response(&hub, "video/mp2t", None);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "video/mp2t"
        );
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
    }

    #[tokio::test]
    async fn test_invalid_content_type_is_500() {
        let registry = HubRegistry::new();
        let hub = registry.get_or_create("127.0.0.1:0", &[]).await.unwrap();

        let response = stream_response(&hub, "video/\nmp2t", None);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
