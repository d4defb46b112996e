//! HTTP surface tests
//!
//! Drives the relay router directly with `tower::ServiceExt::oneshot` and
//! reads streaming bodies frame by frame.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use bytes::Bytes;
use http_body_util::BodyExt;
use tower::ServiceExt;
use udpfan::{router, HubRegistry, RelayState};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_status_starts_empty() {
    let app = router(RelayState::new(HubRegistry::new()));

    let response = app.oneshot(get("/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let status: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status["hubs"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_unresolvable_address_is_rejected() {
    let app = router(RelayState::new(HubRegistry::new()));

    let response = app.oneshot(get("/udp/not-an-address")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stream_request_relays_datagrams() {
    let registry = HubRegistry::new();
    let app = router(RelayState::new(registry.clone()).content_type("video/mp2t"));

    let response = app
        .clone()
        .oneshot(get("/udp/127.0.0.1:0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/mp2t"
    );
    assert!(response.headers().get(header::CONTENT_LENGTH).is_none());

    // Wait until the session's queue is registered, then feed the source.
    let mut source_addr: Option<SocketAddr> = None;
    for _ in 0..400 {
        let snapshot = registry.snapshot();
        if let Some(hub) = snapshot.first() {
            if hub.subscribers == 1 {
                source_addr = hub.local_addr.as_ref().map(|a| a.parse().unwrap());
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let source_addr = source_addr.expect("hub never registered the subscriber");

    let feeder = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    feeder.send_to(b"ts-payload", source_addr).await.unwrap();

    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
        .await
        .expect("no body frame within timeout")
        .unwrap()
        .unwrap();
    let chunk = frame.into_data().unwrap();
    assert_eq!(chunk, Bytes::from_static(b"ts-payload"));
}

#[tokio::test]
async fn test_status_reports_active_stream() {
    let registry = HubRegistry::new();
    let app = router(RelayState::new(registry.clone()));

    let _stream = app
        .clone()
        .oneshot(get("/udp/127.0.0.1:0"))
        .await
        .unwrap();

    for _ in 0..400 {
        if registry.snapshot().first().is_some_and(|h| h.subscribers == 1) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let response = app.oneshot(get("/status")).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let status: serde_json::Value = serde_json::from_slice(&body).unwrap();

    let hubs = status["hubs"].as_array().unwrap();
    assert_eq!(hubs.len(), 1);
    assert_eq!(hubs[0]["key"], "127.0.0.1:0|");
    assert_eq!(hubs[0]["subscribers"], 1);
    assert_eq!(hubs[0]["closed"], false);
}

#[tokio::test]
async fn test_viewer_disconnect_tears_the_hub_down() {
    let registry = HubRegistry::new();
    let app = router(RelayState::new(registry.clone()));

    let response = app.oneshot(get("/udp/127.0.0.1:0")).await.unwrap();
    for _ in 0..400 {
        if registry.snapshot().first().is_some_and(|h| h.subscribers == 1) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Dropping the response drops the body; the session notices and
    // deregisters, and the empty hub shuts itself down.
    drop(response);

    for _ in 0..400 {
        if registry.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("hub survived its last viewer");
}
