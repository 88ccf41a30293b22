//! HTTP surface: routing, status codes and error bodies

mod helpers;

use axum::body::Body;
use http::{Method, Request, StatusCode};
use cuedeck_remote::api::router;
use cuedeck_remote::Gateway;
use helpers::{attached_gateway, spawn_echo_host, spawn_silent_host};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const TIMEOUT: Duration = Duration::from_millis(5000);

async fn call(app: &axum::Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(path);
    let request = match body {
        Some(json_body) => builder
            .header("content-type", "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health_reports_attachment() {
    let app = router(Arc::new(Gateway::new(TIMEOUT)));
    let (status, body) = call(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "cuedeck-remote");
    assert_eq!(body["host_attached"], false);
}

#[tokio::test]
async fn test_every_route_without_host_is_503() {
    let app = router(Arc::new(Gateway::new(TIMEOUT)));
    let routes = [
        (Method::GET, "/v1/playlist", None),
        (Method::POST, "/v1/playlist/play", Some(json!({"id": "p"}))),
        (Method::GET, "/v1/playlist/playback", None),
        (Method::PUT, "/v1/playlist/playback/play", None),
        (Method::PUT, "/v1/playlist/playback/pause", None),
        (Method::POST, "/v1/playlist/playback/next", None),
        (Method::POST, "/v1/playlist/playback/previous", None),
        (Method::PUT, "/v1/playlist/playback/mute", Some(json!({"mute": true}))),
        (Method::PUT, "/v1/playlist/playback/volume", Some(json!({"volume": 0.5}))),
        (Method::PUT, "/v1/playlist/playback/shuffle", Some(json!({"shuffle": true}))),
        (Method::PUT, "/v1/playlist/playback/repeat", Some(json!({"repeat": "all"}))),
        (Method::GET, "/v1/collection", None),
        (Method::POST, "/v1/collection/play", Some(json!({"id": "s"}))),
        (Method::POST, "/v1/collection/stop", Some(json!({"id": "s"}))),
        (Method::GET, "/v1/collection/playback", None),
    ];

    for (method, path, body) in routes {
        let (status, body) = call(&app, method, path, body).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", path);
        assert_eq!(
            body,
            json!({
                "statusCode": 503,
                "error": "Service Unavailable",
                "message": "Unable to connect to the playback host"
            })
        );
    }
}

#[tokio::test]
async fn test_routes_map_to_request_kinds() {
    let (gateway, endpoint) = attached_gateway(TIMEOUT);
    let _host = spawn_echo_host(endpoint);
    let app = router(gateway);

    let cases = [
        (Method::GET, "/v1/playlist", None, "playlist-get-all"),
        (Method::POST, "/v1/playlist/play", Some(json!({"id": "t1"})), "playlist-play"),
        (Method::GET, "/v1/playlist/playback", None, "playlist-playback-request"),
        (Method::PUT, "/v1/playlist/playback/play", None, "playlist-playback-play"),
        (Method::PUT, "/v1/playlist/playback/pause", None, "playlist-playback-pause"),
        (Method::POST, "/v1/playlist/playback/next", None, "playlist-playback-next"),
        (Method::POST, "/v1/playlist/playback/previous", None, "playlist-playback-previous"),
        (Method::PUT, "/v1/playlist/playback/mute", Some(json!({"mute": false})), "playlist-playback-mute"),
        (Method::PUT, "/v1/playlist/playback/volume", Some(json!({"volume": 0.2})), "playlist-playback-volume"),
        (Method::PUT, "/v1/playlist/playback/shuffle", Some(json!({"shuffle": false})), "playlist-playback-shuffle"),
        (Method::PUT, "/v1/playlist/playback/repeat", Some(json!({"repeat": "one"})), "playlist-playback-repeat"),
        (Method::GET, "/v1/collection", None, "soundboard-get-all"),
        (Method::POST, "/v1/collection/play", Some(json!({"id": "c1"})), "soundboard-play"),
        (Method::POST, "/v1/collection/stop", Some(json!({"id": "c1"})), "soundboard-stop"),
        (Method::GET, "/v1/collection/playback", None, "soundboard-playback-request"),
    ];

    for (method, path, body, kind) in cases {
        let (status, body) = call(&app, method, path, body).await;
        assert_eq!(status, StatusCode::OK, "{}", path);
        assert_eq!(body["kind"], kind, "{}", path);
    }
}

#[tokio::test(start_paused = true)]
async fn test_silent_host_yields_408_body() {
    let (gateway, endpoint) = attached_gateway(TIMEOUT);
    let _host = spawn_silent_host(endpoint);
    let app = router(gateway);

    let (status, body) = call(&app, Method::GET, "/v1/collection/playback", None).await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(
        body,
        json!({"statusCode": 408, "error": "Request Timeout", "message": "Request Timeout"})
    );
}

#[tokio::test]
async fn test_malformed_body_is_rejected_before_gateway() {
    let gateway = Arc::new(Gateway::new(TIMEOUT));
    let app = router(Arc::clone(&gateway));

    let (status, _) = call(&app, Method::POST, "/v1/collection/play", Some(json!({"name": "x"}))).await;
    assert!(status.is_client_error());
    assert_ne!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = call(&app, Method::PUT, "/v1/playlist/playback/repeat", Some(json!({"repeat": "sometimes"}))).await;
    assert!(status.is_client_error());
    assert_ne!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(gateway.pending_count(), 0);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = router(Arc::new(Gateway::new(TIMEOUT)));
    let (status, _) = call(&app, Method::GET, "/v1/scenes", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
