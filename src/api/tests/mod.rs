use super::*;
use crate::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use wiremock::MockServer;


/// Resolver whose delegates point at `server`
fn test_resolver(server: &MockServer, configure: impl FnOnce(&mut Config)) -> Resolver {
    let mut config = Config::default();
    config.resolver.timer_endpoint = format!("{}/timer", server.uri());
    config.resolver.direct_endpoint = format!("{}/direct", server.uri());
    configure(&mut config);
    Resolver::new(config).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_ok_and_version() {
    let server = MockServer::start().await;
    let app = create_router(test_resolver(&server, |_| {}));

    let response = app
        .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["activeBatches"], 0);
}

#[tokio::test]
async fn health_reflects_shutdown() {
    let server = MockServer::start().await;
    let resolver = test_resolver(&server, |_| {});
    resolver.shutdown().await;

    let response = create_router(resolver)
        .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(json_body(response).await["status"], "shutting_down");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let server = MockServer::start().await;
    let app = create_router(test_resolver(&server, |_| {}));

    let response = app
        .oneshot(
            Request::get("/api/v1/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await["paths"]["/api/v1/resolve"].is_object());
}

#[tokio::test]
async fn routes_live_under_api_v1_only() {
    let server = MockServer::start().await;
    let app = create_router(test_resolver(&server, |_| {}));

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_key_guards_every_route() {
    let server = MockServer::start().await;
    let app = create_router(test_resolver(&server, |c| {
        c.server.api.api_key = Some("k3y".into());
    }));

    let denied = app
        .clone()
        .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let allowed = app
        .oneshot(
            Request::get("/api/v1/health")
                .header("X-Api-Key", "k3y")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn cors_headers_follow_config() {
    let server = MockServer::start().await;
    let request = || {
        Request::get("/api/v1/health")
            .header("Origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap()
    };

    let enabled = create_router(test_resolver(&server, |_| {}))
        .oneshot(request())
        .await
        .unwrap();
    assert!(enabled.headers().contains_key("access-control-allow-origin"));

    let disabled = create_router(test_resolver(&server, |c| {
        c.server.api.cors_enabled = false;
    }))
    .oneshot(request())
    .await
    .unwrap();
    assert!(!disabled.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn serve_stops_on_shutdown_signal() {
    let server = MockServer::start().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(serve(
        listener,
        test_resolver(&server, |_| {}),
        async move {
            let _ = stop_rx.await;
        },
    ));

    stop_tx.send(()).unwrap();
    let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_ok());
}
