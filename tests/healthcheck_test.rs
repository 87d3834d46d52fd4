use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use rask_otlp_gateway::app::main_router;
use rask_otlp_gateway::otlp::OTLPState;
use rask_otlp_gateway::test_support::MockSink;
use tokio::time::sleep;

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_healthcheck_succeeds_against_gateway_router() {
    let port = free_port();
    let server = tokio::spawn(async move {
        let app = main_router(OTLPState::new(Arc::new(MockSink::new()), "otlp.health"));
        let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}"))
            .await
            .unwrap();
        axum::serve(listener, app).await.unwrap();
    });
    sleep(Duration::from_millis(100)).await;

    let result = rask_otlp_gateway::healthcheck_with_port(port).await;
    assert!(result.is_ok(), "healthcheck failed: {result:?}");

    server.abort();
}

#[tokio::test]
async fn test_healthcheck_fails_when_nothing_listens() {
    let port = free_port();
    assert!(rask_otlp_gateway::healthcheck_with_port(port).await.is_err());
}

#[tokio::test]
async fn test_healthcheck_fails_on_non_success_status() {
    let port = free_port();
    let server = tokio::spawn(async move {
        let app = axum::Router::new().route(
            "/v1/health",
            axum::routing::get(|| async {
                (axum::http::StatusCode::SERVICE_UNAVAILABLE, "Unhealthy")
            }),
        );
        let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}"))
            .await
            .unwrap();
        axum::serve(listener, app).await.unwrap();
    });
    sleep(Duration::from_millis(100)).await;

    assert!(rask_otlp_gateway::healthcheck_with_port(port).await.is_err());

    server.abort();
}
