pub mod payload;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::{AppState, BrokerRegistry};

/// Path observed in the wild: the obscure suffix is the only authentication
/// on the endpoint.
pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook529376sdgf";

/// Build the Axum application router.
pub fn build_router(state: Arc<AppState>, webhook_path: &str) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        .route(webhook_path, post(routes::webhook))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the webhook server.
pub async fn start_server(
    state: Arc<AppState>,
    bind_addr: &str,
    webhook_path: &str,
) -> anyhow::Result<()> {
    let app = build_router(state, webhook_path);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Webhook server listening on {}{}", bind_addr, webhook_path);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use relaybot_brokers_common::{SimulatedBroker, SimulatedBrokerConfig};
    use tower::ServiceExt;

    fn test_router(broker: Arc<SimulatedBroker>) -> Router {
        let state = Arc::new(AppState::new(BrokerRegistry::new().register("M", broker)));
        build_router(state, DEFAULT_WEBHOOK_PATH)
    }

    async fn post_payload(router: Router, body: &str) -> StatusCode {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(DEFAULT_WEBHOOK_PATH)
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn webhook_acknowledges_valid_payload() {
        let broker = Arc::new(SimulatedBroker::new(SimulatedBrokerConfig::default()));
        let status = post_payload(test_router(broker), "EURUSD\nbuy\nM").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn webhook_acknowledges_malformed_payload_without_broker_calls() {
        let broker = Arc::new(SimulatedBroker::new(SimulatedBrokerConfig::default()));
        let status = post_payload(test_router(broker.clone()), "EURUSD").await;

        // Fire-and-forget contract: the caller still gets a 200, the error
        // lives in the logs, and no order path was touched.
        assert_eq!(status, StatusCode::OK);
        assert!(broker.actions().is_empty());
    }

    #[tokio::test]
    async fn webhook_acknowledges_unknown_broker_without_broker_calls() {
        let broker = Arc::new(SimulatedBroker::new(SimulatedBrokerConfig::default()));
        let status = post_payload(test_router(broker.clone()), "EURUSD\nbuy\nX").await;

        assert_eq!(status, StatusCode::OK);
        assert!(broker.actions().is_empty());
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let broker = Arc::new(SimulatedBroker::new(SimulatedBrokerConfig::default()));
        let response = test_router(broker)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
