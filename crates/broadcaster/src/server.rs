use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::metrics;
use crate::state::{BroadcastStatus, SelectedTicker, StatusReport};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ticker: String,
    #[serde(flatten)]
    pub broadcast: StatusReport,
}

/// Shared state for health endpoints
#[derive(Clone)]
pub struct ServerState {
    pub selected: SelectedTicker,
    pub status: Arc<BroadcastStatus>,
}

impl ServerState {
    pub fn new(selected: SelectedTicker, status: Arc<BroadcastStatus>) -> Self {
        Self { selected, status }
    }

    fn response(&self, status: &'static str) -> HealthResponse {
        HealthResponse {
            status,
            ticker: self.selected.get().to_string(),
            broadcast: self.status.report(),
        }
    }
}

/// Health endpoint - always returns 200 if server is running
async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(state.response("ok"))
}

/// Ready endpoint - returns 200 once a snapshot has been published
async fn ready(State(state): State<ServerState>) -> (StatusCode, Json<HealthResponse>) {
    if state.status.has_sent() {
        (StatusCode::OK, Json(state.response("ready")))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(state.response("not_ready")),
        )
    }
}

/// Prometheus text exposition
async fn metrics_handler() -> impl IntoResponse {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            e.to_string(),
        ),
    }
}

/// Create the health server router
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Run the health server until `shutdown` is cancelled
pub async fn run_server(
    addr: SocketAddr,
    state: ServerState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let app = create_router(state);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tickercast_protocol::Ticker;
    use tower::ServiceExt;

    fn create_test_state(sent: bool) -> ServerState {
        let status = Arc::new(BroadcastStatus::new());
        if sent {
            status.mark_cycling();
            status.record_sent();
        }
        ServerState::new(SelectedTicker::new(Ticker::parse("AAPL").unwrap()), status)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let app = create_router(create_test_state(false));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["ticker"], "AAPL");
        assert_eq!(json["state"], "idle");
    }

    #[tokio::test]
    async fn test_ready_after_first_send() {
        let app = create_router(create_test_state(true));

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["state"], "cycling");
        assert_eq!(json["ticks_sent"], 1);
    }

    #[tokio::test]
    async fn test_not_ready_before_first_send() {
        let app = create_router(create_test_state(false));

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_reflects_selection() {
        let state = create_test_state(false);
        state.selected.set(Ticker::parse("TSLA").unwrap());
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(body_json(response).await["ticker"], "TSLA");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        metrics::inc_tick("sent");
        let app = create_router(create_test_state(true));

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("tickercast_ticks_total"));
    }
}
