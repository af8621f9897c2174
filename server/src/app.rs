//! HTTP application wiring (axum router + shared state).

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;

use atm_ledger::Ledger;

use crate::metrics::{Metrics, SharedMetrics};
use crate::routes;

/// State shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub metrics: SharedMetrics,
}

impl AppState {
    /// Create state around an existing ledger with fresh metrics.
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(ledger),
            metrics: Arc::new(Metrics::new()),
        }
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .route("/accounts/:account_number/balance", get(routes::get_balance))
        .route("/accounts/:account_number/deposit", post(routes::deposit))
        .route("/accounts/:account_number/withdraw", post(routes::withdraw))
        .layer(middleware::from_fn_with_state(state.clone(), count_requests))
        .with_state(state)
}

async fn count_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.metrics.request_received();
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use atm_ledger::LockGranularity;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;

    fn app() -> (Router, AppState) {
        let state = AppState::new(Ledger::with_seed_accounts(LockGranularity::Global).unwrap());
        (build_app(state.clone()), state)
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut request = axum::http::Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let (status, body) = send(app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "message": "ok" }));
    }

    #[tokio::test]
    async fn test_malformed_json_is_missing_body() {
        let (app, _) = app();
        let (status, body) =
            send(app, Method::POST, "/accounts/1001/deposit", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "MISSING_BODY");
        assert_eq!(body["detail"], "Missing JSON body");
    }

    #[tokio::test]
    async fn test_requests_are_counted() {
        let (app, state) = app();
        send(app.clone(), Method::GET, "/health", None).await;
        send(app, Method::GET, "/accounts/12a3/balance", None).await;

        let snapshot = state.metrics.snapshot();
        assert_eq!(snapshot.requests_total, 2);
        assert_eq!(snapshot.rejections_for("INVALID_ACCOUNT_NUMBER"), 1);
    }
}
