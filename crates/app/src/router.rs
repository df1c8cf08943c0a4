use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    BoxError, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crm_storage::Database;

use crate::{addresses, customers, error::ApiError, telemetry};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    storage: Database,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, storage: Database, request_timeout: Duration) -> Self {
        Self {
            metrics,
            storage,
            request_timeout,
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn storage(&self) -> &Database {
        &self.storage
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

pub fn app_router(state: AppState) -> Router {
    let timeout = state.request_timeout();
    let routes = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/api/customers", get(customers::list).post(customers::create))
        .route(
            "/api/customers/:id",
            get(customers::get)
                .put(customers::update)
                .delete(customers::delete),
        )
        .route("/api/customers/:id/addresses", get(addresses::list_for_customer))
        .route("/api/customer/:id/addresses", post(addresses::create))
        .route(
            "/api/addresses/:address_id",
            get(addresses::get)
                .put(addresses::update)
                .delete(addresses::delete),
        );

    with_request_timeout(routes, timeout)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Aborts requests that run longer than `timeout` with a 408 error envelope.
fn with_request_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_middleware_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::Timeout
    } else {
        ApiError::Internal(format!("middleware error: {err}"))
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}
