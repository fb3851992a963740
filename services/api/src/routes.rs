use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use job_tracker::accounts::{account_router, AccountRepository, AccountService, ResetTokenDelivery};
use job_tracker::jobs::{job_router, JobApplicationService, JobRepository};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_routes<J, R, D>(
    jobs: Arc<JobApplicationService<J>>,
    accounts: Arc<AccountService<R, D>>,
) -> axum::Router
where
    J: JobRepository + 'static,
    R: AccountRepository + 'static,
    D: ResetTokenDelivery + 'static,
{
    job_router(jobs)
        .merge(account_router(accounts))
        .route("/", axum::routing::get(banner))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn banner() -> &'static str {
    "Student Job Tracker API is running"
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
