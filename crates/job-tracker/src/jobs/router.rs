use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::error;

use super::domain::{JobId, JobPatch, JobSubmission};
use super::query::JobListParams;
use super::repository::{JobRepository, RepositoryError};
use super::service::{JobApplicationService, JobServiceError};

/// Router builder exposing the job CRUD endpoints.
pub fn job_router<R>(service: Arc<JobApplicationService<R>>) -> Router
where
    R: JobRepository + 'static,
{
    Router::new()
        .route(
            "/api/jobs",
            get(list_handler::<R>).post(create_handler::<R>),
        )
        .route(
            "/api/jobs/:id",
            get(get_handler::<R>)
                .put(update_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<JobApplicationService<R>>>,
    Query(params): Query<JobListParams>,
) -> Response
where
    R: JobRepository + 'static,
{
    match service.list(&params) {
        Ok(jobs) => (StatusCode::OK, Json(jobs)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<R>(
    State(service): State<Arc<JobApplicationService<R>>>,
    Path(id): Path<String>,
) -> Response
where
    R: JobRepository + 'static,
{
    match service.get(&JobId(id)) {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<JobApplicationService<R>>>,
    Json(submission): Json<JobSubmission>,
) -> Response
where
    R: JobRepository + 'static,
{
    match service.create(submission) {
        Ok(job) => (StatusCode::CREATED, Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<R>(
    State(service): State<Arc<JobApplicationService<R>>>,
    Path(id): Path<String>,
    Json(patch): Json<JobPatch>,
) -> Response
where
    R: JobRepository + 'static,
{
    match service.update(&JobId(id), patch) {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<JobApplicationService<R>>>,
    Path(id): Path<String>,
) -> Response
where
    R: JobRepository + 'static,
{
    match service.delete(&JobId(id)) {
        Ok(()) => (StatusCode::OK, Json(json!({ "msg": "Job removed" }))).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: JobServiceError) -> Response {
    let (status, message) = match &err {
        JobServiceError::Validation(inner) => (StatusCode::BAD_REQUEST, inner.to_string()),
        JobServiceError::Query(inner) => (StatusCode::BAD_REQUEST, inner.to_string()),
        JobServiceError::Repository(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "Job not found".to_string())
        }
        JobServiceError::Repository(RepositoryError::Unavailable(_)) => {
            error!(error = %err, "job store failure");
            (StatusCode::INTERNAL_SERVER_ERROR, "Server Error".to_string())
        }
    };
    (status, Json(json!({ "msg": message }))).into_response()
}
