use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tracing::error;

use super::domain::{
    LoginRequest, PasswordChange, PasswordReset, PasswordResetRequest, ProfileUpdate, Registration,
};
use super::repository::{AccountRepository, ResetTokenDelivery, UniqueField};
use super::service::{AccountService, AccountServiceError};
use super::session::{AuthenticatedUser, SessionKeys};

impl<R, D> FromRef<Arc<AccountService<R, D>>> for SessionKeys
where
    R: AccountRepository + 'static,
    D: ResetTokenDelivery + 'static,
{
    fn from_ref(service: &Arc<AccountService<R, D>>) -> Self {
        service.sessions().clone()
    }
}

/// Router builder exposing registration, login, profile, and password endpoints.
pub fn account_router<R, D>(service: Arc<AccountService<R, D>>) -> Router
where
    R: AccountRepository + 'static,
    D: ResetTokenDelivery + 'static,
{
    Router::new()
        .route("/api/users/register", post(register_handler::<R, D>))
        .route("/api/users/login", post(login_handler::<R, D>))
        .route(
            "/api/users/profile",
            get(profile_handler::<R, D>).put(update_profile_handler::<R, D>),
        )
        .route("/api/users/password", put(change_password_handler::<R, D>))
        .route(
            "/api/users/password/forgot",
            post(forgot_password_handler::<R, D>),
        )
        .route(
            "/api/users/password/reset",
            post(reset_password_handler::<R, D>),
        )
        .with_state(service)
}

pub(crate) async fn register_handler<R, D>(
    State(service): State<Arc<AccountService<R, D>>>,
    Json(registration): Json<Registration>,
) -> Response
where
    R: AccountRepository + 'static,
    D: ResetTokenDelivery + 'static,
{
    match service.register(registration) {
        Ok(grant) => (StatusCode::CREATED, Json(grant)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn login_handler<R, D>(
    State(service): State<Arc<AccountService<R, D>>>,
    Json(request): Json<LoginRequest>,
) -> Response
where
    R: AccountRepository + 'static,
    D: ResetTokenDelivery + 'static,
{
    match service.login(request) {
        Ok(grant) => (StatusCode::OK, Json(grant)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn profile_handler<R, D>(
    State(service): State<Arc<AccountService<R, D>>>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Response
where
    R: AccountRepository + 'static,
    D: ResetTokenDelivery + 'static,
{
    match service.profile(&user) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_profile_handler<R, D>(
    State(service): State<Arc<AccountService<R, D>>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(update): Json<ProfileUpdate>,
) -> Response
where
    R: AccountRepository + 'static,
    D: ResetTokenDelivery + 'static,
{
    match service.update_profile(&user, update) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn change_password_handler<R, D>(
    State(service): State<Arc<AccountService<R, D>>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(change): Json<PasswordChange>,
) -> Response
where
    R: AccountRepository + 'static,
    D: ResetTokenDelivery + 'static,
{
    match service.change_password(&user, change) {
        Ok(()) => message(StatusCode::OK, "Password updated successfully"),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn forgot_password_handler<R, D>(
    State(service): State<Arc<AccountService<R, D>>>,
    Json(request): Json<PasswordResetRequest>,
) -> Response
where
    R: AccountRepository + 'static,
    D: ResetTokenDelivery + 'static,
{
    match service.request_password_reset(request) {
        Ok(()) => message(
            StatusCode::ACCEPTED,
            "If that email is registered, a reset link has been sent",
        ),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reset_password_handler<R, D>(
    State(service): State<Arc<AccountService<R, D>>>,
    Json(reset): Json<PasswordReset>,
) -> Response
where
    R: AccountRepository + 'static,
    D: ResetTokenDelivery + 'static,
{
    match service.reset_password(reset) {
        Ok(()) => message(StatusCode::OK, "Password reset successfully"),
        Err(err) => error_response(err),
    }
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn error_response(err: AccountServiceError) -> Response {
    match &err {
        AccountServiceError::Validation(inner) => {
            message(StatusCode::BAD_REQUEST, &inner.to_string())
        }
        AccountServiceError::Conflict(UniqueField::Email) => {
            message(StatusCode::CONFLICT, "Email already registered")
        }
        AccountServiceError::Conflict(UniqueField::Mobile) => {
            message(StatusCode::CONFLICT, "Mobile number already registered")
        }
        AccountServiceError::Contended => message(StatusCode::CONFLICT, &err.to_string()),
        AccountServiceError::InvalidCredentials | AccountServiceError::IncorrectPassword => {
            message(StatusCode::UNAUTHORIZED, &err.to_string())
        }
        AccountServiceError::InvalidResetToken => {
            message(StatusCode::BAD_REQUEST, &err.to_string())
        }
        AccountServiceError::NotFound => message(StatusCode::NOT_FOUND, &err.to_string()),
        AccountServiceError::Session(_)
        | AccountServiceError::Delivery(_)
        | AccountServiceError::Repository(_) => {
            error!(error = %err, "account request failed");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}
