//! Maps failures onto HTTP statuses and the `{ success: false, message, errors? }` envelope.

use api_shared::ErrorBody;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kayan_core::CoreError;

#[derive(Debug)]
pub enum ApiError {
    Core(CoreError),
    /// 401 raised before any token was checked.
    Unauthenticated(&'static str),
    /// 403 raised by role or ownership guards.
    Forbidden(&'static str),
    /// 400 for bodies or path segments that could not be decoded.
    BadRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Core(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected request body");
        ApiError::BadRequest("Invalid request body".into())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected path parameters");
        ApiError::BadRequest("Invalid ID format".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Core(err) => core_error_body(err),
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, ErrorBody::new(msg)),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorBody::new(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new(msg)),
        };
        (status, Json(body)).into_response()
    }
}

fn core_error_body(err: CoreError) -> (StatusCode, ErrorBody) {
    let status = match &err {
        CoreError::Validation(_) | CoreError::InvalidCost | CoreError::InvalidState { .. } => {
            StatusCode::BAD_REQUEST
        }
        CoreError::InvalidCredentials
        | CoreError::InvalidOrExpiredRefreshToken
        | CoreError::AccessTokenExpired
        | CoreError::InvalidAccessToken => StatusCode::UNAUTHORIZED,
        CoreError::NotAppointmentDoctor => StatusCode::FORBIDDEN,
        CoreError::UserNotFound
        | CoreError::DoctorNotFound
        | CoreError::PatientNotFound
        | CoreError::AppointmentNotFound
        | CoreError::TreatmentNotFound => StatusCode::NOT_FOUND,
        CoreError::EmailTaken | CoreError::DoctorAlreadyInProgress => StatusCode::CONFLICT,
        CoreError::InvalidConfig(_)
        | CoreError::Database(_)
        | CoreError::Migration(_)
        | CoreError::PasswordHash(_)
        | CoreError::TokenSigning(_)
        | CoreError::Task(_) => {
            tracing::error!(error = %err, "request failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Internal server error"),
            );
        }
    };

    match err {
        CoreError::Validation(errors) => (
            status,
            ErrorBody::with_errors("Validation failed", errors.into_map()),
        ),
        other => (status, ErrorBody::new(other.to_string())),
    }
}
