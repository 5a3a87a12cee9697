use crate::models::AppointmentStatus;
use std::collections::BTreeMap;

/// Field-level validation messages, keyed by the offending input field.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// Returns `Ok(())` when nothing was recorded, otherwise a `CoreError::Validation`.
    pub fn into_result(self) -> CoreResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(self))
        }
    }

    /// Shorthand for a single-field validation failure.
    pub fn single(field: &str, message: impl Into<String>) -> CoreError {
        let mut errors = Self::new();
        errors.add(field, message);
        CoreError::Validation(errors)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed")]
    Validation(FieldErrors),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid or expired refresh token")]
    InvalidOrExpiredRefreshToken,
    #[error("Token expired")]
    AccessTokenExpired,
    #[error("Invalid token")]
    InvalidAccessToken,
    #[error("User with this email already exists")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,
    #[error("Doctor not found")]
    DoctorNotFound,
    #[error("Patient not found")]
    PatientNotFound,
    #[error("Appointment not found")]
    AppointmentNotFound,
    #[error("Treatment not found")]
    TreatmentNotFound,

    #[error("Unauthorized")]
    NotAppointmentDoctor,
    #[error("Doctor already has an appointment in progress")]
    DoctorAlreadyInProgress,
    #[error("Appointment must be {} to {}", .required.label(), .action)]
    InvalidState {
        action: &'static str,
        required: AppointmentStatus,
        actual: AppointmentStatus,
    },
    #[error("Cost must be a positive number")]
    InvalidCost,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("failed to hash secret: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
    #[error("failed to sign token: {0}")]
    TokenSigning(jsonwebtoken::errors::Error),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Returns true when a database error is a uniqueness violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}
