//! # Kayan Core
//!
//! Core business logic for the Kayan appointment system.
//!
//! This crate owns the data and the rules applied to it:
//! - Accounts, password hashing and token issuance with rotating refresh tokens
//! - The appointment lifecycle (`scheduled -> in_progress -> completed`) and the rule that a
//!   doctor has at most one visit in progress
//! - Treatments and the appointment total derived from them
//! - Finance search and review
//!
//! **No API concerns**: HTTP routing, cookies and response envelopes belong in `api-rest` and
//! `api-shared`.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod password;
pub mod repositories;
pub mod validation;

pub use config::{CoreConfig, JwtSettings};
pub use db::Db;
pub use error::{CoreError, CoreResult, FieldErrors};
pub use models::{
    Action, Appointment, AppointmentDetails, AppointmentStatus, FinanceReview,
    FinanceReviewDetails, Role, Treatment, User, UserSummary,
};
pub use repositories::appointments::AppointmentService;
pub use repositories::auth::{AccessClaims, AuthService, TokenPair};
pub use repositories::finance::{AppointmentSearch, FinanceService, SearchPage};
pub use repositories::treatments::{TreatmentChange, TreatmentService};
pub use repositories::users::UserService;

pub use kayan_types::{EmailAddress, NonEmptyText, TextError};
