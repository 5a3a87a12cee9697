//! # API Shared
//!
//! Wire types shared by the Kayan REST server and its client.
//!
//! Contains:
//! - The response envelope (`ApiResponse`, `ErrorBody`)
//! - Request and response bodies for every endpoint
//! - The health response
//!
//! Field names follow the JSON contract: snake_case for resources, camelCase for token fields and
//! the `appointmentId` / `totalPages` query and pagination keys.

pub mod appointments;
pub mod auth;
pub mod envelope;
pub mod finance;
pub mod health;

pub use appointments::{
    AppointmentRes, AppointmentStatus, CreateAppointmentReq, CreateTreatmentReq,
    DoctorCreateAppointmentReq, TreatmentAddedRes, TreatmentRemovedRes, TreatmentRes,
    UserSummaryRes,
};
pub use auth::{LoginReq, LoginRes, RefreshReq, Role, SignupReq, TokensRes, UserRes};
pub use envelope::{ApiResponse, ErrorBody};
pub use finance::{FinanceReviewRes, PaginationRes, ReviewReq, SearchQuery, SearchRes};
pub use health::HealthRes;
