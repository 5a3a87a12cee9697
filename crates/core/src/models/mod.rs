//! Plain value types returned by the repositories.
//!
//! Rows are decoded into crate-private `*Row` structs and converted into these types; relations
//! (patient and doctor summaries, treatments, finance review) are attached by an explicit fetch
//! step in the repository that builds them.

pub mod appointment;
pub mod finance_review;
pub mod money;
pub mod refresh_token;
pub mod treatment;
pub mod user;

pub use appointment::{Appointment, AppointmentDetails, AppointmentStatus, Transition};
pub use finance_review::{FinanceReview, FinanceReviewDetails};
pub use refresh_token::RefreshTokenRecord;
pub use treatment::Treatment;
pub use user::{Action, Role, User, UserSummary};
