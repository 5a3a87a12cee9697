use super::user::UserSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// At most one per appointment; re-reviewing overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FinanceReview {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub finance_user_id: Uuid,
    pub approved: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A review together with the finance user who recorded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinanceReviewDetails {
    #[serde(flatten)]
    pub review: FinanceReview,
    pub finance_user: UserSummary,
}
