use super::finance_review::FinanceReviewDetails;
use super::money::from_cents;
use super::treatment::Treatment;
use super::user::UserSummary;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an appointment.
///
/// `Scheduled -> InProgress -> Completed` is the only path. `Cancelled` is terminal and no
/// operation produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Wire form, as stored and serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Human form, used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::InProgress => "in progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        match self {
            AppointmentStatus::Scheduled | AppointmentStatus::InProgress => false,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => true,
        }
    }

    /// Fails with `InvalidState` unless the appointment is in `required`.
    pub fn require(self, required: AppointmentStatus, action: &'static str) -> CoreResult<()> {
        if self == required {
            Ok(())
        } else {
            Err(CoreError::InvalidState {
                action,
                required,
                actual: self,
            })
        }
    }

    /// The status reached by applying `transition`, or `InvalidState`.
    pub fn apply(self, transition: Transition) -> CoreResult<AppointmentStatus> {
        self.require(transition.from(), transition.action())?;
        Ok(transition.to())
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "in_progress" => Ok(AppointmentStatus::InProgress),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// A doctor-driven step in the visit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Finish,
}

impl Transition {
    pub fn from(self) -> AppointmentStatus {
        match self {
            Transition::Start => AppointmentStatus::Scheduled,
            Transition::Finish => AppointmentStatus::InProgress,
        }
    }

    pub fn to(self) -> AppointmentStatus {
        match self {
            Transition::Start => AppointmentStatus::InProgress,
            Transition::Finish => AppointmentStatus::Completed,
        }
    }

    fn action(self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Finish => "finish",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub status: AppointmentStatus,
    pub scheduled_time: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An appointment with its patient, doctor, treatments and finance review attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: UserSummary,
    pub doctor: UserSummary,
    pub treatments: Vec<Treatment>,
    pub finance_review: Option<FinanceReviewDetails>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AppointmentRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub status: AppointmentStatus,
    pub scheduled_time: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_amount_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Self {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            status: row.status,
            scheduled_time: row.scheduled_time,
            started_at: row.started_at,
            finished_at: row.finished_at,
            total_amount: from_cents(row.total_amount_cents),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
