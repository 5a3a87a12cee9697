use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of account roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Finance,
}

/// Operations gated on the caller's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Book an appointment for oneself.
    BookAppointment,
    /// Book an appointment on behalf of a patient.
    ScheduleForPatient,
    /// Start or finish a visit.
    RunVisit,
    /// Add or remove treatments on a visit.
    ManageTreatments,
    /// Search appointments across all doctors and patients.
    SearchAppointments,
    /// Record a finance review.
    ReviewAppointment,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Finance => "finance",
        }
    }

    /// Whether this role may perform `action`.
    pub fn permits(self, action: Action) -> bool {
        match self {
            Role::Patient => matches!(action, Action::BookAppointment),
            Role::Doctor => matches!(
                action,
                Action::ScheduleForPatient | Action::RunVisit | Action::ManageTreatments
            ),
            Role::Finance => matches!(
                action,
                Action::SearchAppointments | Action::ReviewAppointment
            ),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "finance" => Ok(Role::Finance),
            _ => Err(()),
        }
    }
}

/// An account as exposed outside the crate. The password hash never leaves the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields of a user attached to related records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub(crate) fn into_parts(self) -> (User, String) {
        let user = User {
            id: self.id,
            full_name: self.full_name,
            email: self.email,
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        (user, self.password_hash)
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        row.into_parts().0
    }
}
