//! Appointment booking and the visit state machine.
//!
//! ## Locking
//!
//! `start` and `finish` open a transaction whose first statement writes the target row, which
//! takes SQLite's database write lock until commit or rollback. The "doctor has another visit in
//! progress" check and the status check both run under that lock, and the partial unique index
//! `appointments_one_active_visit_per_doctor` backs the rule at the storage layer.

use crate::db::{lock_appointment, Db};
use crate::error::{is_unique_violation, CoreError, CoreResult};
use crate::models::appointment::AppointmentRow;
use crate::models::finance_review::FinanceReviewDetails;
use crate::models::treatment::TreatmentRow;
use crate::models::{
    AppointmentDetails, AppointmentStatus, FinanceReview, Role, Transition, Treatment,
    UserSummary,
};
use crate::repositories::users::find_with_role;
use crate::validation::validate_scheduled_time;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use uuid::Uuid;

// ============================================================================
// DETAIL QUERIES
// ============================================================================

const DETAILS_SELECT: &str = "\
SELECT a.id, a.patient_id, a.doctor_id, a.status, a.scheduled_time, a.started_at, \
       a.finished_at, a.total_amount_cents, a.created_at, a.updated_at, \
       p.full_name AS patient_full_name, p.email AS patient_email, \
       d.full_name AS doctor_full_name, d.email AS doctor_email, \
       r.id AS review_id, r.finance_user_id AS review_finance_user_id, \
       r.approved AS review_approved, r.notes AS review_notes, \
       r.created_at AS review_created_at, r.updated_at AS review_updated_at, \
       f.full_name AS reviewer_full_name, f.email AS reviewer_email \
FROM appointments a \
JOIN users p ON p.id = a.patient_id \
JOIN users d ON d.id = a.doctor_id \
LEFT JOIN finance_reviews r ON r.appointment_id = a.id \
LEFT JOIN users f ON f.id = r.finance_user_id ";

#[derive(sqlx::FromRow)]
struct DetailsRow {
    #[sqlx(flatten)]
    appointment: AppointmentRow,
    patient_full_name: String,
    patient_email: String,
    doctor_full_name: String,
    doctor_email: String,
    review_id: Option<Uuid>,
    review_finance_user_id: Option<Uuid>,
    review_approved: Option<bool>,
    review_notes: Option<String>,
    review_created_at: Option<DateTime<Utc>>,
    review_updated_at: Option<DateTime<Utc>>,
    reviewer_full_name: Option<String>,
    reviewer_email: Option<String>,
}

impl DetailsRow {
    fn into_details(self, treatments: Vec<Treatment>) -> AppointmentDetails {
        let appointment = crate::models::Appointment::from(self.appointment);
        let patient = UserSummary {
            id: appointment.patient_id,
            full_name: self.patient_full_name,
            email: self.patient_email,
        };
        let doctor = UserSummary {
            id: appointment.doctor_id,
            full_name: self.doctor_full_name,
            email: self.doctor_email,
        };

        let finance_review = match (
            self.review_id,
            self.review_finance_user_id,
            self.review_approved,
            self.review_created_at,
            self.review_updated_at,
            self.reviewer_full_name,
            self.reviewer_email,
        ) {
            (
                Some(id),
                Some(finance_user_id),
                Some(approved),
                Some(created_at),
                Some(updated_at),
                Some(full_name),
                Some(email),
            ) => Some(FinanceReviewDetails {
                review: FinanceReview {
                    id,
                    appointment_id: appointment.id,
                    finance_user_id,
                    approved,
                    notes: self.review_notes,
                    created_at,
                    updated_at,
                },
                finance_user: UserSummary {
                    id: finance_user_id,
                    full_name,
                    email,
                },
            }),
            _ => None,
        };

        AppointmentDetails {
            appointment,
            patient,
            doctor,
            treatments,
            finance_review,
        }
    }
}

/// A query builder primed with the details `SELECT`; push `WHERE`/`ORDER BY` onto it.
pub(crate) fn details_query<'args>() -> QueryBuilder<'args, Sqlite> {
    QueryBuilder::new(DETAILS_SELECT)
}

/// Runs a details query and attaches each appointment's treatments, oldest first.
pub(crate) async fn fetch_details(
    conn: &mut SqliteConnection,
    mut query: QueryBuilder<'_, Sqlite>,
) -> CoreResult<Vec<AppointmentDetails>> {
    let rows: Vec<DetailsRow> = query.build_query_as().fetch_all(&mut *conn).await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut treatments_query = QueryBuilder::<Sqlite>::new(
        "SELECT id, appointment_id, name, cost_cents, created_at FROM treatments \
         WHERE appointment_id IN (",
    );
    let mut ids = treatments_query.separated(", ");
    for row in &rows {
        ids.push_bind(row.appointment.id);
    }
    ids.push_unseparated(") ORDER BY created_at ASC, id ASC");

    let treatment_rows: Vec<TreatmentRow> = treatments_query
        .build_query_as()
        .fetch_all(&mut *conn)
        .await?;

    let mut by_appointment: HashMap<Uuid, Vec<Treatment>> = HashMap::new();
    for row in treatment_rows {
        by_appointment
            .entry(row.appointment_id)
            .or_default()
            .push(Treatment::from(row));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let treatments = by_appointment
                .remove(&row.appointment.id)
                .unwrap_or_default();
            row.into_details(treatments)
        })
        .collect())
}

/// Loads one appointment with its relations.
pub(crate) async fn fetch_one(
    conn: &mut SqliteConnection,
    appointment_id: Uuid,
) -> CoreResult<Option<AppointmentDetails>> {
    let mut query = details_query();
    query.push("WHERE a.id = ").push_bind(appointment_id);
    Ok(fetch_details(conn, query).await?.into_iter().next())
}

/// Loads the bare appointment row.
pub(crate) async fn fetch_row(
    conn: &mut SqliteConnection,
    appointment_id: Uuid,
) -> CoreResult<Option<AppointmentRow>> {
    let row = sqlx::query_as::<_, AppointmentRow>(
        "SELECT id, patient_id, doctor_id, status, scheduled_time, started_at, finished_at,
                total_amount_cents, created_at, updated_at
         FROM appointments WHERE id = ?",
    )
    .bind(appointment_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

// ============================================================================
// APPOINTMENT SERVICE
// ============================================================================

#[derive(Clone, Debug)]
pub struct AppointmentService {
    db: Db,
}

impl AppointmentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Books a `scheduled` appointment between a patient and a doctor.
    ///
    /// # Errors
    ///
    /// - `Validation` if `scheduled_time` is not in the future
    /// - `DoctorNotFound` / `PatientNotFound` if either party is missing or has another role
    pub async fn create(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        scheduled_time: DateTime<Utc>,
    ) -> CoreResult<AppointmentDetails> {
        let now = Utc::now();
        validate_scheduled_time(scheduled_time, now)?;

        let mut conn = self.db.pool().acquire().await?;
        find_with_role(&mut conn, doctor_id, Role::Doctor, CoreError::DoctorNotFound).await?;
        find_with_role(&mut conn, patient_id, Role::Patient, CoreError::PatientNotFound).await?;

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO appointments
                (id, patient_id, doctor_id, status, scheduled_time, total_amount_cents,
                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(id)
        .bind(patient_id)
        .bind(doctor_id)
        .bind(AppointmentStatus::Scheduled)
        .bind(scheduled_time)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        tracing::info!(appointment_id = %id, %patient_id, %doctor_id, "appointment booked");
        fetch_one(&mut conn, id)
            .await?
            .ok_or(CoreError::AppointmentNotFound)
    }

    /// Moves a `scheduled` appointment to `in_progress`.
    ///
    /// Checks run in this order, all under the write lock:
    /// 1. the doctor has no *other* appointment in progress (`DoctorAlreadyInProgress`)
    /// 2. the appointment exists (`AppointmentNotFound`)
    /// 3. the caller is its doctor (`NotAppointmentDoctor`)
    /// 4. it is `scheduled` (`InvalidState`)
    pub async fn start(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
    ) -> CoreResult<AppointmentDetails> {
        let mut tx = self.db.begin().await?;
        let exists = lock_appointment(&mut tx, appointment_id).await?;

        let active: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM appointments
             WHERE doctor_id = ? AND status = ? AND id <> ?
             LIMIT 1",
        )
        .bind(doctor_id)
        .bind(AppointmentStatus::InProgress)
        .bind(appointment_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some((active_id,)) = active {
            tracing::info!(%doctor_id, %appointment_id, %active_id, "start rejected: visit already in progress");
            return Err(CoreError::DoctorAlreadyInProgress);
        }

        let row = if exists {
            fetch_row(&mut tx, appointment_id).await?
        } else {
            None
        };
        let Some(row) = row else {
            return Err(CoreError::AppointmentNotFound);
        };
        if row.doctor_id != doctor_id {
            return Err(CoreError::NotAppointmentDoctor);
        }
        let next = row.status.apply(Transition::Start)?;

        let now = Utc::now();
        sqlx::query("UPDATE appointments SET status = ?, started_at = ?, updated_at = ? WHERE id = ?")
            .bind(next)
            .bind(now)
            .bind(now)
            .bind(appointment_id)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    CoreError::DoctorAlreadyInProgress
                } else {
                    CoreError::Database(err)
                }
            })?;

        let details = fetch_one(&mut tx, appointment_id)
            .await?
            .ok_or(CoreError::AppointmentNotFound)?;
        tx.commit().await?;

        tracing::info!(%appointment_id, %doctor_id, "visit started");
        Ok(details)
    }

    /// Moves an `in_progress` appointment to `completed`.
    pub async fn finish(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
    ) -> CoreResult<AppointmentDetails> {
        let mut tx = self.db.begin().await?;
        if !lock_appointment(&mut tx, appointment_id).await? {
            return Err(CoreError::AppointmentNotFound);
        }

        let row = fetch_row(&mut tx, appointment_id)
            .await?
            .ok_or(CoreError::AppointmentNotFound)?;
        if row.doctor_id != doctor_id {
            return Err(CoreError::NotAppointmentDoctor);
        }
        let next = row.status.apply(Transition::Finish)?;

        let now = Utc::now();
        sqlx::query(
            "UPDATE appointments SET status = ?, finished_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(next)
        .bind(now)
        .bind(now)
        .bind(appointment_id)
        .execute(&mut *tx)
        .await?;

        let details = fetch_one(&mut tx, appointment_id)
            .await?
            .ok_or(CoreError::AppointmentNotFound)?;
        tx.commit().await?;

        tracing::info!(%appointment_id, %doctor_id, total = %details.appointment.total_amount, "visit finished");
        Ok(details)
    }

    /// A patient's appointments, latest `scheduled_time` first.
    pub async fn list_for_patient(&self, patient_id: Uuid) -> CoreResult<Vec<AppointmentDetails>> {
        let mut query = details_query();
        query
            .push("WHERE a.patient_id = ")
            .push_bind(patient_id)
            .push(" ORDER BY a.scheduled_time DESC");
        let mut conn = self.db.pool().acquire().await?;
        fetch_details(&mut conn, query).await
    }

    /// A doctor's appointments, latest `scheduled_time` first.
    pub async fn list_for_doctor(&self, doctor_id: Uuid) -> CoreResult<Vec<AppointmentDetails>> {
        let mut query = details_query();
        query
            .push("WHERE a.doctor_id = ")
            .push_bind(doctor_id)
            .push(" ORDER BY a.scheduled_time DESC");
        let mut conn = self.db.pool().acquire().await?;
        fetch_details(&mut conn, query).await
    }

    /// One appointment with its relations.
    pub async fn get(&self, appointment_id: Uuid) -> CoreResult<AppointmentDetails> {
        let mut conn = self.db.pool().acquire().await?;
        fetch_one(&mut conn, appointment_id)
            .await?
            .ok_or(CoreError::AppointmentNotFound)
    }
}
