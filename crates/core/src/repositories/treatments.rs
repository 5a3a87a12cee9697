//! Treatments recorded during a visit.

use crate::db::{lock_appointment, Db};
use crate::error::{CoreError, CoreResult, FieldErrors};
use crate::models::appointment::AppointmentRow;
use crate::models::{AppointmentStatus, Treatment};
use crate::repositories::appointments::fetch_row;
use crate::repositories::billing::recalculate_total;
use crate::validation::validate_cost;
use chrono::Utc;
use kayan_types::NonEmptyText;
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use uuid::Uuid;

/// Outcome of adding or removing a treatment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreatmentChange {
    pub appointment_id: Uuid,
    pub doctor_id: Uuid,
    /// The added treatment; `None` for a removal.
    pub treatment: Option<Treatment>,
    /// The appointment total after the change.
    pub total_amount: Decimal,
}

#[derive(Clone, Debug)]
pub struct TreatmentService {
    db: Db,
}

impl TreatmentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Adds a treatment to an `in_progress` appointment owned by `doctor_id`.
    ///
    /// The insert and the total recomputation commit together or not at all.
    pub async fn add(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        name: &str,
        cost: Decimal,
    ) -> CoreResult<TreatmentChange> {
        let name = NonEmptyText::new(name)
            .map_err(|_| FieldErrors::single("name", "Treatment name is required"))?;
        let cost_cents = validate_cost(cost)?;

        let mut tx = self.db.begin().await?;
        let row = owned_in_progress(&mut tx, appointment_id, doctor_id, "add treatments").await?;

        let now = Utc::now();
        let treatment_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO treatments (id, appointment_id, name, cost_cents, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(treatment_id)
        .bind(appointment_id)
        .bind(name.as_str())
        .bind(cost_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let total_amount = recalculate_total(&mut tx, appointment_id).await?;
        tx.commit().await?;

        tracing::info!(%appointment_id, %treatment_id, %total_amount, "treatment added");
        Ok(TreatmentChange {
            appointment_id,
            doctor_id: row.doctor_id,
            treatment: Some(Treatment {
                id: treatment_id,
                appointment_id,
                name: name.into_inner(),
                cost: crate::models::money::from_cents(cost_cents),
                created_at: now,
            }),
            total_amount,
        })
    }

    /// Removes a treatment from an `in_progress` appointment owned by `doctor_id`.
    pub async fn remove(
        &self,
        appointment_id: Uuid,
        treatment_id: Uuid,
        doctor_id: Uuid,
    ) -> CoreResult<TreatmentChange> {
        let mut tx = self.db.begin().await?;
        let row =
            owned_in_progress(&mut tx, appointment_id, doctor_id, "remove treatments").await?;

        let deleted = sqlx::query("DELETE FROM treatments WHERE id = ? AND appointment_id = ?")
            .bind(treatment_id)
            .bind(appointment_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(CoreError::TreatmentNotFound);
        }

        let total_amount = recalculate_total(&mut tx, appointment_id).await?;
        tx.commit().await?;

        tracing::info!(%appointment_id, %treatment_id, %total_amount, "treatment removed");
        Ok(TreatmentChange {
            appointment_id,
            doctor_id: row.doctor_id,
            treatment: None,
            total_amount,
        })
    }
}

/// Locks the appointment and checks ownership and status, in that order.
async fn owned_in_progress(
    conn: &mut SqliteConnection,
    appointment_id: Uuid,
    doctor_id: Uuid,
    action: &'static str,
) -> CoreResult<AppointmentRow> {
    if !lock_appointment(conn, appointment_id).await? {
        return Err(CoreError::AppointmentNotFound);
    }
    let row = fetch_row(conn, appointment_id)
        .await?
        .ok_or(CoreError::AppointmentNotFound)?;
    if row.doctor_id != doctor_id {
        return Err(CoreError::NotAppointmentDoctor);
    }
    row.status.require(AppointmentStatus::InProgress, action)?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use crate::repositories::appointments::AppointmentService;
    use crate::test_support::{seed_user, test_db};
    use chrono::Duration;
    use std::str::FromStr;

    struct Fixture {
        _dir: tempfile::TempDir,
        appointments: AppointmentService,
        treatments: TreatmentService,
        doctor: User,
        appointment_id: Uuid,
    }

    async fn started_visit() -> Fixture {
        let (dir, db) = test_db().await;
        let patient = seed_user(&db, "Pat", "pat@example.com", Role::Patient).await;
        let doctor = seed_user(&db, "Dr One", "dr1@example.com", Role::Doctor).await;
        let appointments = AppointmentService::new(db.clone());
        let appointment_id = appointments
            .create(patient.id, doctor.id, Utc::now() + Duration::hours(1))
            .await
            .unwrap()
            .appointment
            .id;
        appointments.start(appointment_id, doctor.id).await.unwrap();
        Fixture {
            _dir: dir,
            appointments,
            treatments: TreatmentService::new(db),
            doctor,
            appointment_id,
        }
    }

    fn amount(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_visit_billing_end_to_end() {
        let f = started_visit().await;
        let id = f.appointment_id;

        let xray = f
            .treatments
            .add(id, f.doctor.id, "X-Ray", amount("150"))
            .await
            .unwrap();
        assert_eq!(xray.total_amount.to_string(), "150.00");
        assert_eq!(xray.doctor_id, f.doctor.id);
        let xray_id = xray.treatment.unwrap().id;

        let consult = f
            .treatments
            .add(id, f.doctor.id, " Consultation ", amount("50"))
            .await
            .unwrap();
        assert_eq!(consult.total_amount.to_string(), "200.00");
        assert_eq!(consult.treatment.unwrap().name, "Consultation");

        let removed = f.treatments.remove(id, xray_id, f.doctor.id).await.unwrap();
        assert_eq!(removed.total_amount.to_string(), "50.00");

        let finished = f.appointments.finish(id, f.doctor.id).await.unwrap();
        assert_eq!(finished.appointment.status, AppointmentStatus::Completed);
        assert!(finished.appointment.finished_at.is_some());
        assert_eq!(finished.appointment.total_amount.to_string(), "50.00");
        assert_eq!(finished.treatments.len(), 1);
        assert_eq!(finished.treatments[0].name, "Consultation");
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input_without_changing_total() {
        let f = started_visit().await;
        let id = f.appointment_id;

        for bad in ["0", "-10", "0.001"] {
            assert!(matches!(
                f.treatments.add(id, f.doctor.id, "Item", amount(bad)).await,
                Err(CoreError::InvalidCost)
            ));
        }
        assert!(matches!(
            f.treatments.add(id, f.doctor.id, "   ", amount("10")).await,
            Err(CoreError::Validation(_))
        ));

        let details = f.appointments.get(id).await.unwrap();
        assert!(details.treatments.is_empty());
        assert_eq!(details.appointment.total_amount.to_string(), "0.00");
    }

    #[tokio::test]
    async fn test_changes_require_owner_and_in_progress() {
        let f = started_visit().await;
        let id = f.appointment_id;

        let stranger = Uuid::new_v4();
        assert!(matches!(
            f.treatments.add(id, stranger, "Item", amount("10")).await,
            Err(CoreError::NotAppointmentDoctor)
        ));
        assert!(matches!(
            f.treatments
                .add(Uuid::new_v4(), f.doctor.id, "Item", amount("10"))
                .await,
            Err(CoreError::AppointmentNotFound)
        ));
        assert!(matches!(
            f.treatments
                .remove(id, Uuid::new_v4(), f.doctor.id)
                .await,
            Err(CoreError::TreatmentNotFound)
        ));

        let kept = f
            .treatments
            .add(id, f.doctor.id, "Item", amount("10"))
            .await
            .unwrap()
            .treatment
            .unwrap();
        f.appointments.finish(id, f.doctor.id).await.unwrap();

        let err = f
            .treatments
            .add(id, f.doctor.id, "Late", amount("10"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Appointment must be in progress to add treatments"
        );
        assert!(matches!(
            f.treatments.remove(id, kept.id, f.doctor.id).await,
            Err(CoreError::InvalidState { .. })
        ));
        assert_eq!(
            f.appointments
                .get(id)
                .await
                .unwrap()
                .appointment
                .total_amount
                .to_string(),
            "10.00"
        );
    }
}
