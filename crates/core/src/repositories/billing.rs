//! Appointment totals.
//!
//! `total_amount_cents` is derived data. It is only ever written here, from the sum of the
//! appointment's current treatments, inside the transaction that changed those treatments.

use crate::error::CoreResult;
use crate::models::money::from_cents;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use uuid::Uuid;

/// Recomputes and stores an appointment's total, returning it.
///
/// Run on the transaction that mutated the treatments, after the mutation and before commit.
pub async fn recalculate_total(
    conn: &mut SqliteConnection,
    appointment_id: Uuid,
) -> CoreResult<Decimal> {
    let (cents,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(cost_cents), 0) FROM treatments WHERE appointment_id = ?",
    )
    .bind(appointment_id)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE appointments SET total_amount_cents = ?, updated_at = ? WHERE id = ?")
        .bind(cents)
        .bind(Utc::now())
        .bind(appointment_id)
        .execute(&mut *conn)
        .await?;

    tracing::debug!(%appointment_id, cents, "appointment total recalculated");
    Ok(from_cents(cents))
}
