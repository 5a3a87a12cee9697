use super::money::from_cents;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// A billable line item recorded during a visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Treatment {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub name: String,
    pub cost: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TreatmentRow {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub name: String,
    pub cost_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<TreatmentRow> for Treatment {
    fn from(row: TreatmentRow) -> Self {
        Self {
            id: row.id,
            appointment_id: row.appointment_id,
            name: row.name,
            cost: from_cents(row.cost_cents),
            created_at: row.created_at,
        }
    }
}
