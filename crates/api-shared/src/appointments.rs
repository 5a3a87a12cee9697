use crate::finance::FinanceReviewRes;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

/// The identifying fields of a related user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserSummaryRes {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TreatmentRes {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub name: String,
    /// Two-place decimal string, e.g. `"150.00"`.
    pub cost: Decimal,
    pub created_at: DateTime<Utc>,
}

/// An appointment with its patient, doctor, treatments and finance review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AppointmentRes {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub status: AppointmentStatus,
    pub scheduled_time: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Sum of treatment costs as a two-place decimal string.
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub patient: UserSummaryRes,
    pub doctor: UserSummaryRes,
    pub treatments: Vec<TreatmentRes>,
    pub finance_review: Option<FinanceReviewRes>,
}

/// Patient booking. Fields are checked by the server so that every problem is reported.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateAppointmentReq {
    pub doctor_id: Option<String>,
    /// RFC 3339 timestamp.
    pub scheduled_time: Option<String>,
}

/// Doctor booking on behalf of a patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct DoctorCreateAppointmentReq {
    pub patient_id: Option<String>,
    /// RFC 3339 timestamp.
    pub scheduled_time: Option<String>,
}

/// `cost` may be a JSON number or a numeric string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateTreatmentReq {
    pub name: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub cost: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TreatmentAddedRes {
    #[serde(flatten)]
    pub treatment: TreatmentRes,
    pub doctor_id: Uuid,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TreatmentRemovedRes {
    pub doctor_id: Uuid,
    pub total_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_treatment_added_is_flat() {
        let id = Uuid::new_v4();
        let res = TreatmentAddedRes {
            treatment: TreatmentRes {
                id,
                appointment_id: Uuid::nil(),
                name: "X-Ray".into(),
                cost: Decimal::new(15000, 2),
                created_at: Utc::now(),
            },
            doctor_id: Uuid::nil(),
            total_amount: Decimal::new(15000, 2),
        };
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["name"], "X-Ray");
        assert_eq!(json["cost"], "150.00");
        assert_eq!(json["total_amount"], "150.00");
        assert_eq!(json["doctor_id"], Uuid::nil().to_string());

        let back: TreatmentAddedRes = serde_json::from_value(json).unwrap();
        assert_eq!(back.treatment.id, id);
    }

    #[test]
    fn test_treatment_cost_accepts_number_or_string() {
        let req: CreateTreatmentReq =
            serde_json::from_str(r#"{"name":"X","cost":"12.5"}"#).unwrap();
        assert_eq!(req.cost, Some(serde_json::json!("12.5")));
        let req: CreateTreatmentReq = serde_json::from_str(r#"{"cost":12.5}"#).unwrap();
        assert!(req.name.is_none());
        assert_eq!(req.cost, Some(serde_json::json!(12.5)));
    }
}
