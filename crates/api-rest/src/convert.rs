//! Conversions between core models and wire types, and parsing of loosely typed request fields.

use api_shared::{
    AppointmentRes, AppointmentStatus as WireStatus, FinanceReviewRes, Role as WireRole,
    TreatmentRes, UserRes, UserSummaryRes,
};
use chrono::{DateTime, NaiveDate, Utc};
use kayan_core::{
    AppointmentDetails, AppointmentStatus, FinanceReview, FinanceReviewDetails, Role, Treatment,
    User, UserSummary,
};
use rust_decimal::Decimal;
use std::str::FromStr;

pub fn role_res(role: Role) -> WireRole {
    match role {
        Role::Patient => WireRole::Patient,
        Role::Doctor => WireRole::Doctor,
        Role::Finance => WireRole::Finance,
    }
}

pub fn status_res(status: AppointmentStatus) -> WireStatus {
    match status {
        AppointmentStatus::Scheduled => WireStatus::Scheduled,
        AppointmentStatus::InProgress => WireStatus::InProgress,
        AppointmentStatus::Completed => WireStatus::Completed,
        AppointmentStatus::Cancelled => WireStatus::Cancelled,
    }
}

pub fn user_res(user: User) -> UserRes {
    UserRes {
        id: user.id,
        full_name: user.full_name,
        email: user.email,
        role: role_res(user.role),
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

pub fn summary_res(summary: UserSummary) -> UserSummaryRes {
    UserSummaryRes {
        id: summary.id,
        full_name: summary.full_name,
        email: summary.email,
    }
}

pub fn treatment_res(treatment: Treatment) -> TreatmentRes {
    TreatmentRes {
        id: treatment.id,
        appointment_id: treatment.appointment_id,
        name: treatment.name,
        cost: treatment.cost,
        created_at: treatment.created_at,
    }
}

pub fn review_res(review: FinanceReview, finance_user: Option<UserSummary>) -> FinanceReviewRes {
    FinanceReviewRes {
        id: review.id,
        appointment_id: review.appointment_id,
        finance_user_id: review.finance_user_id,
        approved: review.approved,
        notes: review.notes,
        created_at: review.created_at,
        updated_at: review.updated_at,
        finance_user: finance_user.map(summary_res),
    }
}

fn review_details_res(details: FinanceReviewDetails) -> FinanceReviewRes {
    review_res(details.review, Some(details.finance_user))
}

pub fn appointment_res(details: AppointmentDetails) -> AppointmentRes {
    let a = details.appointment;
    AppointmentRes {
        id: a.id,
        patient_id: a.patient_id,
        doctor_id: a.doctor_id,
        status: status_res(a.status),
        scheduled_time: a.scheduled_time,
        started_at: a.started_at,
        finished_at: a.finished_at,
        total_amount: a.total_amount,
        created_at: a.created_at,
        updated_at: a.updated_at,
        patient: summary_res(details.patient),
        doctor: summary_res(details.doctor),
        treatments: details.treatments.into_iter().map(treatment_res).collect(),
        finance_review: details.finance_review.map(review_details_res),
    }
}

// ============================================================================
// Request field parsing
// ============================================================================

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date, read as midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// A cost given as a JSON number or a numeric string.
pub fn parse_cost(raw: &serde_json::Value) -> Option<Decimal> {
    match raw {
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Parses a non-empty optional text field, reporting `None` for blank input.
pub fn non_blank(raw: Option<&String>) -> Option<&str> {
    raw.map(|s| s.trim()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_timestamp_forms() {
        assert_eq!(
            parse_timestamp("2030-01-05T10:30:00Z"),
            Some(Utc.with_ymd_and_hms(2030, 1, 5, 10, 30, 0).unwrap())
        );
        assert_eq!(
            parse_timestamp("2030-01-05T12:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2030, 1, 5, 10, 30, 0).unwrap())
        );
        assert_eq!(
            parse_timestamp(" 2030-01-05 "),
            Some(Utc.with_ymd_and_hms(2030, 1, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("next tuesday"), None);
    }

    #[test]
    fn test_parse_cost_number_or_string() {
        assert_eq!(parse_cost(&json!(150)), Some(Decimal::new(150, 0)));
        assert_eq!(parse_cost(&json!(12.5)), Some(Decimal::new(125, 1)));
        assert_eq!(parse_cost(&json!("49.99")), Some(Decimal::new(4999, 2)));
        assert_eq!(parse_cost(&json!("abc")), None);
        assert_eq!(parse_cost(&json!(true)), None);
    }
}
