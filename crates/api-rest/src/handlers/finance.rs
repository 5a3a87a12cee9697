use crate::auth::AuthUser;
use crate::convert::{appointment_res, non_blank, parse_timestamp, review_res};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use api_shared::{
    ApiResponse, ErrorBody, FinanceReviewRes, PaginationRes, ReviewReq, SearchQuery, SearchRes,
};
use axum::extract::{Query, State};
use axum::Json;
use kayan_core::{Action, AppointmentSearch, AppointmentStatus, FieldErrors};
use uuid::Uuid;

fn parse_search(query: &SearchQuery) -> Result<AppointmentSearch, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut search = AppointmentSearch {
        doctor: non_blank(query.doctor.as_ref()).map(str::to_owned),
        patient: non_blank(query.patient.as_ref()).map(str::to_owned),
        ..AppointmentSearch::default()
    };

    if let Some(raw) = non_blank(query.appointment_id.as_ref()) {
        match Uuid::parse_str(raw) {
            Ok(id) => search.appointment_id = Some(id),
            Err(_) => errors.add("appointmentId", "Invalid appointment ID format"),
        }
    }
    if let Some(raw) = non_blank(query.status.as_ref()) {
        match raw.parse::<AppointmentStatus>() {
            Ok(status) => search.status = Some(status),
            Err(_) => errors.add("status", "Invalid status"),
        }
    }
    for (field, raw, slot) in [
        ("from", query.from.as_ref(), &mut search.from),
        ("to", query.to.as_ref(), &mut search.to),
    ] {
        if let Some(raw) = non_blank(raw) {
            match parse_timestamp(raw) {
                Some(ts) => *slot = Some(ts),
                None => errors.add(field, "Invalid date format"),
            }
        }
    }
    for (field, label, raw, slot) in [
        ("page", "Page", query.page.as_ref(), &mut search.page),
        ("limit", "Limit", query.limit.as_ref(), &mut search.limit),
    ] {
        if let Some(raw) = non_blank(raw) {
            match raw.parse::<u32>() {
                Ok(n) if n > 0 => *slot = Some(n),
                _ => errors.add(field, format!("{label} must be a positive integer")),
            }
        }
    }

    if errors.is_empty() {
        Ok(search)
    } else {
        Err(errors)
    }
}

#[utoipa::path(
    get,
    path = "/finance/appointments",
    tag = "finance",
    params(SearchQuery),
    responses(
        (status = 200, description = "One page of matching appointments, newest first", body = SearchRes),
        (status = 400, description = "Malformed filter", body = ErrorBody),
        (status = 403, description = "Not a finance user", body = ErrorBody)
    )
)]
/// Search appointments across all doctors and patients.
#[axum::debug_handler(state = AppState)]
pub async fn search(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ApiResponse<SearchRes>>> {
    user.require(Action::SearchAppointments)?;
    let filters = parse_search(&query).map_err(kayan_core::CoreError::Validation)?;

    let page = state.finance.search(&filters).await?;
    let res = SearchRes {
        appointments: page.appointments.into_iter().map(appointment_res).collect(),
        pagination: PaginationRes {
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages,
        },
    };
    Ok(Json(ApiResponse::ok(res, "Appointments retrieved successfully")))
}

#[utoipa::path(
    post,
    path = "/finance/appointments/{id}/review",
    tag = "finance",
    params(("id" = Uuid, Path, description = "Appointment id")),
    request_body = ReviewReq,
    responses(
        (status = 200, description = "Review recorded, replacing any earlier one", body = FinanceReviewRes),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Not a finance user", body = ErrorBody),
        (status = 404, description = "Appointment not found", body = ErrorBody)
    )
)]
/// Approve or reject an appointment's billing.
#[axum::debug_handler(state = AppState)]
pub async fn review(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(appointment_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ReviewReq>,
) -> ApiResult<Json<ApiResponse<FinanceReviewRes>>> {
    user.require(Action::ReviewAppointment)?;
    let Some(approved) = req.approved else {
        return Err(ApiError::Core(FieldErrors::single(
            "approved",
            "Approval status is required",
        )));
    };

    let review = state
        .finance
        .review(appointment_id, user.id, approved, req.notes.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok(
        review_res(review, None),
        "Appointment reviewed successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_collects_every_problem() {
        let query = SearchQuery {
            appointment_id: Some("nope".into()),
            status: Some("pending".into()),
            from: Some("yesterday".into()),
            page: Some("0".into()),
            ..SearchQuery::default()
        };
        let errors = parse_search(&query).expect_err("four bad fields");
        assert!(errors.get("appointmentId").is_some());
        assert!(errors.get("status").is_some());
        assert!(errors.get("from").is_some());
        assert!(errors.get("page").is_some());
    }

    #[test]
    fn test_parse_search_ignores_blank_filters() {
        let query = SearchQuery {
            doctor: Some("  ".into()),
            status: Some("in_progress".into()),
            limit: Some("5".into()),
            ..SearchQuery::default()
        };
        let search = parse_search(&query).expect("valid");
        assert!(search.doctor.is_none());
        assert_eq!(search.status, Some(AppointmentStatus::InProgress));
        assert_eq!(search.limit, Some(5));
    }
}
