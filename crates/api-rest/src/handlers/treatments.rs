use crate::auth::AuthUser;
use crate::convert::{parse_cost, treatment_res};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use api_shared::{ApiResponse, CreateTreatmentReq, ErrorBody, TreatmentAddedRes, TreatmentRemovedRes};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use kayan_core::{Action, FieldErrors};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/appointments/{id}/treatments",
    tag = "treatments",
    params(("id" = Uuid, Path, description = "Appointment id")),
    request_body = CreateTreatmentReq,
    responses(
        (status = 201, description = "Treatment added; total recomputed", body = TreatmentAddedRes),
        (status = 400, description = "Validation failed, or appointment not in progress", body = ErrorBody),
        (status = 403, description = "Not this appointment's doctor", body = ErrorBody),
        (status = 404, description = "Appointment not found", body = ErrorBody)
    )
)]
/// Add a billable treatment to an in-progress visit.
#[axum::debug_handler(state = AppState)]
pub async fn add_treatment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(appointment_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateTreatmentReq>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TreatmentAddedRes>>)> {
    user.require(Action::ManageTreatments)?;

    let mut errors = FieldErrors::new();
    let name = req.name.unwrap_or_default();
    if name.trim().is_empty() {
        errors.add("name", "Treatment name is required");
    }
    let cost = match req.cost.as_ref().filter(|v| !v.is_null()) {
        None => {
            errors.add("cost", "Cost is required");
            None
        }
        Some(raw) => {
            let parsed = parse_cost(raw);
            if parsed.is_none() {
                errors.add("cost", "Cost must be a number");
            }
            parsed
        }
    };
    errors.into_result()?;
    let Some(cost) = cost else {
        return Err(ApiError::BadRequest("Invalid request body".into()));
    };

    let change = state
        .treatments
        .add(appointment_id, user.id, &name, cost)
        .await?;
    let Some(treatment) = change.treatment else {
        return Err(kayan_core::CoreError::TreatmentNotFound.into());
    };

    let res = TreatmentAddedRes {
        treatment: treatment_res(treatment),
        doctor_id: change.doctor_id,
        total_amount: change.total_amount,
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(res, "Treatment added successfully")),
    ))
}

#[utoipa::path(
    delete,
    path = "/appointments/{id}/treatments/{treatment_id}",
    tag = "treatments",
    params(
        ("id" = Uuid, Path, description = "Appointment id"),
        ("treatment_id" = Uuid, Path, description = "Treatment id")
    ),
    responses(
        (status = 200, description = "Treatment removed; total recomputed", body = TreatmentRemovedRes),
        (status = 400, description = "Appointment not in progress", body = ErrorBody),
        (status = 403, description = "Not this appointment's doctor", body = ErrorBody),
        (status = 404, description = "Appointment or treatment not found", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn remove_treatment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((appointment_id, treatment_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<ApiResponse<TreatmentRemovedRes>>> {
    user.require(Action::ManageTreatments)?;
    let change = state
        .treatments
        .remove(appointment_id, treatment_id, user.id)
        .await?;

    let res = TreatmentRemovedRes {
        doctor_id: change.doctor_id,
        total_amount: change.total_amount,
    };
    Ok(Json(ApiResponse::ok(res, "Treatment deleted successfully")))
}
