use crate::auth::AuthUser;
use crate::convert::{appointment_res, non_blank, parse_timestamp};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use api_shared::{
    ApiResponse, AppointmentRes, CreateAppointmentReq, DoctorCreateAppointmentReq, ErrorBody,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use kayan_core::{Action, AppointmentDetails, FieldErrors, Role};
use uuid::Uuid;

fn parse_counterpart_id(
    raw: Option<&String>,
    field: &str,
    label: &str,
    errors: &mut FieldErrors,
) -> Option<Uuid> {
    match non_blank(raw) {
        None => {
            errors.add(field, format!("{label} ID is required"));
            None
        }
        Some(text) => match Uuid::parse_str(text) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add(field, format!("Invalid {} ID format", label.to_lowercase()));
                None
            }
        },
    }
}

fn parse_scheduled_time(raw: Option<&String>, errors: &mut FieldErrors) -> Option<DateTime<Utc>> {
    match non_blank(raw) {
        None => {
            errors.add("scheduled_time", "Scheduled time is required");
            None
        }
        Some(text) => {
            let parsed = parse_timestamp(text);
            if parsed.is_none() {
                errors.add("scheduled_time", "Invalid date format");
            }
            parsed
        }
    }
}

fn list_res(appointments: Vec<AppointmentDetails>) -> Vec<AppointmentRes> {
    appointments.into_iter().map(appointment_res).collect()
}

/// Listing guard: a patient-role caller, or the owner of the path id.
fn may_list(user: &AuthUser, owner_role: Role, owner_id: Uuid) -> ApiResult<()> {
    if user.role == owner_role || user.id == owner_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Unauthorized"))
    }
}

#[utoipa::path(
    post,
    path = "/patients/{id}/appointments",
    tag = "appointments",
    params(("id" = Uuid, Path, description = "Patient id; must be the caller")),
    request_body = CreateAppointmentReq,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentRes),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Not a patient, or not this patient", body = ErrorBody),
        (status = 404, description = "Doctor not found", body = ErrorBody)
    )
)]
/// A patient books a visit with a doctor.
#[axum::debug_handler(state = AppState)]
pub async fn create_for_patient(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(patient_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateAppointmentReq>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AppointmentRes>>)> {
    user.require(Action::BookAppointment)?;
    if patient_id != user.id {
        return Err(ApiError::Forbidden(
            "You can only create appointments for yourself",
        ));
    }

    let mut errors = FieldErrors::new();
    let doctor_id = parse_counterpart_id(req.doctor_id.as_ref(), "doctor_id", "Doctor", &mut errors);
    let scheduled_time = parse_scheduled_time(req.scheduled_time.as_ref(), &mut errors);
    errors.into_result()?;
    let (Some(doctor_id), Some(scheduled_time)) = (doctor_id, scheduled_time) else {
        return Err(ApiError::BadRequest("Invalid request body".into()));
    };

    let created = state
        .appointments
        .create(user.id, doctor_id, scheduled_time)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            appointment_res(created),
            "Appointment created successfully",
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/doctors/{id}/appointments",
    tag = "appointments",
    params(("id" = Uuid, Path, description = "Doctor id; must be the caller")),
    request_body = DoctorCreateAppointmentReq,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentRes),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Not a doctor, or not this doctor", body = ErrorBody),
        (status = 404, description = "Patient not found", body = ErrorBody)
    )
)]
/// A doctor books a visit for one of their patients.
#[axum::debug_handler(state = AppState)]
pub async fn create_for_doctor(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(doctor_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<DoctorCreateAppointmentReq>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AppointmentRes>>)> {
    user.require(Action::ScheduleForPatient)?;
    if doctor_id != user.id {
        return Err(ApiError::Forbidden(
            "You can only create appointments for yourself",
        ));
    }

    let mut errors = FieldErrors::new();
    let patient_id =
        parse_counterpart_id(req.patient_id.as_ref(), "patient_id", "Patient", &mut errors);
    let scheduled_time = parse_scheduled_time(req.scheduled_time.as_ref(), &mut errors);
    errors.into_result()?;
    let (Some(patient_id), Some(scheduled_time)) = (patient_id, scheduled_time) else {
        return Err(ApiError::BadRequest("Invalid request body".into()));
    };

    let created = state
        .appointments
        .create(patient_id, user.id, scheduled_time)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            appointment_res(created),
            "Appointment created successfully",
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/appointments",
    tag = "appointments",
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Newest first, with doctor, treatments and review", body = [AppointmentRes]),
        (status = 403, description = "Caller may not list these", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn list_for_patient(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(patient_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<AppointmentRes>>>> {
    may_list(&user, Role::Patient, patient_id)?;
    let appointments = state.appointments.list_for_patient(patient_id).await?;
    Ok(Json(ApiResponse::ok(
        list_res(appointments),
        "Appointments retrieved successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/doctors/{id}/appointments",
    tag = "appointments",
    params(("id" = Uuid, Path, description = "Doctor id")),
    responses(
        (status = 200, description = "Newest first, with patient, treatments and review", body = [AppointmentRes]),
        (status = 403, description = "Caller may not list these", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn list_for_doctor(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(doctor_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<AppointmentRes>>>> {
    may_list(&user, Role::Doctor, doctor_id)?;
    let appointments = state.appointments.list_for_doctor(doctor_id).await?;
    Ok(Json(ApiResponse::ok(
        list_res(appointments),
        "Appointments retrieved successfully",
    )))
}

#[utoipa::path(
    post,
    path = "/appointments/{id}/start",
    tag = "appointments",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Visit started", body = AppointmentRes),
        (status = 400, description = "Appointment is not scheduled", body = ErrorBody),
        (status = 403, description = "Not this appointment's doctor", body = ErrorBody),
        (status = 404, description = "Appointment not found", body = ErrorBody),
        (status = 409, description = "Doctor already has a visit in progress", body = ErrorBody)
    )
)]
/// Move a scheduled appointment to `in_progress`.
#[axum::debug_handler(state = AppState)]
pub async fn start(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(appointment_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<AppointmentRes>>> {
    user.require(Action::RunVisit)?;
    let started = state.appointments.start(appointment_id, user.id).await?;
    Ok(Json(ApiResponse::ok(
        appointment_res(started),
        "Appointment started successfully",
    )))
}

#[utoipa::path(
    post,
    path = "/appointments/{id}/finish",
    tag = "appointments",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Visit completed", body = AppointmentRes),
        (status = 400, description = "Appointment is not in progress", body = ErrorBody),
        (status = 403, description = "Not this appointment's doctor", body = ErrorBody),
        (status = 404, description = "Appointment not found", body = ErrorBody)
    )
)]
/// Move an in-progress appointment to `completed`.
#[axum::debug_handler(state = AppState)]
pub async fn finish(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(appointment_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<AppointmentRes>>> {
    user.require(Action::RunVisit)?;
    let finished = state.appointments.finish(appointment_id, user.id).await?;
    Ok(Json(ApiResponse::ok(
        appointment_res(finished),
        "Appointment finished successfully",
    )))
}
