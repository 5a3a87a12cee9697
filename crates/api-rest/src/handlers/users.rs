use crate::auth::AuthUser;
use crate::convert::{summary_res, user_res};
use crate::error::ApiResult;
use crate::AppState;
use api_shared::{ApiResponse, ErrorBody, UserRes, UserSummaryRes};
use axum::extract::State;
use axum::Json;

#[utoipa::path(
    get,
    path = "/doctors",
    tag = "users",
    responses(
        (status = 200, description = "All doctors, by name", body = [UserSummaryRes]),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
/// List doctors so a patient can pick one when booking.
#[axum::debug_handler(state = AppState)]
pub async fn list_doctors(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<UserSummaryRes>>>> {
    let doctors = state.users.list_doctors().await?;
    let doctors = doctors.into_iter().map(summary_res).collect();
    Ok(Json(ApiResponse::ok(doctors, "Doctors retrieved successfully")))
}

#[utoipa::path(
    get,
    path = "/profile",
    tag = "users",
    responses(
        (status = 200, description = "The signed-in account", body = UserRes),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<UserRes>>> {
    let user = state.users.find(user.id).await?;
    Ok(Json(ApiResponse::ok(
        user_res(user),
        "Profile retrieved successfully",
    )))
}
