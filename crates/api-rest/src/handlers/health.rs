use crate::AppState;
use api_shared::{ApiResponse, HealthRes};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Database reachable", body = HealthRes),
        (status = 503, description = "Database unreachable", body = HealthRes)
    )
)]
/// Liveness plus a database round trip.
#[axum::debug_handler(state = AppState)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<HealthRes>>) {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::ok(HealthRes::healthy(), "Service healthy")),
        ),
        Err(err) => {
            tracing::error!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    success: false,
                    message: "Service unhealthy".into(),
                    data: HealthRes::unhealthy(),
                }),
            )
        }
    }
}
