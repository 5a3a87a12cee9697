use crate::auth::{clear_token_cookies, presented_refresh_token, set_token_cookies};
use crate::convert::user_res;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::AppState;
use api_shared::{
    ApiResponse, ErrorBody, LoginReq, LoginRes, RefreshReq, SignupReq, TokensRes, UserRes,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::CookieJar;

#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignupReq,
    responses(
        (status = 201, description = "Account created", body = UserRes),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
/// Register a patient, doctor or finance account.
#[axum::debug_handler(state = AppState)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupReq>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserRes>>)> {
    let user = state
        .users
        .signup(&req.full_name, &req.email, &req.password, &req.role)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(user_res(user), "User created successfully")),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Signed in; token cookies set", body = LoginRes),
        (status = 401, description = "Invalid email or password", body = ErrorBody)
    )
)]
/// Sign in and receive a fresh token pair, both in the body and as cookies.
#[axum::debug_handler(state = AppState)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginReq>,
) -> ApiResult<(CookieJar, Json<ApiResponse<LoginRes>>)> {
    let (user, tokens) = state.auth.login(&req.email, &req.password).await?;
    let jar = set_token_cookies(jar, &tokens, &state);

    let res = LoginRes {
        user: user_res(user),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    };
    Ok((jar, Json(ApiResponse::ok(res, "Login successful"))))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    request_body(content = RefreshReq, description = "Optional when the refreshToken cookie is sent"),
    responses(
        (status = 200, description = "Token pair rotated", body = TokensRes),
        (status = 401, description = "Missing, invalid, expired or already used token", body = ErrorBody)
    )
)]
/// Exchange a refresh token for a new pair. The presented token stops working.
#[axum::debug_handler(state = AppState)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshReq>>,
) -> ApiResult<(CookieJar, Json<ApiResponse<TokensRes>>)> {
    let presented = presented_refresh_token(&jar, body.and_then(|Json(b)| b.refresh_token))
        .ok_or(ApiError::Unauthenticated("Refresh token not provided"))?;

    let (_user, tokens) = state.auth.refresh(&presented).await?;
    let jar = set_token_cookies(jar, &tokens, &state);

    let res = TokensRes {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    };
    Ok((jar, Json(ApiResponse::ok(res, "Token refreshed successfully"))))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    request_body(content = RefreshReq, description = "Optional when the refreshToken cookie is sent"),
    responses((status = 200, description = "Signed out; token cookies cleared"))
)]
/// Revoke the presented refresh token, if any, and clear the token cookies. Always succeeds.
#[axum::debug_handler(state = AppState)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshReq>>,
) -> (CookieJar, Json<ApiResponse<()>>) {
    let presented = presented_refresh_token(&jar, body.and_then(|Json(b)| b.refresh_token));
    if let Err(err) = state.auth.logout(presented.as_deref()).await {
        tracing::warn!(error = %err, "failed to revoke refresh token on logout");
    }

    (
        clear_token_cookies(jar, &state),
        Json(ApiResponse::ok((), "Logout successful")),
    )
}
