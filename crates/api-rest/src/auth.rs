//! Request authentication and the token cookies.
//!
//! An access token is accepted from `Authorization: Bearer <token>` first, then from the
//! `accessToken` cookie. Refresh tokens travel in the `refreshToken` cookie or in the request
//! body.

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use kayan_core::{Action, CoreError, Role, TokenPair};
use uuid::Uuid;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// The verified caller of a protected route.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// Fails with 403 `Insufficient permissions` unless the caller's role permits `action`.
    pub fn require(&self, action: Action) -> ApiResult<()> {
        if self.role.permits(action) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.id, role = %self.role, ?action, "role denied");
            Err(ApiError::Forbidden("Insufficient permissions"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let token = bearer_token(parts)
            .or_else(|| {
                CookieJar::from_headers(&parts.headers)
                    .get(ACCESS_COOKIE)
                    .map(|c| c.value().to_owned())
            })
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthenticated("No token provided"))?;

        let claims = state.auth.verify_access_token(&token)?;

        // The account may have been removed after the token was issued.
        let user = state.users.find(claims.sub).await.map_err(|err| match err {
            CoreError::UserNotFound => ApiError::Unauthenticated("User not found"),
            other => other.into(),
        })?;

        Ok(AuthUser {
            id: user.id,
            email: user.email,
            role: user.role,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_owned())
}

/// The refresh token from the cookie, else from the body.
pub fn presented_refresh_token(jar: &CookieJar, body: Option<String>) -> Option<String> {
    jar.get(REFRESH_COOKIE)
        .map(|c| c.value().to_owned())
        .or(body)
        .filter(|t| !t.is_empty())
}

// ============================================================================
// Cookies
// ============================================================================

pub fn set_token_cookies(jar: CookieJar, tokens: &TokenPair, state: &AppState) -> CookieJar {
    let jwt = state.cfg.jwt();
    jar.add(token_cookie(
        ACCESS_COOKIE,
        tokens.access_token.clone(),
        jwt.access_ttl().num_seconds(),
        state.server.secure_cookies(),
    ))
    .add(token_cookie(
        REFRESH_COOKIE,
        tokens.refresh_token.clone(),
        jwt.refresh_ttl().num_seconds(),
        state.server.secure_cookies(),
    ))
}

/// Overwrites both token cookies with expired blanks, whether or not the request sent them.
pub fn clear_token_cookies(jar: CookieJar, state: &AppState) -> CookieJar {
    let secure = state.server.secure_cookies();
    jar.add(token_cookie(ACCESS_COOKIE, String::new(), 0, secure))
        .add(token_cookie(REFRESH_COOKIE, String::new(), 0, secure))
}

fn token_cookie(
    name: &'static str,
    value: String,
    max_age_secs: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/profile");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).expect("request").into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc"))).as_deref(), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn test_refresh_token_prefers_cookie() {
        let jar = CookieJar::new().add(Cookie::new(REFRESH_COOKIE, "from-cookie"));
        assert_eq!(
            presented_refresh_token(&jar, Some("from-body".into())).as_deref(),
            Some("from-cookie")
        );
        assert_eq!(
            presented_refresh_token(&CookieJar::new(), Some("from-body".into())).as_deref(),
            Some("from-body")
        );
        assert_eq!(presented_refresh_token(&CookieJar::new(), Some(String::new())), None);
    }

    #[test]
    fn test_token_cookie_attributes() {
        let cookie = token_cookie(ACCESS_COOKIE, "tok".into(), 900, false);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(900)));
        assert_eq!(cookie.path(), Some("/"));
    }
}
