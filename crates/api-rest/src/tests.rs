//! Router-level tests driving the full middleware stack with `oneshot`.

use crate::{app, AppState, ServerConfig};
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use kayan_core::{CoreConfig, Db, JwtSettings};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

async fn test_app() -> (TempDir, Router) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("kayan.db").display());
    let db = Db::connect(&url).await.expect("connect");
    db.migrate().await.expect("migrate");

    let jwt = JwtSettings::new(
        "rest-access-secret",
        "rest-refresh-secret",
        Duration::minutes(15),
        Duration::days(7),
    )
    .expect("jwt settings");
    let cfg = Arc::new(CoreConfig::new(url, jwt, 4).expect("core config"));
    let server = ServerConfig::new("127.0.0.1:0".into(), "http://localhost:5173", false)
        .expect("server config");

    (dir, app(AppState::new(db, cfg, server)))
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .expect("request");

    let res = app.clone().oneshot(req).await.expect("response");
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    Reply {
        status,
        headers,
        body,
    }
}

async fn signup(app: &Router, name: &str, email: &str, role: &str) -> String {
    let reply = call(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "full_name": name, "email": email, "password": "secret1", "role": role })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.body["data"]["id"]
        .as_str()
        .expect("user id")
        .to_owned()
}

async fn login(app: &Router, email: &str) -> (String, String) {
    let reply = call(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": "secret1" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    (
        reply.body["data"]["accessToken"]
            .as_str()
            .expect("access token")
            .to_owned(),
        reply.body["data"]["refreshToken"]
            .as_str()
            .expect("refresh token")
            .to_owned(),
    )
}

fn tomorrow() -> String {
    (Utc::now() + Duration::days(1)).to_rfc3339()
}

#[tokio::test]
async fn test_health_reports_database() {
    let (_dir, app) = test_app().await;
    let reply = call(&app, "GET", "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], true);
    assert_eq!(reply.body["data"]["status"], "healthy");
    assert_eq!(reply.body["data"]["database"], "connected");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (_dir, app) = test_app().await;
    let reply = call(&app, "GET", "/api-docs/openapi.json", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["paths"]["/appointments/{id}/start"].is_object());
}

#[tokio::test]
async fn test_signup_validation_and_conflict() {
    let (_dir, app) = test_app().await;

    let reply = call(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "full_name": "A", "email": "bad", "password": "123", "role": "admin" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Validation failed");
    for field in ["full_name", "email", "password", "role"] {
        assert!(reply.body["errors"][field].is_array(), "missing {field}");
    }

    signup(&app, "Dr Who", "who@example.com", "doctor").await;
    let reply = call(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "full_name": "Other", "email": "WHO@example.com", "password": "secret1", "role": "patient"
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["success"], false);
}

#[tokio::test]
async fn test_malformed_body_uses_error_envelope() {
    let (_dir, app) = test_app().await;
    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let res = app.clone().oneshot(req).await.expect("response");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("body");
    let body: Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_login_sets_cookies_and_cookie_authenticates() {
    let (_dir, app) = test_app().await;
    signup(&app, "Pat Smith", "pat@example.com", "patient").await;

    let reply = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "pat@example.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let cookies: Vec<&str> = reply
        .headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    let access = cookies
        .iter()
        .find(|c| c.starts_with("accessToken="))
        .expect("access cookie");
    assert!(access.contains("HttpOnly"));
    assert!(access.contains("SameSite=Lax"));
    assert!(access.contains("Max-Age=900"));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));

    let pair = access.split(';').next().expect("cookie pair");
    let req = Request::builder()
        .uri("/profile")
        .header(COOKIE, pair)
        .body(Body::empty())
        .expect("request");
    let res = app.clone().oneshot(req).await.expect("response");
    assert_eq!(res.status(), StatusCode::OK);

    let reply = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "pat@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_protected_routes_need_a_valid_token() {
    let (_dir, app) = test_app().await;

    let reply = call(&app, "GET", "/profile", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["message"], "No token provided");

    let reply = call(&app, "GET", "/profile", Some("garbage"), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["message"], "Invalid token");
}

#[tokio::test]
async fn test_refresh_rotates_and_rejects_replay() {
    let (_dir, app) = test_app().await;
    signup(&app, "Pat Smith", "pat@example.com", "patient").await;
    let (_, refresh) = login(&app, "pat@example.com").await;

    let reply = call(
        &app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    let rotated = reply.body["data"]["refreshToken"].as_str().expect("rotated");
    assert_ne!(rotated, refresh);

    let reply = call(
        &app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = call(&app, "POST", "/auth/refresh", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["message"], "Refresh token not provided");
}

#[tokio::test]
async fn test_logout_always_succeeds_and_revokes() {
    let (_dir, app) = test_app().await;
    signup(&app, "Pat Smith", "pat@example.com", "patient").await;
    let (_, refresh) = login(&app, "pat@example.com").await;

    let reply = call(&app, "POST", "/auth/logout", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = call(
        &app,
        "POST",
        "/auth/logout",
        None,
        Some(json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply
        .headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|c| c.starts_with("refreshToken=") && c.contains("Max-Age=0")));

    let reply = call(
        &app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_visit_lifecycle_over_http() {
    let (_dir, app) = test_app().await;
    let doctor_id = signup(&app, "Dr Grey", "grey@example.com", "doctor").await;
    let patient_id = signup(&app, "Pat Smith", "pat@example.com", "patient").await;
    signup(&app, "Fin Ance", "fin@example.com", "finance").await;
    let (doctor, _) = login(&app, "grey@example.com").await;
    let (patient, _) = login(&app, "pat@example.com").await;
    let (finance, _) = login(&app, "fin@example.com").await;

    // Patient books two visits.
    let mut ids = Vec::new();
    for _ in 0..2 {
        let reply = call(
            &app,
            "POST",
            &format!("/patients/{patient_id}/appointments"),
            Some(&patient),
            Some(json!({ "doctor_id": doctor_id, "scheduled_time": tomorrow() })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        assert_eq!(reply.body["data"]["status"], "scheduled");
        assert_eq!(reply.body["data"]["total_amount"], "0.00");
        assert_eq!(reply.body["data"]["doctor"]["full_name"], "Dr Grey");
        ids.push(reply.body["data"]["id"].as_str().expect("id").to_owned());
    }

    let reply = call(
        &app,
        "POST",
        &format!("/appointments/{}/start", ids[0]),
        Some(&patient),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["message"], "Insufficient permissions");

    let reply = call(
        &app,
        "POST",
        &format!("/appointments/{}/start", ids[0]),
        Some(&doctor),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["data"]["status"], "in_progress");

    let reply = call(
        &app,
        "POST",
        &format!("/appointments/{}/start", ids[1]),
        Some(&doctor),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = call(
        &app,
        "POST",
        &format!("/appointments/{}/treatments", ids[0]),
        Some(&doctor),
        Some(json!({ "name": "X-Ray", "cost": 150 })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["data"]["total_amount"], "150.00");
    let treatment_id = reply.body["data"]["id"].as_str().expect("id").to_owned();

    let reply = call(
        &app,
        "POST",
        &format!("/appointments/{}/treatments", ids[0]),
        Some(&doctor),
        Some(json!({ "name": "Consult", "cost": "50" })),
    )
    .await;
    assert_eq!(reply.body["data"]["total_amount"], "200.00");

    let reply = call(
        &app,
        "POST",
        &format!("/appointments/{}/treatments", ids[0]),
        Some(&doctor),
        Some(json!({ "name": "Free", "cost": 0 })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = call(
        &app,
        "DELETE",
        &format!("/appointments/{}/treatments/{treatment_id}", ids[0]),
        Some(&doctor),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["data"]["total_amount"], "50.00");

    let reply = call(
        &app,
        "POST",
        &format!("/appointments/{}/finish", ids[0]),
        Some(&doctor),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["status"], "completed");

    let reply = call(
        &app,
        "POST",
        &format!("/appointments/{}/finish", ids[0]),
        Some(&doctor),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.body["message"],
        "Appointment must be in progress to finish"
    );

    let reply = call(
        &app,
        "POST",
        &format!("/finance/appointments/{}/review", ids[0]),
        Some(&finance),
        Some(json!({ "approved": true, "notes": "  ok  " })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["data"]["notes"], "ok");

    let reply = call(
        &app,
        "GET",
        "/finance/appointments?status=completed&doctor=grey",
        Some(&finance),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["data"]["pagination"]["total"], 1);
    assert_eq!(reply.body["data"]["pagination"]["totalPages"], 1);
    let found = &reply.body["data"]["appointments"][0];
    assert_eq!(found["total_amount"], "50.00");
    assert_eq!(found["finance_review"]["approved"], true);
    assert_eq!(found["finance_review"]["finance_user"]["full_name"], "Fin Ance");

    let reply = call(
        &app,
        "GET",
        "/finance/appointments",
        Some(&doctor),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = call(
        &app,
        "GET",
        &format!("/doctors/{doctor_id}/appointments"),
        Some(&doctor),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"].as_array().expect("list").len(), 2);
}

#[tokio::test]
async fn test_booking_guards_and_field_errors() {
    let (_dir, app) = test_app().await;
    let doctor_id = signup(&app, "Dr Grey", "grey@example.com", "doctor").await;
    let patient_id = signup(&app, "Pat Smith", "pat@example.com", "patient").await;
    let other_id = signup(&app, "Other Person", "other@example.com", "patient").await;
    let (patient, _) = login(&app, "pat@example.com").await;
    let (doctor, _) = login(&app, "grey@example.com").await;

    let reply = call(
        &app,
        "POST",
        &format!("/patients/{other_id}/appointments"),
        Some(&patient),
        Some(json!({ "doctor_id": doctor_id, "scheduled_time": tomorrow() })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(
        reply.body["message"],
        "You can only create appointments for yourself"
    );

    let reply = call(
        &app,
        "POST",
        &format!("/patients/{patient_id}/appointments"),
        Some(&patient),
        Some(json!({ "doctor_id": "not-a-uuid" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["errors"]["doctor_id"].is_array());
    assert!(reply.body["errors"]["scheduled_time"].is_array());

    let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
    let reply = call(
        &app,
        "POST",
        &format!("/patients/{patient_id}/appointments"),
        Some(&patient),
        Some(json!({ "doctor_id": doctor_id, "scheduled_time": past })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["errors"]["scheduled_time"].is_array());

    let reply = call(
        &app,
        "POST",
        &format!("/doctors/{doctor_id}/appointments"),
        Some(&doctor),
        Some(json!({ "patient_id": patient_id, "scheduled_time": tomorrow() })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["data"]["patient"]["email"], "pat@example.com");

    let reply = call(
        &app,
        "GET",
        &format!("/doctors/{doctor_id}/appointments"),
        Some(&patient),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["message"], "Unauthorized");

    let reply = call(&app, "POST", "/appointments/nope/start", Some(&doctor), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = call(&app, "GET", "/doctors", Some(&patient), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"][0]["full_name"], "Dr Grey");
}
