//! # API REST
//!
//! HTTP surface of the Kayan appointment system.
//!
//! Routes validate and decode requests, apply role guards, call into `kayan-core` services and
//! wrap results in the `api-shared` envelope. OpenAPI is served at `/api-docs/openapi.json` with
//! a Swagger UI at `/swagger-ui`.

pub mod auth;
pub mod config;
pub mod convert;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod openapi;

#[cfg(test)]
mod tests;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use openapi::ApiDoc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use handlers::{appointments, auth as auth_routes, finance, health, treatments, users};
use kayan_core::{
    AppointmentService, AuthService, CoreConfig, Db, FinanceService, TreatmentService,
    UserService,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub(crate) db: Db,
    pub(crate) cfg: Arc<CoreConfig>,
    pub(crate) server: Arc<ServerConfig>,
    pub(crate) users: UserService,
    pub(crate) auth: AuthService,
    pub(crate) appointments: AppointmentService,
    pub(crate) treatments: TreatmentService,
    pub(crate) finance: FinanceService,
}

impl AppState {
    pub fn new(db: Db, cfg: Arc<CoreConfig>, server: ServerConfig) -> Self {
        Self {
            users: UserService::new(db.clone(), cfg.clone()),
            auth: AuthService::new(db.clone(), cfg.clone()),
            appointments: AppointmentService::new(db.clone()),
            treatments: TreatmentService::new(db.clone()),
            finance: FinanceService::new(db.clone()),
            server: Arc::new(server),
            db,
            cfg,
        }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }
}

/// Builds the full router: API routes, OpenAPI docs, CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(state.server.cors_origin().clone())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let auth = Router::new()
        .route("/signup", post(auth_routes::signup))
        .route("/login", post(auth_routes::login))
        .route("/refresh", post(auth_routes::refresh))
        .route("/logout", post(auth_routes::logout));

    Router::new()
        .route("/health", get(health::health))
        .nest("/auth", auth)
        .route("/doctors", get(users::list_doctors))
        .route("/profile", get(users::profile))
        .route(
            "/patients/:id/appointments",
            get(appointments::list_for_patient).post(appointments::create_for_patient),
        )
        .route(
            "/doctors/:id/appointments",
            get(appointments::list_for_doctor).post(appointments::create_for_doctor),
        )
        .route("/appointments/:id/start", post(appointments::start))
        .route("/appointments/:id/finish", post(appointments::finish))
        .route(
            "/appointments/:id/treatments",
            post(treatments::add_treatment),
        )
        .route(
            "/appointments/:id/treatments/:treatment_id",
            delete(treatments::remove_treatment),
        )
        .route("/finance/appointments", get(finance::search))
        .route("/finance/appointments/:id/review", post(finance::review))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serves [`app`] on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await
}
