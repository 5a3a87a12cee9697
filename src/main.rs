use api_rest::{AppState, ServerConfig};
use kayan_core::{CoreConfig, Db};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Kayan appointment server
///
/// Loads configuration once, opens and migrates the database, then serves the REST API until
/// Ctrl-C or SIGTERM.
///
/// # Environment Variables
/// - `DATABASE_URL`: SQLite database URL (default: "sqlite://kayan.db")
/// - `JWT_ACCESS_SECRET` / `JWT_REFRESH_SECRET`: token signing secrets (required, must differ)
/// - `ACCESS_TOKEN_EXPIRES_IN` / `REFRESH_TOKEN_EXPIRES_IN`: token lifetimes (default: "15m" / "7d")
/// - `BCRYPT_SALT_ROUNDS`: bcrypt cost (default: 10)
/// - `KAYAN_REST_ADDR`: REST server address (default: "0.0.0.0:4000")
/// - `CORS_ORIGIN`: allowed browser origin (default: "http://localhost:5173")
/// - `KAYAN_ENV`: `production` marks token cookies `Secure`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kayan=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(CoreConfig::from_env()?);
    let server = ServerConfig::from_env()?;

    let db = Db::connect(cfg.database_url()).await?;
    db.migrate().await?;

    let listener = tokio::net::TcpListener::bind(server.addr()).await?;
    tracing::info!("++ Starting Kayan REST on {}", listener.local_addr()?);

    let state = AppState::new(db.clone(), cfg, server);
    api_rest::serve(listener, state, shutdown_signal()).await?;

    db.close().await;
    tracing::info!("-- Kayan REST stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
