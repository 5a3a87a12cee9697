//! SQLite connection pool and schema management.
//!
//! Every mutating appointment operation runs in a transaction whose first statement writes the
//! target row (see [`lock_appointment`]). SQLite then holds the database write lock for the rest
//! of the transaction, so the checks that follow cannot race with another writer.

use crate::constants::MAX_DB_CONNECTIONS;
use crate::CoreResult;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Tables dropped by [`Db::reset`], children first.
const TABLES: &[&str] = &[
    "refresh_tokens",
    "finance_reviews",
    "treatments",
    "appointments",
    "users",
    "_sqlx_migrations",
];

/// Handle to the application database.
#[derive(Clone, Debug)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Opens (creating if needed) the database at `url`.
    ///
    /// Schema migrations are not applied; call [`Db::migrate`] for that.
    pub async fn connect(url: &str) -> CoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_DB_CONNECTIONS)
            .connect_with(options)
            .await?;

        tracing::debug!(url, "database pool opened");
        Ok(Self { pool })
    }

    /// Applies pending migrations.
    pub async fn migrate(&self) -> CoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    /// Drops every table and re-applies the migrations.
    pub async fn reset(&self) -> CoreResult<()> {
        for table in TABLES {
            sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
                .execute(&self.pool)
                .await?;
        }
        tracing::warn!("database reset");
        self.migrate().await
    }

    /// Round-trips a trivial query.
    pub async fn ping(&self) -> CoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) async fn begin(&self) -> CoreResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Takes the write lock on an appointment row by writing it unchanged.
///
/// Returns `false` when no such appointment exists.
pub(crate) async fn lock_appointment(
    conn: &mut SqliteConnection,
    appointment_id: Uuid,
) -> CoreResult<bool> {
    let result = sqlx::query("UPDATE appointments SET updated_at = updated_at WHERE id = ?")
        .bind(appointment_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
