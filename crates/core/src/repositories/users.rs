//! Accounts.

use crate::config::CoreConfig;
use crate::db::Db;
use crate::error::{is_unique_violation, CoreError, CoreResult};
use crate::models::user::UserRow;
use crate::models::{Role, User, UserSummary};
use crate::password::hash_password;
use crate::validation::validate_signup;
use chrono::Utc;
use sqlx::SqliteConnection;
use std::sync::Arc;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, full_name, email, password_hash, role, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct UserService {
    db: Db,
    cfg: Arc<CoreConfig>,
}

impl UserService {
    pub fn new(db: Db, cfg: Arc<CoreConfig>) -> Self {
        Self { db, cfg }
    }

    /// Registers a new account.
    ///
    /// All fields are validated together; a taken email fails with `EmailTaken`. The password
    /// is stored only as a bcrypt hash.
    pub async fn signup(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> CoreResult<User> {
        let input = validate_signup(full_name, email, password, role)?;

        {
            let mut conn = self.db.pool().acquire().await?;
            if find_row_by_email(&mut conn, input.email.as_str())
                .await?
                .is_some()
            {
                return Err(CoreError::EmailTaken);
            }
        }

        let password_hash = hash_password(&input.password, self.cfg.bcrypt_cost()).await?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            full_name: input.full_name.into_inner(),
            email: input.email.as_str().to_owned(),
            role: input.role,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO users (id, full_name, email, password_hash, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&password_hash)
        .bind(user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.db.pool())
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                CoreError::EmailTaken
            } else {
                CoreError::Database(err)
            }
        })?;

        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Loads a user by id.
    pub async fn find(&self, id: Uuid) -> CoreResult<User> {
        let mut conn = self.db.pool().acquire().await?;
        find_by_id(&mut conn, id)
            .await?
            .ok_or(CoreError::UserNotFound)
    }

    /// Doctors ordered by full name.
    pub async fn list_doctors(&self) -> CoreResult<Vec<UserSummary>> {
        let doctors = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, full_name, email FROM users WHERE role = ? ORDER BY full_name ASC",
        )
        .bind(Role::Doctor)
        .fetch_all(self.db.pool())
        .await?
        .into_iter()
        .map(|(id, full_name, email)| UserSummary {
            id,
            full_name,
            email,
        })
        .collect();
        Ok(doctors)
    }
}

pub(crate) async fn find_by_id(conn: &mut SqliteConnection, id: Uuid) -> CoreResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(User::from))
}

pub(crate) async fn find_row_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> CoreResult<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Loads a user and checks its role, failing with `missing` otherwise.
pub(crate) async fn find_with_role(
    conn: &mut SqliteConnection,
    id: Uuid,
    role: Role,
    missing: CoreError,
) -> CoreResult<User> {
    match find_by_id(conn, id).await? {
        Some(user) if user.role == role => Ok(user),
        _ => Err(missing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_user, test_cfg, test_db};

    #[tokio::test]
    async fn test_signup_normalises_and_hides_password() {
        let (_dir, db) = test_db().await;
        let users = UserService::new(db.clone(), test_cfg());

        let user = users
            .signup(" Grace Hopper ", "Grace@Example.COM", "secret1", "doctor")
            .await
            .unwrap();
        assert_eq!(user.full_name, "Grace Hopper");
        assert_eq!(user.email, "grace@example.com");
        assert_eq!(user.role, Role::Doctor);

        let stored: (String,) = sqlx::query_as("SELECT password_hash FROM users WHERE id = ?")
            .bind(user.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_ne!(stored.0, "secret1");
        assert!(stored.0.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_signup_rejects_taken_email_case_insensitively() {
        let (_dir, db) = test_db().await;
        seed_user(&db, "Ada", "ada@example.com", Role::Patient).await;

        let err = UserService::new(db, test_cfg())
            .signup("Ada Again", "ADA@example.com", "secret1", "patient")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::EmailTaken));
    }

    #[tokio::test]
    async fn test_signup_validation_creates_nothing() {
        let (_dir, db) = test_db().await;
        let err = UserService::new(db.clone(), test_cfg())
            .signup("A", "bad", "1", "root")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_list_doctors_orders_by_name_and_skips_other_roles() {
        let (_dir, db) = test_db().await;
        seed_user(&db, "Zed Doctor", "zed@example.com", Role::Doctor).await;
        seed_user(&db, "Amy Doctor", "amy@example.com", Role::Doctor).await;
        seed_user(&db, "Pat Patient", "pat@example.com", Role::Patient).await;

        let doctors = UserService::new(db, test_cfg()).list_doctors().await.unwrap();
        let names: Vec<_> = doctors.iter().map(|d| d.full_name.as_str()).collect();
        assert_eq!(names, ["Amy Doctor", "Zed Doctor"]);
    }

    #[tokio::test]
    async fn test_find_unknown_user() {
        let (_dir, db) = test_db().await;
        let err = UserService::new(db, test_cfg())
            .find(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UserNotFound));
    }
}
