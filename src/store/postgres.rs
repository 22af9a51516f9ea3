use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{RefreshTokenStore, StoreError, User, UserDirectory};
use crate::auth::RefreshToken;

/// SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres-backed user directory and refresh-token store
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the users and refresh-token schema migrations
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn email_conflict(err: sqlx::Error, email: &str) -> StoreError {
    let taken = matches!(
        &err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION)
    );
    if taken {
        StoreError::Conflict(format!("email {} already registered", email))
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl UserDirectory for PostgresStore {
    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        let now = Utc::now();

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, created_at, updated_at, email, hashed_password, is_chirpy_red)
            VALUES ($1, $2, $2, $3, $4, false)
            RETURNING id, created_at, updated_at, email, hashed_password, is_chirpy_red
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| email_conflict(e, email))
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $2, hashed_password = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, created_at, updated_at, email, hashed_password, is_chirpy_red
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(hashed_password)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| email_conflict(e, email))?
        .ok_or(StoreError::NotFound)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, created_at, updated_at, email, hashed_password, is_chirpy_red
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, created_at, updated_at, email, hashed_password, is_chirpy_red
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn upgrade_user(&self, id: Uuid) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_chirpy_red = true, updated_at = $2
            WHERE id = $1
            RETURNING id, created_at, updated_at, email, hashed_password, is_chirpy_red
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl RefreshTokenStore for PostgresStore {
    async fn store(
        &self,
        token: &str,
        user_id: Uuid,
        ttl_days: i64,
    ) -> Result<RefreshToken, StoreError> {
        let record = RefreshToken::new(token.to_string(), user_id, ttl_days, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, created_at, updated_at, user_id, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, NULL)
            "#,
        )
        .bind(&record.token)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.user_id)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn lookup(&self, token: &str) -> Result<RefreshToken, StoreError> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT token, created_at, updated_at, user_id, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET updated_at = $1, revoked_at = $1
            WHERE token = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(now)
        .bind(token)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}
