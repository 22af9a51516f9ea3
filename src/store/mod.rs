/// Persistence
///
/// Storage traits consumed by the session flows, with a Postgres backend and
/// an in-memory one. Users are created and updated here; chirps and the rest
/// of the user profile belong to the wider application.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::RefreshToken;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("conflicting record: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A user as stored by the user service
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub hashed_password: String,
    pub is_chirpy_red: bool,
}

/// Users and their password hashes
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Insert a new user. `Conflict` if the email is taken.
    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, StoreError>;

    /// Replace email and password hash.
    ///
    /// `NotFound` if no such user, `Conflict` if another user has the email.
    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn get_user_by_id(&self, id: Uuid) -> Result<User, StoreError>;

    /// Grant the premium flag. `NotFound` if no such user.
    async fn upgrade_user(&self, id: Uuid) -> Result<User, StoreError>;
}

/// Lifecycle storage for refresh tokens.
///
/// Each method is a single-row operation; uniqueness of the token value and
/// atomicity of revocation are the backend's responsibility.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a new active token expiring `ttl_days` days from now.
    async fn store(&self, token: &str, user_id: Uuid, ttl_days: i64)
        -> Result<RefreshToken, StoreError>;

    async fn lookup(&self, token: &str) -> Result<RefreshToken, StoreError>;

    /// Mark an active token as revoked.
    ///
    /// Unknown and already revoked tokens both report `NotFound`.
    async fn revoke(&self, token: &str) -> Result<(), StoreError>;
}
