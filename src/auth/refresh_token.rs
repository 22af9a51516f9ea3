/// Refresh Token Management
///
/// Refresh tokens are:
/// - 32 bytes from the OS random source, hex-encoded (64 lowercase chars)
/// - Persisted with their owner and a fixed expiry; the token value is the key
/// - Revocable exactly once; revocation and expiry are both terminal
/// - Never rotated on renewal
///
/// Persistence lives behind [`crate::store::RefreshTokenStore`].

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

/// Number of random bytes behind each refresh token
const REFRESH_TOKEN_BYTES: usize = 32;

/// The secure random source failed.
///
/// Not recoverable: the caller must stop the process instead of retrying.
#[derive(Debug, thiserror::Error)]
#[error("secure random source failed: {0}")]
pub struct EntropyError(#[from] rand::Error);

/// Generate a new refresh token
pub fn generate_refresh_token() -> Result<String, EntropyError> {
    let mut key = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut key)?;
    Ok(hex::encode(key))
}

/// Persisted refresh token row
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of a refresh token, evaluated at read time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    Expired,
    Revoked,
}

impl RefreshToken {
    /// Build a fresh, active row expiring `ttl_days` days after `now`
    pub fn new(token: String, user_id: Uuid, ttl_days: i64, now: DateTime<Utc>) -> Self {
        Self {
            token,
            created_at: now,
            updated_at: now,
            user_id,
            expires_at: now + Duration::days(ttl_days),
            revoked_at: None,
        }
    }

    /// Revocation wins over expiry when both apply.
    pub fn state_at(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.revoked_at.is_some() {
            RefreshTokenState::Revoked
        } else if now >= self.expires_at {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }
}
