/// JWT Claims structure
///
/// Payload of an access token: registered claims only (RFC 7519).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::TokenError;

/// Issuer stamped into, and required from, every access token
pub const ISSUER: &str = "chirpy";

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Build claims for `user_id` valid for `ttl` from `now`.
    ///
    /// `iat` and `exp` come from the same instant so the window is well
    /// formed. A non-positive `ttl` produces claims that are already expired.
    pub fn new(user_id: Uuid, now: DateTime<Utc>, ttl: Duration) -> Self {
        let issued_at = now.timestamp();
        let expires_at = now
            .checked_add_signed(ttl)
            .map(|t| t.timestamp())
            .unwrap_or(issued_at);

        Self {
            iss: ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: issued_at,
            exp: expires_at,
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns `InvalidSubject` if the subject is not a UUID
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::InvalidSubject)
    }

    /// A token is valid strictly before `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}
