/// JWT Token Generation and Validation
///
/// Access tokens are HS256-signed JWTs. They are never stored: validity is a
/// function of the signature and the timestamps at the moment of validation.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, ISSUER};

/// Reasons an access token cannot be issued or accepted
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("signing secret is empty")]
    Config,
    #[error("token signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token subject is not a user id")]
    InvalidSubject,
}

/// Issue a new access token for a user
///
/// # Arguments
/// * `user_id` - User's UUID, becomes the `sub` claim
/// * `secret` - HMAC signing secret
/// * `ttl` - Lifetime; a non-positive value yields an already-expired token
///
/// # Errors
/// Returns `Config` if `secret` is empty
pub fn issue_access_token(user_id: Uuid, secret: &str, ttl: Duration) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::Config);
    }

    let claims = Claims::new(user_id, Utc::now(), ttl);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Signing)
}

/// Validate an access token and return the user it was issued to
///
/// # Errors
/// Returns error if token is malformed, tampered with, expired, or carries a
/// subject that is not a user id
pub fn validate_access_token(token: &str, secret: &str) -> Result<Uuid, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::Config);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature => TokenError::BadSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => {
            tracing::debug!(error = %e, "Access token could not be decoded");
            TokenError::Malformed
        }
    })?;

    // jsonwebtoken still accepts exp == now
    if claims.is_expired_at(Utc::now()) {
        return Err(TokenError::Expired);
    }

    claims.user_id()
}
