/// Session Protocol
///
/// Registration, credential update, login, renewal, logout and the
/// resource-ownership guard. Each flow is a short sequence with no retries:
/// the first failing step ends it.

use std::sync::{Arc, OnceLock};

use actix_web::http::header::HeaderMap;
use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::{
    api_key, bearer_token, generate_refresh_token, hash_password, issue_access_token,
    validate_access_token, verify_password, RefreshTokenState,
};
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError};
use crate::store::{RefreshTokenStore, StoreError, User, UserDirectory};

/// Everything a successful login hands back
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct SessionService {
    users: Arc<dyn UserDirectory>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    settings: AuthSettings,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            settings,
        }
    }

    pub fn users(&self) -> &dyn UserDirectory {
        self.users.as_ref()
    }

    /// Create an account, storing only the bcrypt hash of `password`
    ///
    /// # Errors
    /// - `InputMalformed` for a blank email or an empty password
    /// - `Conflict` if the email is already registered
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AppError> {
        require_credentials(email, password)?;
        let hashed_password = hash_password(password)?;

        let user = self.users.create_user(email, &hashed_password).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Replace the email and password of the authenticated caller
    ///
    /// # Errors
    /// - `InputMalformed` for a blank email or an empty password
    /// - `NotFound` if the account no longer exists
    /// - `Conflict` if the new email belongs to another account
    pub async fn update_credentials(
        &self,
        user_id: Uuid,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        require_credentials(email, password)?;
        let hashed_password = hash_password(password)?;

        let user = self
            .users
            .update_credentials(user_id, email, &hashed_password)
            .await?;

        tracing::info!(user_id = %user.id, "User credentials updated");
        Ok(user)
    }

    /// Check a password and issue an access token plus a stored refresh token
    ///
    /// # Errors
    /// - `Unauthenticated` for an unknown email or a wrong password
    /// - `Storage` if the user or token storage fails
    /// - `Entropy` if no refresh token could be drawn
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let user = match self.users.get_user_by_email(email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                // Pay the same bcrypt cost as a wrong password
                verify_password(dummy_hash(), password);
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(AppError::Storage(e)),
        };

        if !verify_password(&user.hashed_password, password) {
            return Err(AuthError::InvalidCredentials.into());
        }

        let access_token = issue_access_token(
            user.id,
            &self.settings.signing_secret,
            self.settings.access_token_ttl(),
        )?;

        let refresh_token = generate_refresh_token()?;
        self.refresh_tokens
            .store(&refresh_token, user.id, self.settings.refresh_token_ttl_days)
            .await
            .map_err(AppError::Storage)?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutcome {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Mint a new access token from the refresh token in `headers`
    ///
    /// The refresh token must be neither revoked nor expired. It is not
    /// rotated.
    pub async fn renew(&self, headers: &HeaderMap) -> Result<String, AppError> {
        let token = bearer_token(headers)?;

        let record = match self.refresh_tokens.lookup(&token).await {
            Ok(record) => record,
            Err(StoreError::NotFound) => return Err(AuthError::RefreshTokenNotFound.into()),
            Err(e) => return Err(AppError::Storage(e)),
        };

        match record.state_at(Utc::now()) {
            RefreshTokenState::Active => {}
            RefreshTokenState::Revoked => return Err(AuthError::RefreshTokenRevoked.into()),
            RefreshTokenState::Expired => return Err(AuthError::RefreshTokenExpired.into()),
        }

        let access_token = issue_access_token(
            record.user_id,
            &self.settings.signing_secret,
            self.settings.access_token_ttl(),
        )?;

        tracing::info!(user_id = %record.user_id, "Access token renewed");
        Ok(access_token)
    }

    /// Revoke the refresh token in `headers`
    ///
    /// # Errors
    /// `NotFound` when the token is unknown or was already revoked
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let token = bearer_token(headers)?;

        self.refresh_tokens.revoke(&token).await.map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound("refresh token".to_string()),
            other => AppError::Storage(other),
        })?;

        tracing::info!("Refresh token revoked");
        Ok(())
    }

    /// Identify the caller from the access token in `headers`
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, AppError> {
        let token = bearer_token(headers)?;
        Ok(validate_access_token(&token, &self.settings.signing_secret)?)
    }

    /// Authenticate the caller and require that they own the resource
    ///
    /// # Errors
    /// - `Unauthenticated` when the caller cannot be identified
    /// - `Forbidden` when the caller is known but is not `owner_id`
    pub fn authorize_owner(&self, headers: &HeaderMap, owner_id: Uuid) -> Result<Uuid, AppError> {
        let caller = self.authenticate(headers)?;
        ensure_owner(caller, owner_id)?;
        Ok(caller)
    }

    /// Require the webhook key as `Authorization: ApiKey <key>`
    pub fn verify_api_key(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let presented = api_key(headers)?;
        if !keys_match(&presented, &self.settings.polka_key) {
            return Err(AuthError::InvalidApiKey.into());
        }
        Ok(())
    }
}

fn require_credentials(email: &str, password: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::InputMalformed(
            "email and password are required".to_string(),
        ));
    }
    Ok(())
}

/// Hash checked against when the email is unknown
fn dummy_hash() -> &'static str {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    DUMMY_HASH.get_or_init(|| hash_password("chirpy-unknown-account").unwrap_or_default())
}

/// `Forbidden` unless `caller` is `owner_id`.
pub fn ensure_owner(caller: Uuid, owner_id: Uuid) -> Result<(), AppError> {
    if caller != owner_id {
        tracing::warn!(user_id = %caller, owner_id = %owner_id, "Ownership check failed");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

// Digests have a fixed length, so the fold below runs the same number of
// steps whatever the inputs.
fn keys_match(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
