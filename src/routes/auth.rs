/// Authentication Routes
///
/// Login, access-token renewal and refresh-token revocation.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{fail_fast, AppError};
use crate::session::SessionService;
use crate::store::User;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User view returned on registration, credential update and login
#[derive(Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub is_chirpy_red: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            created_at: user.created_at,
            updated_at: user.updated_at,
            email: user.email,
            is_chirpy_red: user.is_chirpy_red,
            token: None,
            refresh_token: None,
        }
    }
}

impl UserResponse {
    fn with_tokens(user: User, token: String, refresh_token: String) -> Self {
        Self {
            token: Some(token),
            refresh_token: Some(refresh_token),
            ..Self::from(user)
        }
    }
}

/// Fresh access token returned on renewal
#[derive(Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /api/login
///
/// Authenticate with email and password.
///
/// # Errors
/// - 400: Non-conforming JSON
/// - 401: Unknown email or wrong password (same response for both)
/// - 500: Storage failure
pub async fn login(
    form: web::Json<LoginRequest>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let outcome = session
        .login(&form.email, &form.password)
        .await
        .map_err(fail_fast)?;

    Ok(HttpResponse::Ok().json(UserResponse::with_tokens(
        outcome.user,
        outcome.access_token,
        outcome.refresh_token,
    )))
}

/// POST /api/refresh
///
/// Requires `Authorization: Bearer <refresh_token>`. The refresh token is
/// kept as is; only a new access token is issued.
///
/// # Errors
/// - 400: Malformed authorization header
/// - 401: Missing, unknown, revoked or expired refresh token
/// - 500: Storage failure
pub async fn refresh(
    req: HttpRequest,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let token = session.renew(req.headers()).await?;
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

/// POST /api/revoke
///
/// Requires `Authorization: Bearer <refresh_token>`.
///
/// # Errors
/// - 400: Malformed authorization header
/// - 401: Missing authorization header
/// - 404: Unknown or already revoked refresh token
/// - 500: Storage failure
pub async fn revoke(
    req: HttpRequest,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    session.revoke(req.headers()).await?;
    Ok(HttpResponse::NoContent().finish())
}
