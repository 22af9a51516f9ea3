/// User Routes
///
/// Account creation and credential update. The update route sits behind
/// [`crate::middleware::JwtMiddleware`].

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::routes::UserResponse;
use crate::session::SessionService;

/// Email and plaintext password, as sent on registration and update
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/users
///
/// # Errors
/// - 400: Non-conforming JSON, blank email or empty password
/// - 409: Email already registered
/// - 500: Hashing or storage failure
pub async fn create_user(
    form: web::Json<CredentialsRequest>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let user = session.register(&form.email, &form.password).await?;
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// PUT /api/users
///
/// Requires `Authorization: Bearer <access_token>`; updates the caller's own
/// account.
///
/// # Errors
/// - 400: Non-conforming JSON, blank email or empty password
/// - 401: Missing, expired or invalid access token
/// - 404: The caller's account no longer exists
/// - 409: Email belongs to another account
pub async fn update_user(
    caller: web::ReqData<AuthenticatedUser>,
    form: web::Json<CredentialsRequest>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let user = session
        .update_credentials(caller.user_id, &form.email, &form.password)
        .await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
