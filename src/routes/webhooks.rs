use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::session::SessionService;
use crate::store::StoreError;

const USER_UPGRADED: &str = "user.upgraded";

#[derive(Deserialize)]
pub struct WebhookRequest {
    pub event: String,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Deserialize, Default)]
pub struct WebhookData {
    #[serde(default)]
    pub user_id: String,
}

/// POST /api/polka/webhooks
///
/// Payment-provider callback, authenticated with `Authorization: ApiKey <key>`.
/// Events other than `user.upgraded` are acknowledged and ignored.
///
/// The body is taken raw and decoded only after the key checks out.
///
/// # Errors
/// - 400: Malformed authorization header, non-conforming JSON or user id
/// - 401: Missing or wrong API key
/// - 404: Unknown user
pub async fn polka_webhook(
    req: HttpRequest,
    body: web::Bytes,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    session.verify_api_key(req.headers())?;

    let payload: WebhookRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Rejected non-conforming webhook body");
        AppError::InputMalformed("non-conforming JSON received".to_string())
    })?;

    if payload.event != USER_UPGRADED {
        return Ok(HttpResponse::NoContent().finish());
    }

    let user_id = Uuid::parse_str(&payload.data.user_id)
        .map_err(|_| AppError::InputMalformed("webhook user_id is not a UUID".to_string()))?;

    session.users().upgrade_user(user_id).await.map_err(|e| match e {
        StoreError::NotFound => AppError::NotFound(format!("user {}", user_id)),
        other => AppError::Storage(other),
    })?;

    tracing::info!(user_id = %user_id, "User upgraded");
    Ok(HttpResponse::NoContent().finish())
}
