mod auth;
mod health_check;
mod users;
mod webhooks;

pub use auth::{login, refresh, revoke, LoginRequest, TokenResponse, UserResponse};
pub use health_check::health_check;
pub use users::{create_user, update_user, CredentialsRequest};
pub use webhooks::{polka_webhook, WebhookData, WebhookRequest};
