use chrono::Duration;

use crate::error::ConfigError;

/// Longest refresh-token lifetime accepted, about a century
pub const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 36_500;
/// Longest access-token lifetime accepted, same horizon in seconds
pub const MAX_ACCESS_TOKEN_TTL_SECONDS: i64 = MAX_REFRESH_TOKEN_TTL_DAYS * 24 * 60 * 60;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Token and webhook secrets. Loaded once, read-only afterwards.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub signing_secret: String,
    /// Shared key the payment provider presents on its webhook
    pub polka_key: String,
    #[serde(default = "default_access_token_ttl_seconds")]
    pub access_token_ttl_seconds: i64,
    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: i64,
}

impl AuthSettings {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_ttl_seconds)
    }

    /// Both secrets must be present before any traffic is served, and both
    /// lifetimes must keep every computed expiry inside chrono's range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.signing_secret".to_string()));
        }
        if self.polka_key.is_empty() {
            return Err(ConfigError::MissingRequired("auth.polka_key".to_string()));
        }
        if !(1..=MAX_ACCESS_TOKEN_TTL_SECONDS).contains(&self.access_token_ttl_seconds) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.access_token_ttl_seconds must be between 1 and {}",
                MAX_ACCESS_TOKEN_TTL_SECONDS
            )));
        }
        if !(1..=MAX_REFRESH_TOKEN_TTL_DAYS).contains(&self.refresh_token_ttl_days) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.refresh_token_ttl_days must be between 1 and {}",
                MAX_REFRESH_TOKEN_TTL_DAYS
            )));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_access_token_ttl_seconds() -> i64 {
    60 * 60
}

fn default_refresh_token_ttl_days() -> i64 {
    60
}

/// Read `configuration.yaml` (optional) overlaid with `APP_*` environment
/// variables, e.g. `APP_AUTH__SIGNING_SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.auth.validate()?;
    Ok(settings)
}
