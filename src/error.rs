/// Application Error Handling
///
/// Every failure inside the service folds into [`AppError`]. The module covers:
/// 1. Startup (configuration) errors that abort the process before serving
/// 2. Authentication failure reasons (logged, never shown to clients)
/// 3. The unified application error and its conversions from leaf errors
/// 4. HTTP response mapping with generic, leak-free bodies

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::auth::{EntropyError, HashError, HeaderError, TokenError};
use crate::store::StoreError;

/// ============================================================================
/// 1. STARTUP ERRORS
/// ============================================================================

/// Configuration errors. Any of these is fatal at startup.
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
    Load(config::ConfigError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(key) => write!(f, "Missing required config: {}", key),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::Load(e) => write!(f, "Config load error: {}", e),
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Load(e) => Some(e),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err)
    }
}

/// ============================================================================
/// 2. AUTHENTICATION FAILURE REASONS
/// ============================================================================

/// Why a caller was not authenticated.
///
/// The reason is only ever logged. Clients receive the same generic 401
/// whatever the variant.
#[derive(Debug)]
pub enum AuthError {
    InvalidCredentials,
    MissingCredentials,
    TokenRejected(TokenError),
    RefreshTokenNotFound,
    RefreshTokenRevoked,
    RefreshTokenExpired,
    InvalidApiKey,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::MissingCredentials => write!(f, "Missing authorization header"),
            AuthError::TokenRejected(e) => write!(f, "Access token rejected: {}", e),
            AuthError::RefreshTokenNotFound => write!(f, "Unknown refresh token"),
            AuthError::RefreshTokenRevoked => write!(f, "Refresh token has been revoked"),
            AuthError::RefreshTokenExpired => write!(f, "Refresh token has expired"),
            AuthError::InvalidApiKey => write!(f, "Invalid API key"),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 3. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug)]
pub enum AppError {
    /// Bad header shape, bad JSON, bad identifier
    InputMalformed(String),
    Unauthenticated(AuthError),
    /// Caller is known but does not own the resource
    Forbidden,
    NotFound(String),
    /// Unique value already taken, e.g. a registered email
    Conflict(String),
    Storage(StoreError),
    /// The secure random source failed; the process must not keep serving
    Entropy(EntropyError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InputMalformed(msg) => write!(f, "Malformed input: {}", msg),
            AppError::Unauthenticated(e) => write!(f, "Unauthenticated: {}", e),
            AppError::Forbidden => write!(f, "Caller does not own the resource"),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Storage(e) => write!(f, "{}", e),
            AppError::Entropy(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Unauthenticated(err)
    }
}

impl From<HeaderError> for AppError {
    fn from(err: HeaderError) -> Self {
        match err {
            HeaderError::Missing => AppError::Unauthenticated(AuthError::MissingCredentials),
            HeaderError::Malformed => {
                AppError::InputMalformed("malformed authorization header".to_string())
            }
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Config | TokenError::Signing(_) => AppError::Internal(err.to_string()),
            rejected => AppError::Unauthenticated(AuthError::TokenRejected(rejected)),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("record not found".to_string()),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            other => AppError::Storage(other),
        }
    }
}

impl From<HashError> for AppError {
    fn from(err: HashError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<EntropyError> for AppError {
    fn from(err: EntropyError) -> Self {
        AppError::Entropy(err)
    }
}

// ============================================================================
// 4. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID, also attached to the server-side log line
    pub error_id: String,
    /// Generic human-readable message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::InputMalformed(_) => (
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                "Invalid request",
            ),
            // One body for every cause so the response is not an oracle
            AppError::Unauthenticated(_) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Unauthorized",
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Action not permitted",
            ),
            AppError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Resource not found",
            ),
            AppError::Conflict(_) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                "Resource already exists",
            ),
            AppError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Database error occurred",
            ),
            AppError::Entropy(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            ),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message.to_string(),
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::InputMalformed(msg) => {
                tracing::warn!(request_id = request_id, error = %msg, "Malformed input");
            }
            AppError::Unauthenticated(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Forbidden => {
                tracing::warn!(request_id = request_id, "Caller tried to act on a resource it does not own");
            }
            AppError::NotFound(msg) => {
                tracing::info!(request_id = request_id, error = %msg, "Not found");
            }
            AppError::Conflict(msg) => {
                tracing::warn!(request_id = request_id, error = %msg, "Conflict");
            }
            AppError::Storage(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Entropy(e) => {
                tracing::error!(request_id = request_id, error = %e, "Secure random source failed");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InputMalformed(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) | AppError::Entropy(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Stop the process after the secure random source failed.
///
/// Handlers route [`AppError::Entropy`] through here instead of answering the
/// request: no further tokens may be minted from a broken source.
pub fn fail_fast(err: AppError) -> AppError {
    if let AppError::Entropy(e) = &err {
        tracing::error!(error = %e, "Terminating: secure random source is unavailable");
        std::process::exit(70);
    }
    err
}
