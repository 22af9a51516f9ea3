/// Credential extraction from the `Authorization` header.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("authorization header not found")]
    Missing,
    #[error("malformed authorization header")]
    Malformed,
}

const BEARER_SCHEME: &str = "bearer";
const API_KEY_SCHEME: &str = "apikey";

/// Credential presented as `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<String, HeaderError> {
    credential(headers, BEARER_SCHEME)
}

/// Credential presented as `Authorization: ApiKey <key>`
pub fn api_key(headers: &HeaderMap) -> Result<String, HeaderError> {
    credential(headers, API_KEY_SCHEME)
}

fn credential(headers: &HeaderMap, scheme: &str) -> Result<String, HeaderError> {
    let value = headers.get(AUTHORIZATION).ok_or(HeaderError::Missing)?;
    let value = value.to_str().map_err(|_| HeaderError::Malformed)?;
    if value.is_empty() {
        return Err(HeaderError::Missing);
    }

    let mut fields = value.split_whitespace();
    match (fields.next(), fields.next()) {
        (Some(kind), Some(credential)) if kind.eq_ignore_ascii_case(scheme) => {
            Ok(credential.to_string())
        }
        _ => Err(HeaderError::Malformed),
    }
}
