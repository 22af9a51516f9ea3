/// Authentication module
///
/// Password hashing, access-token (JWT) issuance and validation,
/// refresh-token generation and lifecycle state, and `Authorization`
/// header parsing.

mod claims;
mod credentials;
mod jwt;
mod password;
mod refresh_token;

pub use claims::{Claims, ISSUER};
pub use credentials::{api_key, bearer_token, HeaderError};
pub use jwt::{issue_access_token, validate_access_token, TokenError};
pub use password::{hash_password, verify_password, HashError};
pub use refresh_token::{generate_refresh_token, EntropyError, RefreshToken, RefreshTokenState};
