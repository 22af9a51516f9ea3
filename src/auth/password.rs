/// Password Hashing and Verification
///
/// Salted one-way hashing with bcrypt. The produced hash is self-describing:
/// it embeds the algorithm version, the work factor and the salt.

use bcrypt::{hash, verify};

/// Fixed bcrypt work factor
const BCRYPT_COST: u32 = 10;

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(#[from] bcrypt::BcryptError);

/// Hash a password using bcrypt with a freshly drawn salt
///
/// Two calls on the same plaintext never return the same hash.
///
/// # Errors
/// Returns error only if bcrypt itself fails
pub fn hash_password(password: &str) -> Result<String, HashError> {
    Ok(hash(password, BCRYPT_COST)?)
}

/// Verify a password against its stored hash
///
/// Wrong password, malformed hash and empty input all yield `false`. The
/// cause is deliberately not reported to the caller.
pub fn verify_password(hash: &str, password: &str) -> bool {
    if hash.is_empty() || password.is_empty() {
        return false;
    }

    match verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::debug!(error = %e, "Stored password hash could not be checked");
            false
        }
    }
}
