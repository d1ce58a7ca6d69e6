//! password hashing for user accounts.
//!
//! argon2id with per-password random salts. the phc-format hash string is
//! what gets stored; verification parses the stored string and re-derives.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// error type for password hashing failures.
#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(String);

/// hash a plaintext password into a phc-format string.
pub fn hash(plaintext: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| PasswordHashError(e.to_string()))?;
    Ok(hash.to_string())
}

/// verify a plaintext password against a stored phc-format hash.
///
/// returns `false` both for a mismatched password and for an unparseable
/// stored hash - callers never learn which.
pub fn verify(stored_hash: &str, plaintext: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}
