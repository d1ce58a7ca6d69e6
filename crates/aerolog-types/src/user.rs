//! user account type.
//!
//! users own devices through device-user links and can query the
//! measurements their devices upload. accounts are created via the
//! registration endpoint or the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a user account.
///
/// username and email are stored lowercase and are unique across the
/// system. `password_hash` is a phc-format argon2 string - the plaintext
/// password is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// unique identifier.
    pub id: UserId,

    /// login name, lowercase, unique.
    pub username: String,

    /// email address, lowercase, unique.
    pub email: String,

    /// argon2 phc-format password hash.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// when the account was created.
    pub created_at: DateTime<Utc>,

    /// when the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// create a new user record, lowercasing the identifiers.
    pub fn new(username: &str, email: &str, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId(0),
            username: username.to_lowercase(),
            email: email.to_lowercase(),
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}
