//! validated device key token type.
//!
//! device keys are the long-lived credential a device receives from the
//! enrollment handshake and presents on every measurement upload. tokens
//! must:
//! - Start with "aqkey-"
//! - Have exactly 64 hex characters (32 random bytes)
//!
//! only the sha-256 hash of a token is ever persisted; the raw token is
//! handed to the caller exactly once, at issuance.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// length of the hex portion (32 bytes = 64 hex chars).
pub const DEVICE_KEY_HEX_LEN: usize = 64;

/// the prefix for all device key tokens.
pub const DEVICE_KEY_PREFIX: &str = "aqkey-";

/// a validated device key token string.
///
/// # Example
/// ```
/// use aerolog_types::DeviceKeyToken;
///
/// let token = DeviceKeyToken::generate();
/// assert!(token.as_str().starts_with("aqkey-"));
/// assert!(token.verify_hash(&token.hash()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceKeyToken(String);

impl DeviceKeyToken {
    /// create a new device key token, validating the format.
    pub fn new(s: impl Into<String>) -> Result<Self, DeviceKeyTokenError> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// generate a new random device key token (32 bytes of entropy).
    pub fn generate() -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        let bytes: [u8; 32] = rng.random();
        Self(format!("{}{}", DEVICE_KEY_PREFIX, hex::encode(bytes)))
    }

    /// get the full token string (e.g., "aqkey-...").
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// get just the hex portion (64 characters).
    pub fn hex_part(&self) -> &str {
        &self.0[DEVICE_KEY_PREFIX.len()..]
    }

    /// consume the token and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// get the prefix portion for display (aqkey- + first 12 hex chars).
    ///
    /// this is safe to show in logs as it does not contain enough entropy
    /// to reconstruct the full token.
    pub fn prefix(&self) -> &str {
        &self.0[..DEVICE_KEY_PREFIX.len() + 12]
    }

    /// compute the sha-256 hash of the full token.
    ///
    /// this hash is what gets persisted on the device-user link.
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hasher.finalize().into()
    }

    /// hex-encoded form of [`hash`](Self::hash), as stored in the database.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }

    /// verify that this token matches a stored hash using constant-time comparison.
    pub fn verify_hash(&self, stored_hash: &[u8]) -> bool {
        let computed = self.hash();
        computed.ct_eq(stored_hash).into()
    }

    /// verify against the hex-encoded stored form.
    pub fn verify_hash_hex(&self, stored_hash_hex: &str) -> bool {
        match hex::decode(stored_hash_hex) {
            Ok(stored) => self.verify_hash(&stored),
            Err(_) => false,
        }
    }

    fn validate(s: &str) -> Result<(), DeviceKeyTokenError> {
        if !s.starts_with(DEVICE_KEY_PREFIX) {
            return Err(DeviceKeyTokenError::MissingPrefix);
        }

        let hex_part = &s[DEVICE_KEY_PREFIX.len()..];

        if hex_part.len() != DEVICE_KEY_HEX_LEN {
            return Err(DeviceKeyTokenError::InvalidLength {
                expected: DEVICE_KEY_HEX_LEN,
                got: hex_part.len(),
            });
        }

        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DeviceKeyTokenError::InvalidHex);
        }

        Ok(())
    }
}

impl fmt::Display for DeviceKeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceKeyToken {
    type Err = DeviceKeyTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for DeviceKeyToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// error type for invalid device key tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceKeyTokenError {
    /// token does not start with "aqkey-".
    #[error("device key token must start with 'aqkey-'")]
    MissingPrefix,

    /// hex portion has wrong length.
    #[error("device key token hex portion must be {expected} characters, got {got}")]
    InvalidLength {
        /// expected length.
        expected: usize,
        /// actual length.
        got: usize,
    },

    /// hex portion contains non-hex characters.
    #[error("device key token hex portion contains invalid characters")]
    InvalidHex,
}

// serde implementation - deserialize with validation
impl<'de> Deserialize<'de> for DeviceKeyToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for DeviceKeyToken {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}
