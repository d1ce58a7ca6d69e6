//! device-user link type.
//!
//! a link binds a device to a user account and carries the credential
//! state for that pairing. the link starts keyless after login and gains
//! a key hash exactly once, when the device completes enrollment. only
//! the sha-256 hash of the issued key is stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::DeviceId;
use crate::device_key::DeviceKeyToken;
use crate::user::UserId;

/// unique identifier for a device-user link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl From<u64> for LinkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a device-to-user pairing, at most one per (device, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceUserLink {
    /// unique identifier.
    pub id: LinkId,

    /// the linked device.
    pub device_id: DeviceId,

    /// the linked user.
    pub user_id: UserId,

    /// hex-encoded sha-256 hash of the issued device key, if one has
    /// been issued. never the raw key.
    #[serde(skip_serializing, default)]
    pub api_key_hash: Option<String>,

    /// when the link was created.
    pub created_at: DateTime<Utc>,
}

impl DeviceUserLink {
    /// create a new keyless link.
    pub fn new(device_id: DeviceId, user_id: UserId) -> Self {
        Self {
            id: LinkId(0),
            device_id,
            user_id,
            api_key_hash: None,
            created_at: Utc::now(),
        }
    }

    /// whether a device key has been issued on this link.
    pub fn is_keyed(&self) -> bool {
        self.api_key_hash.is_some()
    }

    /// record the hash of a freshly issued key.
    pub fn set_key(&mut self, token: &DeviceKeyToken) {
        self.api_key_hash = Some(token.hash_hex());
    }

    /// check a presented token against the stored hash.
    ///
    /// constant-time on the hash comparison; a keyless link rejects
    /// every token.
    pub fn verify_key(&self, token: &DeviceKeyToken) -> bool {
        match &self.api_key_hash {
            Some(stored) => token.verify_hash_hex(stored),
            None => false,
        }
    }
}
