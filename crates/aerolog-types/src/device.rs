//! device type representing a physical air-quality sensor.
//!
//! devices are identified by their mac address. a device row is created
//! either explicitly (owner registers it with a name and location) or
//! implicitly when an unknown device completes the enrollment handshake.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mac::MacAddr;
use crate::user::UserId;

/// name given to devices that register themselves via the handshake.
pub const AUTO_REGISTERED_NAME: &str = "Auto-registered device";

/// location given to devices that register themselves via the handshake.
pub const AUTO_REGISTERED_LOCATION: &str = "Unknown";

/// unique identifier for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub u64);

impl From<u64> for DeviceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a registered sensor device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// unique identifier.
    pub id: DeviceId,

    /// hardware mac address, canonical form, unique.
    pub mac: MacAddr,

    /// human-readable name.
    pub name: String,

    /// where the device is installed.
    pub location: String,

    /// the user who registered the device.
    pub user_id: UserId,

    /// when the device row was created.
    pub registered_at: DateTime<Utc>,

    /// last time the device successfully uploaded a measurement.
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl Device {
    /// create a device row for an explicit owner registration.
    pub fn new(mac: MacAddr, name: String, location: String, user_id: UserId) -> Self {
        Self {
            id: DeviceId(0),
            mac,
            name,
            location,
            user_id,
            registered_at: Utc::now(),
            last_seen_at: None,
        }
    }

    /// create a device row for a handshake-initiated registration.
    ///
    /// name and location get placeholder values the owner can edit later.
    pub fn auto_registered(mac: MacAddr, user_id: UserId) -> Self {
        Self::new(
            mac,
            AUTO_REGISTERED_NAME.to_string(),
            AUTO_REGISTERED_LOCATION.to_string(),
            user_id,
        )
    }
}
