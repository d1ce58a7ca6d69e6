//! core types for aerolog - an air-quality telemetry backend.
//!
//! this crate provides the fundamental data structures used throughout aerolog:
//! - [`MacAddr`]: canonical device hardware address
//! - [`DeviceKeyToken`]: the long-lived per-device credential
//! - [`User`], [`Device`], [`DeviceUserLink`], [`Measurement`]: domain entities
//! - [`Config`]: application configuration

#![warn(missing_docs)]

mod config;
mod device;
mod device_key;
mod link;
mod mac;
mod measurement;
pub mod password;
mod user;

pub use config::{Config, DatabaseConfig, IngestConfig, SqliteConfig};
pub use device::{Device, DeviceId, AUTO_REGISTERED_LOCATION, AUTO_REGISTERED_NAME};
pub use device_key::{DeviceKeyToken, DeviceKeyTokenError, DEVICE_KEY_HEX_LEN, DEVICE_KEY_PREFIX};
pub use link::{DeviceUserLink, LinkId};
pub use mac::{normalize_mac, MacAddr, MacAddrError};
pub use measurement::{validate_ranges, Measurement, MeasurementError, MeasurementId};
pub use user::{User, UserId};
