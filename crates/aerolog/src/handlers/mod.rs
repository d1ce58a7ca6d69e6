//! http handlers for aerolog api endpoints.

mod auth;
mod device_users;
mod devices;
mod error;
mod health;
mod measurements;

#[cfg(test)]
pub mod test_helpers;

pub use auth::{login, register};
pub use device_users::{device_enroll, device_login};
pub use devices::{get_device, list_user_devices, register_device};
pub use error::{ApiError, OptionExt, ResultExt};
pub use health::health;
pub use measurements::{
    ingest_measurement, latest_measurement, list_measurements, recent_measurements,
};
