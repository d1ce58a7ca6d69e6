//! sea-orm entity definitions.

pub mod device;
pub mod device_user;
pub mod measurement;
pub mod user;
