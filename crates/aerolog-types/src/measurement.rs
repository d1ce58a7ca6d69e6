//! measurement type and range validation.
//!
//! a measurement is one co2/temperature/humidity sample from a device.
//! samples are validated at the edge so that obviously impossible
//! sensor readings never reach storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::DeviceId;
use crate::link::LinkId;
use crate::user::UserId;

/// unique identifier for a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeasurementId(pub u64);

impl From<u64> for MeasurementId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MeasurementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a single air-quality sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    /// unique identifier.
    pub id: MeasurementId,

    /// the device that produced the sample.
    pub device_id: DeviceId,

    /// the owning user at upload time.
    pub user_id: UserId,

    /// the device-user link the upload was authenticated against.
    pub link_id: LinkId,

    /// co2 concentration in ppm.
    pub co2: f64,

    /// temperature in degrees celsius.
    pub temperature: f64,

    /// relative humidity in percent.
    pub humidity: f64,

    /// server-side receive timestamp.
    pub recorded_at: DateTime<Utc>,
}

impl Measurement {
    /// create a validated measurement, stamping the receive time.
    pub fn new(
        device_id: DeviceId,
        user_id: UserId,
        link_id: LinkId,
        co2: f64,
        temperature: f64,
        humidity: f64,
    ) -> Result<Self, MeasurementError> {
        validate_ranges(co2, temperature, humidity)?;
        Ok(Self {
            id: MeasurementId(0),
            device_id,
            user_id,
            link_id,
            co2,
            temperature,
            humidity,
            recorded_at: Utc::now(),
        })
    }
}

/// check a sample against physically plausible sensor ranges.
///
/// co2 must be in (0, 100000] ppm, temperature in [-100, 200] celsius,
/// humidity in [0, 100] percent. nan and infinity are rejected by the
/// same comparisons.
pub fn validate_ranges(co2: f64, temperature: f64, humidity: f64) -> Result<(), MeasurementError> {
    if !(co2 > 0.0 && co2 <= 100_000.0) {
        return Err(MeasurementError::Co2OutOfRange(co2));
    }
    if !(-100.0..=200.0).contains(&temperature) {
        return Err(MeasurementError::TemperatureOutOfRange(temperature));
    }
    if !(0.0..=100.0).contains(&humidity) {
        return Err(MeasurementError::HumidityOutOfRange(humidity));
    }
    Ok(())
}

/// error type for implausible sensor readings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeasurementError {
    /// co2 outside (0, 100000] ppm.
    #[error("co2 reading {0} ppm is outside the accepted range (0, 100000]")]
    Co2OutOfRange(f64),

    /// temperature outside [-100, 200] celsius.
    #[error("temperature reading {0} C is outside the accepted range [-100, 200]")]
    TemperatureOutOfRange(f64),

    /// humidity outside [0, 100] percent.
    #[error("humidity reading {0}% is outside the accepted range [0, 100]")]
    HumidityOutOfRange(f64),
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn in_range_samples_accepted(
            co2 in 0.1f64..=100_000.0,
            temp in -100.0f64..=200.0,
            hum in 0.0f64..=100.0,
        ) {
            prop_assert!(validate_ranges(co2, temp, hum).is_ok());
        }

        #[test]
        fn arbitrary_floats_never_panic(co2: f64, temp: f64, hum: f64) {
            let _ = validate_ranges(co2, temp, hum);
        }
    }
}
