//! Persisted calibration record and the key-value store it is kept in

use core::fmt;

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationCoefficients;

/// Keys of the per-axis offsets
pub const OFFSET_KEYS: [&str; 3] = [
    "prefCalibrationOffset0",
    "prefCalibrationOffset1",
    "prefCalibrationOffset2",
];
/// Keys of the per-axis gains
pub const GAIN_KEYS: [&str; 3] = [
    "prefCalibrationGain0",
    "prefCalibrationGain1",
    "prefCalibrationGain2",
];
/// Keys of the per-axis mounting angles
pub const ANGLE_KEYS: [&str; 3] = [
    "prefCalibrationAngle0",
    "prefCalibrationAngle1",
    "prefCalibrationAngle2",
];
/// Key of the calibration timestamp, milliseconds since the Unix epoch
pub const TIME_KEY: &str = "prefCalibrationTime";

/// Flat key-value storage provided by the host (preferences, NVS, files...)
pub trait KeyValueStore {
    /// Error reported by the backing storage
    type Error;

    /// Read a float, `None` when the key is absent
    fn get_f32(&self, key: &str) -> Result<Option<f32>, Self::Error>;

    /// Write a float
    fn put_f32(&mut self, key: &str, value: f32) -> Result<(), Self::Error>;

    /// Read an integer, `None` when the key is absent
    fn get_i64(&self, key: &str) -> Result<Option<i64>, Self::Error>;

    /// Write an integer
    fn put_i64(&mut self, key: &str, value: i64) -> Result<(), Self::Error>;
}

/// Calibration coefficients together with the time they were produced
///
/// The `Display` output is the "last calibration" summary shown before a new
/// run: gains and offsets to three decimals, angles to two.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoredCalibration {
    /// Solved coefficients
    pub coefficients: CalibrationCoefficients,
    /// Completion time in milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

impl StoredCalibration {
    /// Pair coefficients with their completion time
    pub fn new(coefficients: CalibrationCoefficients, timestamp_ms: i64) -> Self {
        Self {
            coefficients,
            timestamp_ms,
        }
    }

    /// Read the last calibration from `store`
    ///
    /// Returns `Ok(None)` when no calibration was ever saved, which is
    /// detected from the first angle key. Keys missing from a partially
    /// written record read as zero.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Option<Self>, S::Error> {
        if store.get_f32(ANGLE_KEYS[0])?.is_none() {
            return Ok(None);
        }

        let read = |keys: &[&str; 3]| -> Result<Vector3<f32>, S::Error> {
            Ok(Vector3::new(
                store.get_f32(keys[0])?.unwrap_or(0.0),
                store.get_f32(keys[1])?.unwrap_or(0.0),
                store.get_f32(keys[2])?.unwrap_or(0.0),
            ))
        };

        let coefficients = CalibrationCoefficients {
            offset: read(&OFFSET_KEYS)?,
            gain: read(&GAIN_KEYS)?,
            mounting_angle: read(&ANGLE_KEYS)?,
        };
        let timestamp_ms = store.get_i64(TIME_KEY)?.unwrap_or(0);

        Ok(Some(Self::new(coefficients, timestamp_ms)))
    }

    /// Write this calibration to `store`
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), S::Error> {
        let c = &self.coefficients;
        for axis in 0..3 {
            store.put_f32(ANGLE_KEYS[axis], c.mounting_angle[axis])?;
            store.put_f32(GAIN_KEYS[axis], c.gain[axis])?;
            store.put_f32(OFFSET_KEYS[axis], c.offset[axis])?;
        }
        store.put_i64(TIME_KEY, self.timestamp_ms)?;

        log::info!("calibration saved, timestamp {}", self.timestamp_ms);
        Ok(())
    }
}

impl fmt::Display for StoredCalibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let CalibrationCoefficients {
            offset,
            gain,
            mounting_angle,
        } = &self.coefficients;
        writeln!(f, "gains = {:.3}; {:.3}; {:.3}", gain.x, gain.y, gain.z)?;
        writeln!(
            f,
            "offsets = {:.3}; {:.3}; {:.3}",
            offset.x, offset.y, offset.z
        )?;
        write!(
            f,
            "angles = {:.2}°; {:.2}°; {:.2}°",
            mounting_angle.x, mounting_angle.y, mounting_angle.z
        )
    }
}
