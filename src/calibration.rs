//! Offset, gain and mounting-angle solving from per-orientation means

use core::ops::{Index, IndexMut};

use log::{debug, info};
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};
use crate::math::Vector3Ext;
use crate::types::{ORIENTATION_COUNT, Orientation};

/// Stabilised mean accelerometer reading for each calibration orientation
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use clinometer_calibration::{Orientation, OrientationMeanTable};
///
/// let mut table = OrientationMeanTable::new();
/// table[Orientation::LeftSide] = Vector3::new(9.807, 0.0, 0.0);
/// assert_eq!(table[Orientation::LeftSide].x, 9.807);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrientationMeanTable {
    means: [Vector3<f32>; ORIENTATION_COUNT],
}

impl OrientationMeanTable {
    /// Table with every mean zeroed
    pub fn new() -> Self {
        Self {
            means: [Vector3::zeros(); ORIENTATION_COUNT],
        }
    }

    /// Table from means listed in orientation order
    pub fn from_means(means: [Vector3<f32>; ORIENTATION_COUNT]) -> Self {
        Self { means }
    }

    /// Means in orientation order
    pub fn means(&self) -> &[Vector3<f32>; ORIENTATION_COUNT] {
        &self.means
    }

    /// Iterate over `(orientation, mean)` pairs in orientation order
    pub fn iter(&self) -> impl Iterator<Item = (Orientation, &Vector3<f32>)> {
        Orientation::ALL.into_iter().zip(self.means.iter())
    }
}

impl Default for OrientationMeanTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<Orientation> for OrientationMeanTable {
    type Output = Vector3<f32>;

    fn index(&self, orientation: Orientation) -> &Vector3<f32> {
        &self.means[orientation.index()]
    }
}

impl IndexMut<Orientation> for OrientationMeanTable {
    fn index_mut(&mut self, orientation: Orientation) -> &mut Vector3<f32> {
        &mut self.means[orientation.index()]
    }
}

/// Accelerometer correction produced by a calibration run
///
/// The default value is the identity correction: zero offset, unit gain and
/// no mounting angle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationCoefficients {
    /// Per-axis bias in raw sensor units
    pub offset: Vector3<f32>,
    /// Per-axis scale from raw units to m/s²
    pub gain: Vector3<f32>,
    /// Residual misalignment of the sensor axes, in degrees
    pub mounting_angle: Vector3<f32>,
}

impl Default for CalibrationCoefficients {
    fn default() -> Self {
        Self {
            offset: Vector3::zeros(),
            gain: Vector3::new(1.0, 1.0, 1.0),
            mounting_angle: Vector3::zeros(),
        }
    }
}

impl CalibrationCoefficients {
    /// Apply offset and gain correction to a raw reading
    ///
    /// # Example
    /// ```
    /// use nalgebra::Vector3;
    /// use clinometer_calibration::CalibrationCoefficients;
    ///
    /// let coefficients = CalibrationCoefficients {
    ///     offset: Vector3::new(0.1, 0.0, -0.2),
    ///     gain: Vector3::new(1.0, 2.0, 1.0),
    ///     ..Default::default()
    /// };
    /// let corrected = coefficients.correct(Vector3::new(0.1, 4.0, 9.6));
    /// assert!((corrected - Vector3::new(0.0, 2.0, 9.8)).norm() < 1e-5);
    /// ```
    pub fn correct(&self, raw: Vector3<f32>) -> Vector3<f32> {
        calibrate_accelerometer(raw, self.offset, self.gain)
    }

    /// Tilt angles of a raw reading after correction, see
    /// [`Vector3Ext::tilt_angles`]
    pub fn tilt_angles(&self, raw: Vector3<f32>) -> Option<Vector3<f32>> {
        self.correct(raw).tilt_angles()
    }
}

/// Applies accelerometer offset and gain correction
///
/// Computes `(uncalibrated - offset) / gain` component-wise.
///
/// # Arguments
/// * `uncalibrated` - Raw sensor reading
/// * `offset` - Bias to subtract from the raw reading
/// * `gain` - Per-axis scale of the sensor, raw units per m/s²
///
/// # Returns
/// Calibrated sensor reading
pub fn calibrate_accelerometer(
    uncalibrated: Vector3<f32>,
    offset: Vector3<f32>,
    gain: Vector3<f32>,
) -> Vector3<f32> {
    (uncalibrated - offset).component_div(&gain)
}

/// Solve the calibration coefficients from the seven orientation means
///
/// Offset and gain of each axis come from the two poses in which that axis
/// points straight up and straight down: the midpoint of the two readings is
/// the bias and half their difference, divided by `gravity`, is the scale.
/// Every mean is then corrected and turned into tilt angles; the mounting
/// angles average the tilt of pose pairs so that symmetric errors cancel.
///
/// # Errors
/// * [`CalibrationError::DegenerateGain`] when an axis reads the same value in
///   both of its poses (or the result is not finite)
/// * [`CalibrationError::ZeroMagnitude`] when a corrected mean has zero length
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use clinometer_calibration::{OrientationMeanTable, STANDARD_GRAVITY, solve};
///
/// let g = STANDARD_GRAVITY;
/// let table = OrientationMeanTable::from_means([
///     Vector3::new(0.0, 0.0, g),
///     Vector3::new(0.0, 0.0, g),
///     Vector3::new(g, 0.0, 0.0),
///     Vector3::new(-g, 0.0, 0.0),
///     Vector3::new(0.0, g, 0.0),
///     Vector3::new(0.0, -g, 0.0),
///     Vector3::new(0.0, 0.0, -g),
/// ]);
///
/// let coefficients = solve(&table, g).unwrap();
/// assert!(coefficients.offset.norm() < 1e-6);
/// assert!((coefficients.gain - Vector3::new(1.0, 1.0, 1.0)).norm() < 1e-6);
/// assert!(coefficients.mounting_angle.norm() < 1e-4);
/// ```
pub fn solve(table: &OrientationMeanTable, gravity: f32) -> Result<CalibrationCoefficients> {
    use Orientation::*;

    for (orientation, mean) in table.iter() {
        debug!(
            "raw mean {:>16} = {:+.4} {:+.4} {:+.4}",
            orientation, mean.x, mean.y, mean.z
        );
    }

    // Offset and gain from the poses where each axis is aligned with gravity
    let offset = Vector3::new(
        (table[LeftSide].x + table[RightSide].x) / 2.0,
        (table[TopEdge].y + table[BottomEdge].y) / 2.0,
        (table[FaceUp].z + table[FaceDown].z) / 2.0,
    );
    let gain = Vector3::new(
        (table[LeftSide].x - table[RightSide].x) / (2.0 * gravity),
        (table[TopEdge].y - table[BottomEdge].y) / (2.0 * gravity),
        (table[FaceUp].z - table[FaceDown].z) / (2.0 * gravity),
    );

    for (axis, &value) in gain.iter().enumerate() {
        if !value.is_finite() || value.abs() < f32::EPSILON {
            return Err(CalibrationError::DegenerateGain { axis, gain: value });
        }
    }

    debug!("offset = {:+.4} {:+.4} {:+.4}", offset.x, offset.y, offset.z);
    debug!("gain   = {:+.4} {:+.4} {:+.4}", gain.x, gain.y, gain.z);

    // Tilt of every corrected mean
    let mut angles = [Vector3::zeros(); ORIENTATION_COUNT];
    for (orientation, mean) in table.iter() {
        let corrected = calibrate_accelerometer(*mean, offset, gain);
        let tilt = corrected
            .tilt_angles()
            .ok_or(CalibrationError::ZeroMagnitude(orientation))?;
        debug!(
            "corrected {:>16} = {:+.4} {:+.4} {:+.4}, angles = {:+.4}° {:+.4}° {:+.4}°",
            orientation, corrected.x, corrected.y, corrected.z, tilt.x, tilt.y, tilt.z
        );
        angles[orientation.index()] = tilt;
    }

    // Pairings are tied to the physical poses; the signs depend on them
    let angle = |orientation: Orientation| angles[orientation.index()];
    let mounting_angle = Vector3::new(
        -(angle(RightSide).y + angle(LeftSide).y) / 2.0,
        -(angle(FaceUp).y + angle(FaceUpRotated).y) / 2.0,
        (angle(FaceUp).x + angle(FaceUpRotated).x) / 2.0,
    );

    let coefficients = CalibrationCoefficients {
        offset,
        gain,
        mounting_angle,
    };
    info!(
        "calibration solved: offset = {:+.4} {:+.4} {:+.4}, gain = {:+.4} {:+.4} {:+.4}, angle = {:+.2}° {:+.2}° {:+.2}°",
        offset.x,
        offset.y,
        offset.z,
        gain.x,
        gain.y,
        gain.z,
        mounting_angle.x,
        mounting_angle.y,
        mounting_angle.z
    );

    Ok(coefficients)
}
