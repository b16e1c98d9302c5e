//! Angle helpers shared by the solver and by tilt readouts

use nalgebra::Vector3;

/// Mathematical constants
pub const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Extension trait for Vector3 operations
pub trait Vector3Ext {
    /// Angle of each axis against the horizontal plane, in degrees
    ///
    /// For a gravity vector this is `asin(axis / |v|)` per axis: 0° when the
    /// axis is level, ±90° when it points straight up or down. Returns `None`
    /// when the vector has zero or non-finite length, since no direction is
    /// defined.
    fn tilt_angles(&self) -> Option<Vector3<f32>>;

    /// Convert degrees to radians
    fn deg_to_rad(&self) -> Vector3<f32>;

    /// Convert radians to degrees
    fn rad_to_deg(&self) -> Vector3<f32>;
}

impl Vector3Ext for Vector3<f32> {
    fn tilt_angles(&self) -> Option<Vector3<f32>> {
        let norm = self.norm();
        if !norm.is_finite() || norm <= 0.0 {
            return None;
        }

        // Rounding can push a dominant axis a hair past 1.0
        let angle = |axis: f32| libm::asinf((axis / norm).clamp(-1.0, 1.0));
        let radians = Vector3::new(angle(self.x), angle(self.y), angle(self.z));
        Some(radians.rad_to_deg())
    }

    fn deg_to_rad(&self) -> Vector3<f32> {
        *self * DEG_TO_RAD
    }

    fn rad_to_deg(&self) -> Vector3<f32> {
        *self * RAD_TO_DEG
    }
}

/// Tilt angles of a gravity reading, see [`Vector3Ext::tilt_angles`]
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use clinometer_calibration::tilt_angles;
///
/// let level = tilt_angles(Vector3::new(0.0, 0.0, 9.807)).unwrap();
/// assert!(level.x.abs() < 1e-4 && level.y.abs() < 1e-4);
/// assert!((level.z - 90.0).abs() < 1e-3);
///
/// assert!(tilt_angles(Vector3::zeros()).is_none());
/// ```
pub fn tilt_angles(vector: Vector3<f32>) -> Option<Vector3<f32>> {
    vector.tilt_angles()
}
