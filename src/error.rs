//! Error types for the calibration library

use crate::types::{CalibrationStep, Orientation};

/// Calibration error types
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    /// A confirmation arrived while the sequence was not waiting for one
    #[error("cannot confirm while in {0}")]
    NotAwaitingConfirmation(CalibrationStep),

    /// The opposing readings of an axis do not span a usable range
    #[error("degenerate gain {gain} on axis {axis}")]
    DegenerateGain {
        /// Axis index (0 = X, 1 = Y, 2 = Z)
        axis: usize,
        /// Gain computed from the orientation means
        gain: f32,
    },

    /// A corrected orientation mean has no direction
    #[error("zero-length gravity vector for {0}")]
    ZeroMagnitude(Orientation),
}

/// Result type alias
pub type Result<T> = core::result::Result<T, CalibrationError>;
