#![cfg_attr(not(test), no_std)]

//! Clinometer Calibration - six-orientation accelerometer calibration
//!
//! This library calibrates a 3-axis accelerometer for inclination sensing
//! (clinometers, spirit levels) by guiding the user through seven device
//! poses. At each pose it waits for the device to be perfectly still,
//! averages the readings, and once every pose is collected solves per-axis
//! offset and gain plus the mounting angles between the sensor and the case.
//!
//! # Features
//!
//! - Sliding-window stillness detection with automatic restart on motion
//! - Settling debounce and trailing-window averaging per pose
//! - Closed-form offset, gain and mounting-angle solve
//! - Observer callbacks for progress bars, cues and step changes
//! - Key-value persistence of the resulting coefficients
//! - `#![no_std]` compatible and allocation free
//!
//! # Quick Start
//!
//! ```rust
//! use nalgebra::Vector3;
//! use clinometer_calibration::{Calibrator, CalibrationStep, Orientation};
//!
//! let mut calibrator: Calibrator = Calibrator::new();
//!
//! // The user placed the device face up and pressed "next"
//! calibrator.confirm(&mut ()).unwrap();
//!
//! // Feed accelerometer readings (m/s²) from the sensor callback
//! while calibrator.step().is_collecting() {
//!     let reading = Vector3::new(0.01, -0.02, 9.81);
//!     calibrator.update(reading, &mut ()).unwrap();
//! }
//!
//! // Mean stored, waiting for the next pose
//! assert_eq!(
//!     calibrator.step(),
//!     CalibrationStep::Awaiting(Orientation::FaceUpRotated)
//! );
//! ```
//!
//! Once all seven poses are collected, [`Calibrator::coefficients`] returns
//! the solved [`CalibrationCoefficients`], which correct raw readings with
//! [`CalibrationCoefficients::correct`].

mod accumulator;
pub mod calibration;
mod error;
mod math;
mod sequencer;
pub mod storage;
mod types;

// Re-export all public types and functions
pub use accumulator::StatAccumulator;
pub use calibration::{
    CalibrationCoefficients, OrientationMeanTable, calibrate_accelerometer, solve,
};
pub use error::{CalibrationError, Result};
pub use math::{DEG_TO_RAD, RAD_TO_DEG, Vector3Ext, tilt_angles};
pub use sequencer::{CalibrationObserver, Calibrator, Progress};
pub use storage::{KeyValueStore, StoredCalibration};
pub use types::*;
