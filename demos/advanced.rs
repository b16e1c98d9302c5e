//! Advanced calibration demonstration
//!
//! Runs a full seven-orientation calibration against a simulated clinometer
//! with bias, scale error, a tilted mounting and sensor noise. The user bumps
//! the device once during the left side pose, which restarts that pose.
//!
//! Features demonstrated:
//! - Custom settings
//! - Observer callbacks driving a text progress bar
//! - Motion rejection
//! - Saving to and loading from a key-value store
//! - Correcting readings and measuring tilt with the solved coefficients
//!
//! Run with: `cargo run --example advanced`

use std::collections::HashMap;
use std::convert::Infallible;
use std::error::Error;

use clinometer_calibration::{
    CalibrationCoefficients, CalibrationObserver, CalibrationSettings, CalibrationStep,
    Calibrator, KeyValueStore, Orientation, Progress, STANDARD_GRAVITY, StoredCalibration,
    Vector3Ext,
};
use nalgebra::{Rotation3, Vector3};
use rand::prelude::*;
use rand_pcg::Pcg64;

const G: f32 = STANDARD_GRAVITY;
const BAR_WIDTH: usize = 40;

/// Simulated accelerometer with fixed errors
struct SimulatedSensor {
    offset: Vector3<f32>,
    gain: Vector3<f32>,
    mounting: Rotation3<f32>,
    noise: f32,
    rng: Pcg64,
}

impl SimulatedSensor {
    fn new(seed: u64) -> Self {
        Self {
            offset: Vector3::new(0.21, -0.14, 0.35),
            gain: Vector3::new(1.015, 0.985, 1.02),
            mounting: Rotation3::from_euler_angles(0.4f32.to_radians(), -0.3f32.to_radians(), 0.0),
            noise: 0.004,
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    fn read(&mut self, orientation: Orientation) -> Vector3<f32> {
        let case = match orientation {
            Orientation::FaceUp | Orientation::FaceUpRotated => Vector3::new(0.0, 0.0, G),
            Orientation::LeftSide => Vector3::new(G, 0.0, 0.0),
            Orientation::RightSide => Vector3::new(-G, 0.0, 0.0),
            Orientation::TopEdge => Vector3::new(0.0, G, 0.0),
            Orientation::BottomEdge => Vector3::new(0.0, -G, 0.0),
            Orientation::FaceDown => Vector3::new(0.0, 0.0, -G),
        };
        let noise = Vector3::new(
            self.rng.random_range(-self.noise..self.noise),
            self.rng.random_range(-self.noise..self.noise),
            self.rng.random_range(-self.noise..self.noise),
        );
        (self.mounting * case).component_mul(&self.gain) + self.offset + noise
    }
}

/// Host preferences backed by a map
#[derive(Default)]
struct Preferences {
    floats: HashMap<String, f32>,
    integers: HashMap<String, i64>,
}

impl KeyValueStore for Preferences {
    type Error = Infallible;

    fn get_f32(&self, key: &str) -> Result<Option<f32>, Self::Error> {
        Ok(self.floats.get(key).copied())
    }

    fn put_f32(&mut self, key: &str, value: f32) -> Result<(), Self::Error> {
        self.floats.insert(key.to_owned(), value);
        Ok(())
    }

    fn get_i64(&self, key: &str) -> Result<Option<i64>, Self::Error> {
        Ok(self.integers.get(key).copied())
    }

    fn put_i64(&mut self, key: &str, value: i64) -> Result<(), Self::Error> {
        self.integers.insert(key.to_owned(), value);
        Ok(())
    }
}

/// Observer printing what a calibration screen would show
#[derive(Default)]
struct Console {
    last_percent: u16,
    restarts: usize,
}

impl CalibrationObserver for Console {
    fn step_changed(&mut self, step: CalibrationStep) {
        self.last_percent = 0;
        println!("\n[{:>2}] {}", step.index(), step);
    }

    fn progress(&mut self, progress: Progress) {
        // Redraw at every tenth of the window
        let percent = progress.primary / 100;
        if percent == self.last_percent {
            return;
        }
        self.last_percent = percent;

        let primary = usize::from(progress.primary) * BAR_WIDTH / usize::from(Progress::SCALE);
        let secondary = usize::from(progress.secondary) * BAR_WIDTH / usize::from(Progress::SCALE);
        println!(
            "  [{:<width$}] {:5.1}%\n  [{:<width$}] tolerance {:.4}",
            "#".repeat(primary),
            progress.percent_loaded,
            "=".repeat(secondary),
            progress.tolerance,
            width = BAR_WIDTH
        );
    }

    fn motion_detected(&mut self, orientation: Orientation) {
        self.restarts += 1;
        println!("  motion detected while {orientation}, restarting");
    }

    fn orientation_captured(&mut self, orientation: Orientation, mean: Vector3<f32>) {
        println!(
            "  {:>16}: x={:8.4} y={:8.4} z={:8.4}",
            orientation, mean.x, mean.y, mean.z
        );
    }

    fn calibration_completed(&mut self, coefficients: &CalibrationCoefficients) {
        println!("\nCalibration completed: {coefficients:?}");
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("Advanced calibration example - simulated clinometer");

    let mut preferences = Preferences::default();
    match StoredCalibration::load(&preferences)? {
        Some(previous) => println!("Last calibration:\n{previous}"),
        None => println!("No previous calibration"),
    }

    // A noisier sensor than the default threshold expects
    let settings = CalibrationSettings {
        stability_threshold: 0.03,
        discard_samples: 50, // half a second at 100 Hz
        ..Default::default()
    };
    let mut calibrator: Calibrator = Calibrator::with_settings(settings);
    let mut sensor = SimulatedSensor::new(2024);
    let mut console = Console::default();
    let mut bumped = false;

    while let CalibrationStep::Awaiting(orientation) = calibrator.step() {
        calibrator.confirm(&mut console)?;

        let mut sample = 0;
        while calibrator.step().is_collecting() {
            let mut reading = sensor.read(orientation);
            if orientation == Orientation::LeftSide && !bumped && sample == 200 {
                bumped = true;
                reading += Vector3::new(0.0, 0.5, -0.3);
            }
            calibrator.update(reading, &mut console)?;
            sample += 1;
        }
    }

    let Some(coefficients) = calibrator.coefficients() else {
        return Err("calibration did not complete".into());
    };
    println!("Restarts caused by motion: {}", console.restarts);

    let calibration = StoredCalibration::new(coefficients, 1_700_000_000_000);
    calibration.save(&mut preferences)?;
    if let Some(loaded) = StoredCalibration::load(&preferences)? {
        println!("\nStored calibration:\n{loaded}");
    }

    // Measure a 2° slope with the calibrated sensor
    let slope = Rotation3::from_euler_angles(2.0f32.to_radians(), 0.0, 0.0);
    let raw = (sensor.mounting * (slope * Vector3::new(0.0, 0.0, G))).component_mul(&sensor.gain)
        + sensor.offset;

    let uncorrected = raw.tilt_angles().unwrap_or_else(Vector3::zeros);
    let corrected = coefficients.tilt_angles(raw).unwrap_or_else(Vector3::zeros);
    println!(
        "\nTilt of a 2° slope: raw {:.2?}, calibrated {:.2?}",
        uncorrected.as_slice(),
        corrected.as_slice()
    );

    Ok(())
}
