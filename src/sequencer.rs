//! Guided seven-orientation calibration sequence

use log::{debug, info, trace, warn};
use nalgebra::Vector3;

use crate::accumulator::StatAccumulator;
use crate::calibration::{CalibrationCoefficients, OrientationMeanTable, solve};
use crate::error::{CalibrationError, Result};
use crate::types::{CalibrationSettings, CalibrationStep, CompletionGate, Orientation, WINDOW_SIZE};

/// Callbacks from the calibration sequence to the host
///
/// Every method has an empty default so hosts only implement what they
/// render. `()` is the observer that ignores everything.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use clinometer_calibration::{CalibrationObserver, Orientation};
///
/// struct Beeper {
///     beeps: u32,
/// }
///
/// impl CalibrationObserver for Beeper {
///     fn orientation_captured(&mut self, _orientation: Orientation, _mean: Vector3<f32>) {
///         self.beeps += 1;
///     }
/// }
/// ```
pub trait CalibrationObserver {
    /// The sequence moved to `step`
    ///
    /// Hosts subscribe to the sensor when `step.is_collecting()` and
    /// unsubscribe otherwise.
    fn step_changed(&mut self, _step: CalibrationStep) {}

    /// A sample was loaded into the accumulators
    fn progress(&mut self, _progress: Progress) {}

    /// The window was not steady and collection restarted for `orientation`
    fn motion_detected(&mut self, _orientation: Orientation) {}

    /// The mean for `orientation` was stored; fired once per orientation
    fn orientation_captured(&mut self, _orientation: Orientation, _mean: Vector3<f32>) {}

    /// All orientations were collected and solved
    fn calibration_completed(&mut self, _coefficients: &CalibrationCoefficients) {}
}

impl CalibrationObserver for () {}

impl<T: CalibrationObserver + ?Sized> CalibrationObserver for &mut T {
    fn step_changed(&mut self, step: CalibrationStep) {
        (**self).step_changed(step);
    }

    fn progress(&mut self, progress: Progress) {
        (**self).progress(progress);
    }

    fn motion_detected(&mut self, orientation: Orientation) {
        (**self).motion_detected(orientation);
    }

    fn orientation_captured(&mut self, orientation: Orientation, mean: Vector3<f32>) {
        (**self).orientation_captured(orientation, mean);
    }

    fn calibration_completed(&mut self, coefficients: &CalibrationCoefficients) {
        (**self).calibration_completed(coefficients);
    }
}

/// Collection progress of the current orientation
///
/// `primary` and `secondary` drive a dual progress bar on a
/// [`Progress::SCALE`] scale. Two values are combined: the fill level of the
/// window and how far the window's tolerance is below the stability
/// threshold. The primary bar shows the lesser of the two, the secondary the
/// greater.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Window fill level in percent
    pub percent_loaded: f32,
    /// Current window tolerance
    pub tolerance: f32,
    /// Lesser of fill and stability progress
    pub primary: u16,
    /// Greater of fill and stability progress
    pub secondary: u16,
}

impl Progress {
    /// Full-scale value of `primary` and `secondary`
    pub const SCALE: u16 = 1000;

    /// Progress for a window at `percent_loaded` with the given tolerance
    ///
    /// Bar values are truncated toward zero.
    ///
    /// # Example
    /// ```
    /// use clinometer_calibration::Progress;
    ///
    /// let progress = Progress::new(50.0, 0.015625, 0.0625);
    /// assert_eq!(progress.primary, 500);
    /// assert_eq!(progress.secondary, 750);
    /// ```
    pub fn new(percent_loaded: f32, tolerance: f32, stability_threshold: f32) -> Self {
        let scale = f32::from(Self::SCALE);
        let fill = (percent_loaded * scale / 100.0).clamp(0.0, scale);
        let stability = if stability_threshold > 0.0 {
            (scale - scale * tolerance / stability_threshold).clamp(0.0, scale)
        } else if tolerance > 0.0 {
            0.0
        } else {
            scale
        };

        Self {
            percent_loaded,
            tolerance,
            primary: fill.min(stability) as u16,
            secondary: fill.max(stability) as u16,
        }
    }
}

/// Seven-orientation accelerometer calibration sequence
///
/// Drives the user through [`Orientation::ALL`]. For each orientation the
/// sequence waits for [`confirm`](Self::confirm), drops the first samples
/// while the device settles, then loads samples into one
/// [`StatAccumulator`] per axis until the windows are full and steady. The
/// trailing mean of the windows is stored for the orientation. After the
/// last orientation the coefficients are solved.
///
/// All events are handled on the caller's thread; the host feeds samples from
/// its sensor callback and forwards the user's confirmations.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use clinometer_calibration::{Calibrator, CalibrationStep, Orientation};
///
/// let mut calibrator: Calibrator = Calibrator::new();
/// assert_eq!(calibrator.step(), CalibrationStep::Awaiting(Orientation::FaceUp));
///
/// calibrator.confirm(&mut ()).unwrap();
/// assert!(calibrator.step().is_collecting());
///
/// for _ in 0..320 {
///     calibrator.update(Vector3::new(0.0, 0.0, 9.807), &mut ()).unwrap();
/// }
/// assert_eq!(calibrator.step(), CalibrationStep::Awaiting(Orientation::FaceUpRotated));
/// ```
#[derive(Debug, Clone)]
pub struct Calibrator<const N: usize = WINDOW_SIZE> {
    /// Sequence settings
    settings: CalibrationSettings,
    /// Current position in the sequence
    step: CalibrationStep,
    /// One window per axis (X, Y, Z)
    accumulators: [StatAccumulator<N>; 3],
    /// Samples dropped since the current collecting step began
    discarded: u32,
    /// Means collected so far
    means: OrientationMeanTable,
    /// Solved coefficients once completed
    coefficients: Option<CalibrationCoefficients>,
}

impl<const N: usize> Calibrator<N> {
    /// Create a calibrator with default settings
    pub fn new() -> Self {
        Self::with_settings(CalibrationSettings::default())
    }

    /// Create a calibrator with specified settings
    ///
    /// A `settle_samples` of `N` or more leaves no trailing span, so the
    /// whole window is averaged instead.
    pub fn with_settings(settings: CalibrationSettings) -> Self {
        if settings.settle_samples >= N {
            warn!(
                "settle span {} covers the {N}-sample window, averaging the whole window",
                settings.settle_samples
            );
        }
        Self {
            settings,
            step: CalibrationStep::Awaiting(Orientation::FaceUp),
            accumulators: core::array::from_fn(|_| StatAccumulator::new()),
            discarded: 0,
            means: OrientationMeanTable::new(),
            coefficients: None,
        }
    }

    /// Current settings
    pub fn settings(&self) -> CalibrationSettings {
        self.settings
    }

    /// Current step
    pub fn step(&self) -> CalibrationStep {
        self.step
    }

    /// Means collected so far; slots of orientations not yet reached are zero
    pub fn means(&self) -> &OrientationMeanTable {
        &self.means
    }

    /// Solved coefficients, available once the sequence has completed
    pub fn coefficients(&self) -> Option<CalibrationCoefficients> {
        self.coefficients
    }

    /// Samples dropped since the current collecting step began
    pub fn discarded_samples(&self) -> u32 {
        self.discarded
    }

    /// Per-axis windows (X, Y, Z)
    pub fn accumulators(&self) -> &[StatAccumulator<N>; 3] {
        &self.accumulators
    }

    /// Progress of the current collection, read from the X axis window
    pub fn progress(&self) -> Progress {
        let x = &self.accumulators[0];
        Progress::new(
            x.percent_loaded(),
            x.tolerance(),
            self.settings.stability_threshold,
        )
    }

    /// User confirmed the device is in position for the awaited orientation
    ///
    /// # Errors
    /// [`CalibrationError::NotAwaitingConfirmation`] when the sequence is
    /// collecting or completed.
    pub fn confirm<O: CalibrationObserver>(&mut self, observer: &mut O) -> Result<()> {
        let CalibrationStep::Awaiting(orientation) = self.step else {
            return Err(CalibrationError::NotAwaitingConfirmation(self.step));
        };

        self.reset_accumulators();
        self.discarded = 0;
        self.transition(CalibrationStep::Collecting(orientation), observer);
        Ok(())
    }

    /// Process one accelerometer sample in m/s²
    ///
    /// Samples outside a collecting step are ignored.
    ///
    /// # Errors
    /// Returns the solver error when the last orientation completes but the
    /// collected means cannot be solved. The sequence then restarts from the
    /// first orientation.
    pub fn update<O: CalibrationObserver>(
        &mut self,
        sample: Vector3<f32>,
        observer: &mut O,
    ) -> Result<()> {
        let CalibrationStep::Collecting(orientation) = self.step else {
            trace!("sample ignored in {}", self.step);
            return Ok(());
        };

        // Let the sensor settle after the user touched the device
        if self.discarded < self.settings.discard_samples {
            self.discarded += 1;
            return Ok(());
        }

        if !sample.iter().all(|value| value.is_finite()) {
            debug!("non-finite sample ignored for {orientation}");
            return Ok(());
        }

        for (accumulator, &value) in self.accumulators.iter_mut().zip(sample.iter()) {
            accumulator.load_sample(value);
        }
        observer.progress(self.progress());

        let threshold = self.settings.stability_threshold;
        if self
            .accumulators
            .iter()
            .any(|accumulator| accumulator.is_ready() && accumulator.tolerance() > threshold)
        {
            debug!(
                "device moved while collecting {orientation}, tolerance {:.4} {:.4} {:.4}",
                self.accumulators[0].tolerance(),
                self.accumulators[1].tolerance(),
                self.accumulators[2].tolerance()
            );
            self.reset_accumulators();
            observer.motion_detected(orientation);
            return Ok(());
        }

        if self.collection_complete() {
            self.capture(orientation, observer)?;
        }

        Ok(())
    }

    /// Re-arm after the host was suspended
    ///
    /// Partially collected samples are not kept across a suspension, so a
    /// collecting step rewinds to waiting for confirmation of the same
    /// orientation. Other steps are left untouched.
    pub fn resume<O: CalibrationObserver>(&mut self, observer: &mut O) {
        if let CalibrationStep::Collecting(orientation) = self.step {
            info!("resumed while collecting {orientation}, waiting for confirmation");
            self.reset_accumulators();
            self.discarded = 0;
            self.transition(CalibrationStep::Awaiting(orientation), observer);
        }
    }

    /// Drop everything collected and start again from the first orientation
    pub fn restart<O: CalibrationObserver>(&mut self, observer: &mut O) {
        self.reset_accumulators();
        self.discarded = 0;
        self.means = OrientationMeanTable::new();
        self.coefficients = None;
        self.transition(CalibrationStep::Awaiting(Orientation::FaceUp), observer);
    }

    fn collection_complete(&self) -> bool {
        match self.settings.completion_gate {
            CompletionGate::AllAxes => self
                .accumulators
                .iter()
                .all(|accumulator| accumulator.is_ready()),
            CompletionGate::FirstAxis => self.accumulators[0].is_ready(),
        }
    }

    fn capture<O: CalibrationObserver>(
        &mut self,
        orientation: Orientation,
        observer: &mut O,
    ) -> Result<()> {
        // Leave the oldest part of the window out of the mean
        let tail = match N.saturating_sub(self.settings.settle_samples) {
            0 => N,
            tail => tail,
        };
        let mean = Vector3::new(
            self.accumulators[0].mean_of_tail(tail),
            self.accumulators[1].mean_of_tail(tail),
            self.accumulators[2].mean_of_tail(tail),
        );

        self.means[orientation] = mean;
        self.reset_accumulators();
        info!(
            "captured {orientation}: {:+.4} {:+.4} {:+.4}",
            mean.x, mean.y, mean.z
        );
        observer.orientation_captured(orientation, mean);

        match orientation.next() {
            Some(next) => {
                self.transition(CalibrationStep::Awaiting(next), observer);
                Ok(())
            }
            None => self.finish(observer),
        }
    }

    fn finish<O: CalibrationObserver>(&mut self, observer: &mut O) -> Result<()> {
        match solve(&self.means, self.settings.gravity) {
            Ok(coefficients) => {
                self.coefficients = Some(coefficients);
                self.transition(CalibrationStep::Completed, observer);
                observer.calibration_completed(&coefficients);
                Ok(())
            }
            Err(error) => {
                warn!("calibration failed: {error}, restarting");
                self.restart(observer);
                Err(error)
            }
        }
    }

    fn transition<O: CalibrationObserver>(&mut self, step: CalibrationStep, observer: &mut O) {
        debug!("{} -> {}", self.step.index(), step.index());
        self.step = step;
        observer.step_changed(step);
    }

    fn reset_accumulators(&mut self) {
        for accumulator in &mut self.accumulators {
            accumulator.reset();
        }
    }
}

impl<const N: usize> Default for Calibrator<N> {
    fn default() -> Self {
        Self::new()
    }
}
