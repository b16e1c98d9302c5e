use clinometer_calibration::{
    CalibrationCoefficients, CalibrationObserver, CalibrationSettings, CalibrationStep,
    Calibrator, CompletionGate, Orientation, Progress, STANDARD_GRAVITY, WINDOW_SIZE,
};
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

const G: f32 = STANDARD_GRAVITY;
const DISCARDED: usize = 20;
const JITTER: f32 = 0.001;

/// Nominal reading of a perfect sensor in each pose
fn gravity_for(orientation: Orientation) -> Vector3<f32> {
    match orientation {
        Orientation::FaceUp | Orientation::FaceUpRotated => Vector3::new(0.0, 0.0, G),
        Orientation::LeftSide => Vector3::new(G, 0.0, 0.0),
        Orientation::RightSide => Vector3::new(-G, 0.0, 0.0),
        Orientation::TopEdge => Vector3::new(0.0, G, 0.0),
        Orientation::BottomEdge => Vector3::new(0.0, -G, 0.0),
        Orientation::FaceDown => Vector3::new(0.0, 0.0, -G),
    }
}

#[derive(Default)]
struct Recorder {
    steps: Vec<CalibrationStep>,
    progress: Vec<Progress>,
    motion: Vec<Orientation>,
    captured: Vec<Orientation>,
    completed: Vec<CalibrationCoefficients>,
}

impl CalibrationObserver for Recorder {
    fn step_changed(&mut self, step: CalibrationStep) {
        self.steps.push(step);
    }

    fn progress(&mut self, progress: Progress) {
        self.progress.push(progress);
    }

    fn motion_detected(&mut self, orientation: Orientation) {
        self.motion.push(orientation);
    }

    fn orientation_captured(&mut self, orientation: Orientation, _mean: Vector3<f32>) {
        self.captured.push(orientation);
    }

    fn calibration_completed(&mut self, coefficients: &CalibrationCoefficients) {
        self.completed.push(*coefficients);
    }
}

/// Seven batches of 300 steady samples with ±0.001 jitter, each preceded by
/// the debounce samples
#[test]
fn test_end_to_end_calibration() {
    let mut calibrator: Calibrator = Calibrator::new();
    let mut recorder = Recorder::default();

    for (index, orientation) in Orientation::ALL.into_iter().enumerate() {
        assert_eq!(calibrator.step(), CalibrationStep::Awaiting(orientation));
        calibrator.confirm(&mut recorder).unwrap();

        let nominal = gravity_for(orientation);
        let jittered = |i: usize| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            nominal + Vector3::new(sign, -sign, sign) * JITTER
        };

        // Debounce: none of these reach the accumulators
        let progress_before = recorder.progress.len();
        for i in 0..DISCARDED {
            calibrator.update(jittered(i), &mut recorder).unwrap();
        }
        assert_eq!(calibrator.discarded_samples(), DISCARDED as u32);
        assert_eq!(recorder.progress.len(), progress_before);
        assert!(calibrator.accumulators().iter().all(|a| a.is_empty()));

        for i in DISCARDED..DISCARDED + WINDOW_SIZE - 1 {
            calibrator.update(jittered(i), &mut recorder).unwrap();
        }
        assert_eq!(calibrator.step(), CalibrationStep::Collecting(orientation));
        assert_eq!(recorder.captured.len(), index);

        calibrator
            .update(jittered(DISCARDED + WINDOW_SIZE - 1), &mut recorder)
            .unwrap();
        assert_eq!(recorder.captured.len(), index + 1);
        assert_eq!(recorder.progress.len(), (index + 1) * WINDOW_SIZE);
    }

    assert!(recorder.motion.is_empty());
    assert_eq!(recorder.captured, Orientation::ALL.to_vec());
    assert_eq!(calibrator.step(), CalibrationStep::Completed);
    assert_eq!(recorder.completed.len(), 1);

    let coefficients = calibrator.coefficients().unwrap();
    assert_eq!(recorder.completed[0], coefficients);
    assert!(coefficients.offset.norm() < 1e-3, "offset {:?}", coefficients.offset);
    assert!(
        (coefficients.gain - Vector3::new(1.0, 1.0, 1.0)).norm() < 1e-3,
        "gain {:?}",
        coefficients.gain
    );
    assert!(
        coefficients.mounting_angle.norm() < 1e-3,
        "mounting angle {:?}",
        coefficients.mounting_angle
    );
}

/// Step transitions follow the 0..=14 encoding in order
#[test]
fn test_step_indices_advance_in_order() {
    let mut calibrator: Calibrator = Calibrator::new();
    let mut recorder = Recorder::default();

    for orientation in Orientation::ALL {
        calibrator.confirm(&mut recorder).unwrap();
        while calibrator.step().is_collecting() {
            calibrator
                .update(gravity_for(orientation), &mut recorder)
                .unwrap();
        }
    }

    let indices: Vec<u8> = recorder.steps.iter().map(|step| step.index()).collect();
    assert_eq!(indices, (1..=14).collect::<Vec<u8>>());
}

/// A bump while collecting restarts the pose; the mean only uses steady data
#[test]
fn test_motion_during_collection_is_rejected() {
    let mut calibrator: Calibrator = Calibrator::new();
    let mut recorder = Recorder::default();
    calibrator.confirm(&mut recorder).unwrap();

    let nominal = gravity_for(Orientation::FaceUp);
    for _ in 0..DISCARDED + 150 {
        calibrator.update(nominal, &mut recorder).unwrap();
    }
    // The user bumps the table
    for _ in 0..5 {
        calibrator
            .update(nominal + Vector3::new(0.3, 0.0, -0.4), &mut recorder)
            .unwrap();
    }
    // Back to still: the window fills, still contains the bump, and resets
    for _ in 0..145 {
        calibrator.update(nominal, &mut recorder).unwrap();
    }
    assert_eq!(recorder.motion, vec![Orientation::FaceUp]);
    assert!(recorder.captured.is_empty());
    assert!(calibrator.accumulators().iter().all(|a| a.is_empty()));

    for _ in 0..WINDOW_SIZE {
        calibrator.update(nominal, &mut recorder).unwrap();
    }
    assert_eq!(recorder.captured, vec![Orientation::FaceUp]);
    assert!((calibrator.means()[Orientation::FaceUp] - nominal).norm() < 1e-4);
}

/// Both gates complete after the same number of deliveries
#[test]
fn test_completion_gates_agree_on_synchronous_windows() {
    for gate in [CompletionGate::AllAxes, CompletionGate::FirstAxis] {
        let settings = CalibrationSettings {
            completion_gate: gate,
            ..Default::default()
        };
        let mut calibrator: Calibrator = Calibrator::with_settings(settings);
        let mut recorder = Recorder::default();
        calibrator.confirm(&mut recorder).unwrap();

        let mut delivered = 0;
        while calibrator.step().is_collecting() {
            calibrator
                .update(gravity_for(Orientation::FaceUp), &mut recorder)
                .unwrap();
            delivered += 1;
        }
        assert_eq!(delivered, DISCARDED + WINDOW_SIZE, "gate {gate:?}");
    }
}

/// Suspending mid-collection rewinds to the same pose; earlier poses are kept
#[test]
fn test_resume_keeps_completed_poses() {
    let mut calibrator: Calibrator = Calibrator::new();
    let mut recorder = Recorder::default();

    calibrator.confirm(&mut recorder).unwrap();
    while calibrator.step().is_collecting() {
        calibrator
            .update(gravity_for(Orientation::FaceUp), &mut recorder)
            .unwrap();
    }

    calibrator.confirm(&mut recorder).unwrap();
    for _ in 0..100 {
        calibrator
            .update(gravity_for(Orientation::FaceUpRotated), &mut recorder)
            .unwrap();
    }

    calibrator.resume(&mut recorder);
    assert_eq!(
        calibrator.step(),
        CalibrationStep::Awaiting(Orientation::FaceUpRotated)
    );
    let kept = calibrator.means()[Orientation::FaceUp] - gravity_for(Orientation::FaceUp);
    assert!(kept.norm() < 1e-4);

    // Samples during the gap are dropped
    calibrator
        .update(gravity_for(Orientation::LeftSide), &mut recorder)
        .unwrap();
    assert!(calibrator.accumulators().iter().all(|a| a.is_empty()));
}

/// A biased, mis-scaled sensor with random noise is recovered
#[test]
fn test_noisy_sensor_with_bias_and_gain_error() {
    let offset = Vector3::new(0.15, -0.08, 0.22);
    let gain = Vector3::new(1.03, 0.97, 1.01);
    let mut rng = Pcg64::seed_from_u64(42);

    let mut calibrator: Calibrator = Calibrator::new();
    for orientation in Orientation::ALL {
        calibrator.confirm(&mut ()).unwrap();
        let raw = gravity_for(orientation).component_mul(&gain) + offset;
        while calibrator.step().is_collecting() {
            let noise = Vector3::new(
                rng.random_range(-0.01f32..0.01),
                rng.random_range(-0.01f32..0.01),
                rng.random_range(-0.01f32..0.01),
            );
            calibrator.update(raw + noise, &mut ()).unwrap();
        }
    }

    let coefficients = calibrator.coefficients().unwrap();
    assert!((coefficients.offset - offset).norm() < 5e-3);
    assert!((coefficients.gain - gain).norm() < 1e-3);
    assert!(coefficients.mounting_angle.norm() < 0.1);

    let raw = gravity_for(Orientation::TopEdge).component_mul(&gain) + offset;
    let corrected = coefficients.correct(raw);
    assert!((corrected - gravity_for(Orientation::TopEdge)).norm() < 1e-2);
}
