use clinometer_calibration::{CalibrationStep, Calibrator, Orientation, STANDARD_GRAVITY};
use nalgebra::Vector3;

const G: f32 = STANDARD_GRAVITY;

/// Reading of a slightly biased sensor in each pose
fn read_accelerometer(orientation: Orientation) -> Vector3<f32> {
    let ideal = match orientation {
        Orientation::FaceUp | Orientation::FaceUpRotated => Vector3::new(0.0, 0.0, G),
        Orientation::LeftSide => Vector3::new(G, 0.0, 0.0),
        Orientation::RightSide => Vector3::new(-G, 0.0, 0.0),
        Orientation::TopEdge => Vector3::new(0.0, G, 0.0),
        Orientation::BottomEdge => Vector3::new(0.0, -G, 0.0),
        Orientation::FaceDown => Vector3::new(0.0, 0.0, -G),
    };
    ideal.component_mul(&Vector3::new(1.02, 0.99, 1.01)) + Vector3::new(0.12, -0.05, 0.3)
}

fn main() {
    let mut calibrator: Calibrator = Calibrator::new();

    while let CalibrationStep::Awaiting(orientation) = calibrator.step() {
        println!("{}", calibrator.step());

        // the user placed the device and pressed "next"
        calibrator.confirm(&mut ()).expect("awaiting confirmation");

        while calibrator.step().is_collecting() {
            // this loop should repeat each time new accelerometer data is available
            let accelerometer = read_accelerometer(orientation); // replace this with actual data in m/s²

            if let Err(error) = calibrator.update(accelerometer, &mut ()) {
                println!("Calibration failed: {error}");
                return;
            }
        }
    }

    if let Some(coefficients) = calibrator.coefficients() {
        println!("Offset: {:.3?}", coefficients.offset.as_slice());
        println!("Gain: {:.3?}", coefficients.gain.as_slice());
        println!("Mounting angle: {:.2?}", coefficients.mounting_angle.as_slice());
    }
}
