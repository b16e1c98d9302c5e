//! Core types and settings for the calibration library

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Standard gravity in m/s²
pub const STANDARD_GRAVITY: f32 = 9.807;

/// Number of samples held by each accumulator window (≈ 4 s of samples)
pub const WINDOW_SIZE: usize = 300;

/// Sensor sampling interval the window size and debounce were tuned for
pub const SAMPLE_INTERVAL_MICROS: u32 = 10_000;

/// Number of orientations visited by the calibration sequence
pub const ORIENTATION_COUNT: usize = 7;

/// Physical device pose used during calibration
///
/// The discriminant is the slot of the pose in the orientation mean table
/// and the order in which the poses are visited.
///
/// | Pose            | Nominal reading |
/// |-----------------|-----------------|
/// | `FaceUp`        | +Z              |
/// | `FaceUpRotated` | +Z              |
/// | `LeftSide`      | +X              |
/// | `RightSide`     | -X              |
/// | `TopEdge`       | +Y              |
/// | `BottomEdge`    | -Y              |
/// | `FaceDown`      | -Z              |
///
/// # Example
/// ```
/// use clinometer_calibration::Orientation;
///
/// assert_eq!(Orientation::FaceUp.index(), 0);
/// assert_eq!(Orientation::FaceUp.next(), Some(Orientation::FaceUpRotated));
/// assert_eq!(Orientation::FaceDown.next(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Orientation {
    /// Lying flat, screen up
    FaceUp = 0,
    /// Lying flat, screen up, rotated 180° about the vertical
    FaceUpRotated = 1,
    /// Standing on the left side
    LeftSide = 2,
    /// Standing on the right side (left side rotated 180°)
    RightSide = 3,
    /// Standing upright on the bottom edge, top edge up
    TopEdge = 4,
    /// Standing upside-down on the top edge
    BottomEdge = 5,
    /// Lying flat, screen down
    FaceDown = 6,
}

impl Orientation {
    /// All orientations in visiting order
    pub const ALL: [Orientation; ORIENTATION_COUNT] = [
        Orientation::FaceUp,
        Orientation::FaceUpRotated,
        Orientation::LeftSide,
        Orientation::RightSide,
        Orientation::TopEdge,
        Orientation::BottomEdge,
        Orientation::FaceDown,
    ];

    /// Slot of this orientation in the mean table
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Orientation stored at `index`, if any
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Orientation visited after this one, `None` after the last
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::FaceUp => "face up",
            Orientation::FaceUpRotated => "face up, rotated",
            Orientation::LeftSide => "left side",
            Orientation::RightSide => "right side",
            Orientation::TopEdge => "top edge up",
            Orientation::BottomEdge => "bottom edge up",
            Orientation::FaceDown => "face down",
        };
        f.pad(name)
    }
}

/// Position of the calibration sequence
///
/// Each orientation has two sub-steps: waiting for the user to place the
/// device and confirm, then collecting samples. The numeric encoding used by
/// hosts that persist the step is `2k` for awaiting, `2k + 1` for collecting
/// and `14` for completed, where `k` is the orientation index.
///
/// # Example
/// ```
/// use clinometer_calibration::{CalibrationStep, Orientation};
///
/// let step = CalibrationStep::Collecting(Orientation::LeftSide);
/// assert_eq!(step.index(), 5);
/// assert_eq!(CalibrationStep::from_index(5), Some(step));
/// assert_eq!(CalibrationStep::Completed.index(), 14);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CalibrationStep {
    /// Waiting for the user to confirm the device is in position
    Awaiting(Orientation),
    /// Collecting samples for the orientation
    Collecting(Orientation),
    /// All orientations collected and solved
    Completed,
}

impl CalibrationStep {
    /// Index of the terminal step
    pub const COMPLETED_INDEX: u8 = 2 * ORIENTATION_COUNT as u8;

    /// Numeric step encoding
    pub fn index(self) -> u8 {
        match self {
            CalibrationStep::Awaiting(orientation) => 2 * orientation.index() as u8,
            CalibrationStep::Collecting(orientation) => 2 * orientation.index() as u8 + 1,
            CalibrationStep::Completed => Self::COMPLETED_INDEX,
        }
    }

    /// Decode a numeric step, `None` when out of range
    pub fn from_index(index: u8) -> Option<Self> {
        if index == Self::COMPLETED_INDEX {
            return Some(CalibrationStep::Completed);
        }
        let orientation = Orientation::from_index(usize::from(index / 2))?;
        if index % 2 == 0 {
            Some(CalibrationStep::Awaiting(orientation))
        } else {
            Some(CalibrationStep::Collecting(orientation))
        }
    }

    /// Orientation this step belongs to, `None` once completed
    pub fn orientation(self) -> Option<Orientation> {
        match self {
            CalibrationStep::Awaiting(orientation) | CalibrationStep::Collecting(orientation) => {
                Some(orientation)
            }
            CalibrationStep::Completed => None,
        }
    }

    /// Whether samples should be delivered in this step
    pub fn is_collecting(self) -> bool {
        matches!(self, CalibrationStep::Collecting(_))
    }

    /// Whether the step waits for a user confirmation
    pub fn is_awaiting(self) -> bool {
        matches!(self, CalibrationStep::Awaiting(_))
    }
}

impl fmt::Display for CalibrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationStep::Awaiting(orientation) => write!(
                f,
                "step {} of {}: place device {}",
                orientation.index() + 1,
                ORIENTATION_COUNT,
                orientation
            ),
            CalibrationStep::Collecting(orientation) => write!(
                f,
                "step {} of {}: calibrating {}",
                orientation.index() + 1,
                ORIENTATION_COUNT,
                orientation
            ),
            CalibrationStep::Completed => f.write_str("calibration completed"),
        }
    }
}

/// Rule deciding when an orientation has collected enough samples
///
/// The three axis windows are loaded from the same samples and skip the same
/// non-finite ones, so they always fill together and both rules fire on the
/// same sample. `FirstAxis` is kept so hosts persisting the legacy setting
/// still deserialize it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CompletionGate {
    /// Every axis accumulator must hold a full window
    #[default]
    AllAxes,
    /// Only the X axis accumulator is checked (legacy behavior)
    FirstAxis,
}

/// Calibration sequence settings
///
/// # Example
/// ```
/// use clinometer_calibration::{CalibrationSettings, CompletionGate};
///
/// let settings = CalibrationSettings {
///     stability_threshold: 0.1,          // accept a noisier sensor
///     completion_gate: CompletionGate::FirstAxis,
///     ..Default::default()
/// };
/// assert_eq!(settings.discard_samples, 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationSettings {
    /// Largest window tolerance (max - min, m/s²) still considered motionless
    ///
    /// A full window whose tolerance exceeds this value restarts collection
    /// for the current orientation.
    pub stability_threshold: f32,
    /// Samples dropped on entry to each collecting step
    ///
    /// Lets the sensor settle after the user touched the device to confirm.
    pub discard_samples: u32,
    /// Oldest samples of a full window left out of the orientation mean
    ///
    /// The mean is taken over the trailing `window - settle_samples` samples.
    /// When this covers the whole window, the whole window is averaged.
    pub settle_samples: usize,
    /// Gravity magnitude the gains are normalised to, in m/s²
    pub gravity: f32,
    /// When an orientation is considered complete
    pub completion_gate: CompletionGate,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            stability_threshold: 0.05,
            discard_samples: 20,
            settle_samples: 100,
            gravity: STANDARD_GRAVITY,
            completion_gate: CompletionGate::default(),
        }
    }
}
