//! Windowed sample statistics used to detect a motionless device

use heapless::Deque;

use crate::types::WINDOW_SIZE;

/// Fixed-capacity sliding window over a single sensor axis
///
/// Keeps the most recent `N` samples and recomputes the mean and tolerance
/// over the whole window whenever a sample is loaded. Once the window is full
/// every new sample evicts the oldest one.
///
/// The tolerance is the spread (max - min) of the window. It is zero for a
/// window of identical values and only grows as samples disperse, which makes
/// it a direct "is the device still" gate.
///
/// # Example
/// ```
/// use clinometer_calibration::StatAccumulator;
///
/// let mut axis = StatAccumulator::<4>::new();
/// for value in [9.80, 9.81, 9.80, 9.81] {
///     axis.load_sample(value);
/// }
/// assert!(axis.is_ready());
/// assert!((axis.tolerance() - 0.01).abs() < 1e-5);
/// assert!((axis.mean() - 9.805).abs() < 1e-5);
/// ```
#[derive(Debug, Clone)]
pub struct StatAccumulator<const N: usize = WINDOW_SIZE> {
    /// Most recent samples, oldest first
    window: Deque<f32, N>,
    /// Mean of the window
    mean: f32,
    /// Max - min of the window
    tolerance: f32,
}

impl<const N: usize> StatAccumulator<N> {
    /// Create an empty accumulator
    pub const fn new() -> Self {
        Self {
            window: Deque::new(),
            mean: 0.0,
            tolerance: 0.0,
        }
    }

    /// Drop every sample and zero the statistics
    pub fn reset(&mut self) {
        self.window.clear();
        self.mean = 0.0;
        self.tolerance = 0.0;
    }

    /// Append a sample, evicting the oldest one when the window is full
    pub fn load_sample(&mut self, value: f32) {
        if self.window.is_full() {
            self.window.pop_front();
        }
        // Cannot fail: a slot was freed above if the window was full
        let _ = self.window.push_back(value);
        self.recompute();
    }

    fn recompute(&mut self) {
        let mut sum = 0.0;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &value in self.window.iter() {
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }

        let count = self.window.len();
        if count == 0 {
            self.mean = 0.0;
            self.tolerance = 0.0;
        } else {
            self.mean = sum / count as f32;
            self.tolerance = max - min;
        }
    }

    /// Whether the window holds `N` samples
    pub fn is_ready(&self) -> bool {
        self.window.is_full()
    }

    /// Window fill level in percent, 0 to 100
    pub fn percent_loaded(&self) -> f32 {
        if N == 0 {
            return 100.0;
        }
        100.0 * self.window.len() as f32 / N as f32
    }

    /// Spread (max - min) of the samples in the window
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Mean of the whole window, 0 when empty
    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// Mean of the `tail` most recent samples
    ///
    /// `tail` is clamped to the number of samples held, so asking for more
    /// than the window contains returns the full-window mean. A `tail` of zero
    /// is treated as one. Returns 0 when the window is empty.
    pub fn mean_of_tail(&self, tail: usize) -> f32 {
        let count = self.window.len();
        if count == 0 {
            return 0.0;
        }
        let tail = tail.clamp(1, count);
        let sum: f32 = self.window.iter().skip(count - tail).sum();
        sum / tail as f32
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether the window is empty
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Window capacity
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for StatAccumulator<N> {
    fn default() -> Self {
        Self::new()
    }
}
