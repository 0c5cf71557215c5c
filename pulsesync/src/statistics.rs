//! Moving statistics over measured clock deviations

/// Number of deviation samples kept
pub const HISTORY_LEN: usize = 100;

/// Size of the short moving window
pub const SHORT_WINDOW: usize = 10;

/// Bounded history of clock deviation samples with derived statistics.
///
/// Samples are in seconds; positive means the local clock is behind the
/// master. Index 0 holds the newest sample. Slots not yet filled count as
/// zero-valued samples, so the 100 sample window is biased toward zero until
/// it has seen 100 measurements.
///
/// All statistics are recomputed from scratch on every [`record`](Self::record).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeviationHistory {
    #[cfg_attr(feature = "serde", serde(skip))]
    samples: [f64; HISTORY_LEN],
    recorded: u64,
    /// Mean of the last 10 samples
    pub mu_10: f64,
    /// Mean of the last 100 samples
    pub mu_100: f64,
    /// Largest distance of one of the last 10 samples to `mu_10`
    pub delta_10_max: f64,
    /// Largest distance of one of the last 100 samples to `mu_100`
    pub delta_100_max: f64,
    /// Mean distance of the last 10 samples to `mu_10`
    pub delta_10_bar: f64,
    /// Mean distance of the last 100 samples to `mu_100`
    pub delta_100_bar: f64,
}

impl Default for DeviationHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean of the window and the (max, mean) absolute distance to it
fn window_statistics(window: &[f64]) -> (f64, f64, f64) {
    let len = window.len() as f64;
    let mu = window.iter().sum::<f64>() / len;

    let (max, sum) = window
        .iter()
        .map(|sample| (sample - mu).abs())
        .fold((0.0f64, 0.0), |(max, sum), delta| (max.max(delta), sum + delta));

    (mu, max, sum / len)
}

impl DeviationHistory {
    pub const fn new() -> Self {
        Self {
            samples: [0.0; HISTORY_LEN],
            recorded: 0,
            mu_10: 0.0,
            mu_100: 0.0,
            delta_10_max: 0.0,
            delta_100_max: 0.0,
            delta_10_bar: 0.0,
            delta_100_bar: 0.0,
        }
    }

    /// Push a new deviation sample, dropping the oldest, and recompute the
    /// statistics. The sample must be finite.
    pub fn record(&mut self, deviation: f64) {
        debug_assert!(deviation.is_finite());

        self.samples.copy_within(0..HISTORY_LEN - 1, 1);
        self.samples[0] = deviation;
        self.recorded = self.recorded.saturating_add(1);

        (self.mu_10, self.delta_10_max, self.delta_10_bar) =
            window_statistics(&self.samples[..SHORT_WINDOW]);
        (self.mu_100, self.delta_100_max, self.delta_100_bar) =
            window_statistics(&self.samples[..]);
    }

    /// The most recent sample, zero before the first measurement
    pub fn current(&self) -> f64 {
        self.samples[0]
    }

    /// All samples, newest first
    pub fn samples(&self) -> &[f64; HISTORY_LEN] {
        &self.samples
    }

    /// Number of samples recorded since creation
    pub fn recorded(&self) -> u64 {
        self.recorded
    }
}
