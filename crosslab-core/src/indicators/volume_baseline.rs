//! Rolling volume baseline.
//!
//! Arithmetic mean of volume over a trailing window.
//! Lookback: window - 1 (first valid value at index window-1).

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct VolumeBaseline {
    window: usize,
    name: String,
}

impl VolumeBaseline {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "volume window must be >= 1");
        Self {
            window,
            name: format!("volume_sma_{window}"),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Indicator for VolumeBaseline {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        rolling_mean(&volumes, self.window)
    }
}

/// Trailing mean of `values` over `window`, NaN until the window fills.
///
/// The window sum is rolled forward; it is recomputed from scratch every
/// `window` steps so floating-point drift cannot accumulate on long series.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if window == 0 || n < window {
        return result;
    }

    let mut sum: f64 = values[..window].iter().sum();
    result[window - 1] = sum / window as f64;

    for i in window..n {
        if (i + 1) % window == 0 {
            sum = values[(i + 1 - window)..=i].iter().sum();
        } else {
            sum += values[i] - values[i - window];
        }
        result[i] = sum / window as f64;
    }

    result
}
