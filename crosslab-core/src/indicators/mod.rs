//! Trend and volume indicators.
//!
//! Indicators are pure functions: bar history in, numeric series out. Each
//! is computed in one forward pass before the crossover scan and never
//! recomputed per bar. Warmup values are `f64::NAN`.

pub mod ema;
pub mod volume_baseline;

pub use ema::{ema_of_series, Ema};
pub use volume_baseline::{rolling_mean, VolumeBaseline};

use crate::domain::Bar;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce an output series of the
/// same length. The first `lookback()` values are `f64::NAN`.
///
/// No value at bar t may depend on data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_50", "volume_sma_20").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic bars from close prices for testing, volume fixed at 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            date: base_date + chrono::Duration::days(i as i64),
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
