//! Exponential Moving Average (EMA), unadjusted.
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (span + 1).
//! Seed: EMA[0] = close[0]. No bias correction, so there is no warmup.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    name: String,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be >= 1");
        Self {
            span,
            name: format!("ema_{span}"),
        }
    }

    pub fn span(&self) -> usize {
        self.span
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.span)
    }
}

/// Compute the anchored EMA of an arbitrary series in a single forward pass.
///
/// Returns all-NaN for `span == 0`.
pub fn ema_of_series(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return vec![f64::NAN; values.len()];
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut result = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &v in values {
        let ema = match prev {
            None => v,
            // Same recurrence, written so a constant series is an exact fixed point.
            Some(p) => p + alpha * (v - p),
        };
        result.push(ema);
        prev = Some(ema);
    }

    result
}
