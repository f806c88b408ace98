//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DetectError;

/// Daily close/volume bar for a single instrument.
///
/// Dates are unique and strictly ascending within a series. Any other
/// columns a history source carries (open, high, low) are not needed by the
/// engine and are dropped at the loading boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, close: f64, volume: f64) -> Self {
        Self {
            date,
            close,
            volume,
        }
    }
}

/// Indicator values computed once per bar for a single run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedBar {
    pub ema: f64,
    /// `None` during the volume window warmup.
    pub volume_baseline: Option<f64>,
}

/// Reject series the engine cannot reason about.
///
/// Checks, in bar order: non-empty, finite close, finite non-negative volume,
/// strictly ascending dates (a repeated date is rejected as well).
pub fn validate_series(bars: &[Bar]) -> Result<(), DetectError> {
    if bars.is_empty() {
        return Err(DetectError::EmptySeries);
    }

    let mut previous: Option<NaiveDate> = None;
    for (index, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() {
            return Err(DetectError::InvalidClose {
                index,
                date: bar.date,
                close: bar.close,
            });
        }
        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(DetectError::InvalidVolume {
                index,
                date: bar.date,
                volume: bar.volume,
            });
        }
        if let Some(prev) = previous {
            if bar.date <= prev {
                return Err(DetectError::DateOrder {
                    index,
                    previous: prev,
                    date: bar.date,
                });
            }
        }
        previous = Some(bar.date);
    }

    Ok(())
}
