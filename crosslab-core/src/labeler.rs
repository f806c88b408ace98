//! Forward-return labeling for crossover events.
//!
//! Horizons are trading-bar offsets, not calendar days. P&L is sign-adjusted
//! by event type: a Support break profits if price keeps falling, a
//! Resistance break profits if price keeps rising.

use crate::domain::{Bar, CrossType, Outcome};

/// Bars ahead for the one-day horizon.
pub const DAILY_HORIZON: usize = 1;

/// Bars ahead for the one-week horizon. Events are never reported within
/// this many bars of the end of the scanned range.
pub const WEEKLY_HORIZON: usize = 5;

/// Directional outcome of an event at both horizons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForwardReturns {
    pub forward_close_1d: f64,
    pub pl_1d: f64,
    pub pl_1d_result: Outcome,
    pub forward_close_1w: f64,
    pub pl_1w: f64,
    pub pl_1w_result: Outcome,
}

impl ForwardReturns {
    pub fn label(
        kind: CrossType,
        close: f64,
        forward_close_1d: f64,
        forward_close_1w: f64,
    ) -> Self {
        let pl_1d = directional_pl(kind, close, forward_close_1d);
        let pl_1w = directional_pl(kind, close, forward_close_1w);
        Self {
            forward_close_1d,
            pl_1d,
            pl_1d_result: Outcome::from_pl(pl_1d),
            forward_close_1w,
            pl_1w,
            pl_1w_result: Outcome::from_pl(pl_1w),
        }
    }

    /// Label the event at `index`, or `None` if the series ends before the
    /// weekly horizon.
    pub fn at(kind: CrossType, bars: &[Bar], index: usize) -> Option<Self> {
        let close = bars.get(index)?.close;
        let daily = bars.get(index + DAILY_HORIZON)?.close;
        let weekly = bars.get(index + WEEKLY_HORIZON)?.close;
        Some(Self::label(kind, close, daily, weekly))
    }
}

/// P&L of holding from `close` to `forward_close` in the event's direction.
pub fn directional_pl(kind: CrossType, close: f64, forward_close: f64) -> f64 {
    match kind {
        CrossType::Support => close - forward_close,
        CrossType::Resistance => forward_close - close,
    }
}
