//! EMA crossover detection with breakout and volume confirmation.
//!
//! Scans one series in chronological order. The only memory carried from
//! bar to bar is the previous bar's close/EMA relation (`ScanContext`), so
//! the scan works the same over a full history, a trailing window, or any
//! chunked replay of it.
//!
//! A crossover at bar i is reported only when:
//! - the close/EMA relation flips between bar i-1 and bar i
//! - the breakout magnitude `|close - ema| / ema` exceeds `breakout_threshold`
//! - volume exceeds `volume_mult` times the rolling volume baseline
//! - `1 <= i` and `i + WEEKLY_HORIZON < N` (forward returns are available)

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{validate_series, Bar, CrossType, CrossoverEvent, DerivedBar};
use crate::error::DetectError;
use crate::labeler::{ForwardReturns, WEEKLY_HORIZON};
use crate::precompute::derive_bars;

/// Tunable detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// EMA span S, alpha = 2 / (S + 1).
    pub ema_span: usize,
    /// Rolling volume baseline window W.
    pub volume_window: usize,
    /// Required volume / baseline ratio (strictly greater).
    pub volume_mult: f64,
    /// Required breakout magnitude (strictly greater).
    pub breakout_threshold: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            ema_span: 50,
            volume_window: 20,
            volume_mult: 1.2,
            breakout_threshold: 0.005,
        }
    }
}

impl DetectorParams {
    pub fn validate(&self) -> Result<(), DetectError> {
        if self.ema_span == 0 {
            return Err(DetectError::InvalidParameter {
                name: "ema_span",
                reason: "must be >= 1".into(),
            });
        }
        if self.volume_window == 0 {
            return Err(DetectError::InvalidParameter {
                name: "volume_window",
                reason: "must be >= 1".into(),
            });
        }
        if !self.volume_mult.is_finite() || self.volume_mult < 0.0 {
            return Err(DetectError::InvalidParameter {
                name: "volume_mult",
                reason: format!("must be finite and >= 0, got {}", self.volume_mult),
            });
        }
        if !self.breakout_threshold.is_finite() || self.breakout_threshold < 0.0 {
            return Err(DetectError::InvalidParameter {
                name: "breakout_threshold",
                reason: format!("must be finite and >= 0, got {}", self.breakout_threshold),
            });
        }
        Ok(())
    }
}

/// Where the close sits relative to the EMA. Equality counts as not above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Above,
    NotAbove,
}

impl Relation {
    pub fn of(close: f64, ema: f64) -> Self {
        if close > ema {
            Relation::Above
        } else {
            Relation::NotAbove
        }
    }
}

/// Single-bar lookback carried through the scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanContext {
    previous: Option<Relation>,
}

impl ScanContext {
    /// Advance by one bar, returning the new context and the crossing (if any)
    /// between the previous bar and this one.
    pub fn step(self, current: Relation) -> (Self, Option<CrossType>) {
        let crossed = match (self.previous, current) {
            (Some(Relation::Above), Relation::NotAbove) => Some(CrossType::Support),
            (Some(Relation::NotAbove), Relation::Above) => Some(CrossType::Resistance),
            _ => None,
        };
        (
            Self {
                previous: Some(current),
            },
            crossed,
        )
    }
}

/// Relative distance of close from the EMA.
///
/// `None` when the EMA is zero or the ratio is not finite; callers treat
/// that as a failed breakout.
pub fn breakout_magnitude(close: f64, ema: f64) -> Option<f64> {
    if ema == 0.0 {
        return None;
    }
    let magnitude = (close - ema).abs() / ema;
    magnitude.is_finite().then_some(magnitude)
}

fn breakout_confirmed(close: f64, ema: f64, threshold: f64) -> bool {
    matches!(breakout_magnitude(close, ema), Some(m) if m > threshold)
}

fn volume_confirmed(volume: f64, baseline: Option<f64>, mult: f64) -> bool {
    match baseline {
        Some(b) => volume > mult * b,
        None => false,
    }
}

/// Detect all qualifying crossovers in `bars`, in chronological order.
///
/// The series is validated first; malformed input is the only error.
pub fn detect_crossovers(
    symbol: &str,
    bars: &[Bar],
    params: &DetectorParams,
) -> Result<Vec<CrossoverEvent>, DetectError> {
    validate_series(bars)?;
    let derived = derive_bars(bars, params)?;
    let events = scan(symbol, bars, &derived, params);

    debug!(
        symbol,
        bars = bars.len(),
        events = events.len(),
        "crossover scan complete"
    );
    Ok(events)
}

/// Run the detector over the trailing `window` bars only.
///
/// Indicators are recomputed on the slice, so the EMA re-anchors at the
/// first bar of the window. Series shorter than `window` are scanned whole.
pub fn detect_recent_crossovers(
    symbol: &str,
    bars: &[Bar],
    window: usize,
    params: &DetectorParams,
) -> Result<Vec<CrossoverEvent>, DetectError> {
    if window == 0 {
        return Err(DetectError::InvalidParameter {
            name: "recent_window",
            reason: "must be >= 1".into(),
        });
    }
    detect_crossovers(symbol, trailing_window(bars, window), params)
}

/// The last `window` bars of `bars` (all of them if shorter).
pub fn trailing_window(bars: &[Bar], window: usize) -> &[Bar] {
    &bars[bars.len().saturating_sub(window)..]
}

fn scan(
    symbol: &str,
    bars: &[Bar],
    derived: &[DerivedBar],
    params: &DetectorParams,
) -> Vec<CrossoverEvent> {
    let n = bars.len();
    let mut ctx = ScanContext::default();
    let mut events = Vec::new();

    for (i, (bar, d)) in bars.iter().zip(derived).enumerate() {
        if i + WEEKLY_HORIZON >= n {
            break;
        }

        let (next, crossed) = ctx.step(Relation::of(bar.close, d.ema));
        ctx = next;

        let Some(kind) = crossed else {
            continue;
        };
        if !breakout_confirmed(bar.close, d.ema, params.breakout_threshold)
            || !volume_confirmed(bar.volume, d.volume_baseline, params.volume_mult)
        {
            continue;
        }
        let (Some(returns), Some(baseline)) =
            (ForwardReturns::at(kind, bars, i), d.volume_baseline)
        else {
            continue;
        };

        events.push(CrossoverEvent {
            symbol: symbol.to_string(),
            date: bar.date,
            kind,
            close: bar.close,
            ema: d.ema,
            volume: bar.volume,
            volume_baseline: baseline,
            forward_close_1d: returns.forward_close_1d,
            pl_1d: returns.pl_1d,
            pl_1d_result: returns.pl_1d_result,
            forward_close_1w: returns.forward_close_1w,
            pl_1w: returns.pl_1w,
            pl_1w_result: returns.pl_1w_result,
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Outcome;
    use crate::indicators::{ema_of_series, make_bars};
    use chrono::NaiveDate;

    fn series(closes: &[f64], volumes: &[f64]) -> Vec<Bar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&c, &v))| Bar::new(base + chrono::Duration::days(i as i64), c, v))
            .collect()
    }

    /// Params with no warmup so small hand-built series can trigger events.
    fn loose_params() -> DetectorParams {
        DetectorParams {
            ema_span: 3,
            volume_window: 1,
            volume_mult: 0.0,
            breakout_threshold: 0.0,
        }
    }

    #[test]
    fn relation_ties_are_not_above() {
        assert_eq!(Relation::of(10.0, 10.0), Relation::NotAbove);
        assert_eq!(Relation::of(10.1, 10.0), Relation::Above);
        assert_eq!(Relation::of(9.9, 10.0), Relation::NotAbove);
    }

    #[test]
    fn scan_context_flags_flips_only() {
        let ctx = ScanContext::default();
        let (ctx, first) = ctx.step(Relation::Above);
        assert_eq!(first, None);
        let (ctx, same) = ctx.step(Relation::Above);
        assert_eq!(same, None);
        let (ctx, down) = ctx.step(Relation::NotAbove);
        assert_eq!(down, Some(CrossType::Support));
        let (_, up) = ctx.step(Relation::Above);
        assert_eq!(up, Some(CrossType::Resistance));
    }

    #[test]
    fn breakout_zero_ema_fails_closed() {
        assert_eq!(breakout_magnitude(1.0, 0.0), None);
        assert!(!breakout_confirmed(1.0, 0.0, 0.0));
    }

    #[test]
    fn breakout_is_relative_distance() {
        let m = breakout_magnitude(99.0, 100.0).unwrap();
        assert!((m - 0.01).abs() < 1e-12);
    }

    #[test]
    fn missing_baseline_fails_volume_confirmation() {
        assert!(!volume_confirmed(1e12, None, 0.0));
        assert!(volume_confirmed(121.0, Some(100.0), 1.2));
        assert!(!volume_confirmed(120.0, Some(100.0), 1.2));
    }

    #[test]
    fn constant_series_has_no_events() {
        let bars = make_bars(&[50.0; 80]);
        let events = detect_crossovers("FLAT", &bars, &loose_params()).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn resistance_then_support_with_loose_filters() {
        // EMA(3) anchored at 10: flat, jump above, drop below, flat tail.
        let closes = [10.0, 10.0, 14.0, 14.0, 8.0, 8.0, 8.0, 8.0, 8.0, 8.0, 8.0];
        let bars = series(&closes, &[100.0; 11]);
        let events = detect_crossovers("X", &bars, &loose_params()).unwrap();

        let kinds: Vec<CrossType> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![CrossType::Resistance, CrossType::Support]);
        assert_eq!(events[0].date, bars[2].date);
        assert_eq!(events[1].date, bars[4].date);

        // Support at 8.0, flat afterwards: zero P&L is a loss.
        assert_eq!(events[1].pl_1d, 0.0);
        assert_eq!(events[1].pl_1d_result, Outcome::Loss);
        // Resistance at 14.0, one bar later 14.0, five bars later 8.0.
        assert_eq!(events[0].forward_close_1d, 14.0);
        assert_eq!(events[0].forward_close_1w, 8.0);
        assert_eq!(events[0].pl_1w, -6.0);
    }

    #[test]
    fn crossing_inside_final_horizon_is_ignored() {
        // Cross at index 6 of 11 bars: 6 + 5 >= 11.
        let mut closes = vec![10.0; 6];
        closes.extend([20.0; 5]);
        let bars = series(&closes, &[100.0; 11]);
        let events = detect_crossovers("X", &bars, &loose_params()).unwrap();
        assert!(events.is_empty());

        // With one more bar, index 6 is the last admissible index.
        closes.push(20.0);
        let bars = series(&closes, &[100.0; 12]);
        let events = detect_crossovers("X", &bars, &loose_params()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date, bars[6].date);
    }

    #[test]
    fn breakout_filter_blocks_small_crossings() {
        let closes = [10.0, 10.0, 10.02, 10.02, 10.02, 10.02, 10.02, 10.02, 10.02];
        let bars = series(&closes, &[100.0; 9]);
        let params = DetectorParams {
            breakout_threshold: 0.005,
            ..loose_params()
        };
        // EMA(3) at index 2 is 10.01, magnitude ~0.1% < 0.5%.
        assert!(detect_crossovers("X", &bars, &params).unwrap().is_empty());
        assert_eq!(
            detect_crossovers("X", &bars, &loose_params()).unwrap().len(),
            1
        );
    }

    #[test]
    fn volume_filter_blocks_quiet_crossings() {
        let closes = [10.0, 10.0, 14.0, 14.0, 14.0, 14.0, 14.0, 14.0];
        let volumes = [100.0, 100.0, 110.0, 100.0, 100.0, 100.0, 100.0, 100.0];
        let bars = series(&closes, &volumes);
        let params = DetectorParams {
            volume_window: 2,
            volume_mult: 1.2,
            ..loose_params()
        };
        // Baseline at index 2 = 105, 110 <= 126.
        assert!(detect_crossovers("X", &bars, &params).unwrap().is_empty());

        let mut loud = volumes;
        loud[2] = 200.0;
        let bars = series(&closes, &loud);
        // Baseline = 150, 200 > 180.
        assert_eq!(detect_crossovers("X", &bars, &params).unwrap().len(), 1);
    }

    #[test]
    fn warmup_baseline_blocks_early_crossings() {
        let closes = [10.0, 14.0, 14.0, 14.0, 14.0, 14.0, 14.0, 14.0];
        let bars = series(&closes, &[1e9; 8]);
        let params = DetectorParams {
            volume_window: 3,
            ..loose_params()
        };
        // Crossing at index 1, baseline defined from index 2 onward.
        assert!(detect_crossovers("X", &bars, &params).unwrap().is_empty());
    }

    #[test]
    fn sixty_bar_support_scenario() {
        let params = DetectorParams::default();

        // Bars 0..=29 rise steadily, so close sits above the lagging EMA.
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let ema_29 = *ema_of_series(&closes, params.ema_span).last().unwrap();

        // Pick close[30] so that close = 0.99 * ema at bar 30 (1% breakout).
        let alpha = 2.0 / (params.ema_span as f64 + 1.0);
        let c30 = 0.99 * (1.0 - alpha) * ema_29 / (1.0 - 0.99 * alpha);
        closes.push(c30);
        closes.extend(std::iter::repeat(c30 - 1.0).take(29));
        assert_eq!(closes.len(), 60);

        // Volume flat at 1000 except bar 30 at 1.5x its own 20-bar baseline.
        let v30 = 1.5 * 19_000.0 / (20.0 - 1.5);
        let mut volumes = vec![1000.0; 60];
        volumes[30] = v30;

        let bars = series(&closes, &volumes);
        let events = detect_crossovers("SCN", &bars, &params).unwrap();

        assert_eq!(events.len(), 1, "events: {events:?}");
        let e = &events[0];
        assert_eq!(e.kind, CrossType::Support);
        assert_eq!(e.date, bars[30].date);
        assert_eq!(e.symbol, "SCN");
        assert!(((e.ema - e.close) / e.ema - 0.01).abs() < 1e-9);
        assert!((e.volume / e.volume_baseline - 1.5).abs() < 1e-9);
        assert_eq!(e.forward_close_1d, closes[31]);
        assert_eq!(e.pl_1d, closes[30] - closes[31]);
        assert_eq!(e.pl_1d_result, Outcome::Profit);
        assert_eq!(e.forward_close_1w, closes[35]);
    }

    #[test]
    fn recent_window_scans_only_the_tail() {
        let closes = [10.0, 10.0, 14.0, 14.0, 14.0, 14.0, 14.0, 14.0, 14.0, 14.0];
        let bars = series(&closes, &[100.0; 10]);
        assert_eq!(detect_crossovers("X", &bars, &loose_params()).unwrap().len(), 1);
        // The last 6 bars never cross.
        let recent = detect_recent_crossovers("X", &bars, 6, &loose_params()).unwrap();
        assert!(recent.is_empty());
        // A window longer than the series scans the whole thing.
        let whole = detect_recent_crossovers("X", &bars, 500, &loose_params()).unwrap();
        assert_eq!(whole.len(), 1);
    }

    #[test]
    fn zero_recent_window_is_rejected() {
        let bars = make_bars(&[10.0; 10]);
        assert!(matches!(
            detect_recent_crossovers("X", &bars, 0, &loose_params()),
            Err(DetectError::InvalidParameter { name: "recent_window", .. })
        ));
    }

    #[test]
    fn malformed_series_is_rejected() {
        let mut bars = make_bars(&[10.0; 10]);
        bars[5].date = bars[4].date;
        assert!(matches!(
            detect_crossovers("X", &bars, &loose_params()),
            Err(DetectError::DateOrder { index: 5, .. })
        ));
        assert_eq!(
            detect_crossovers("X", &[], &loose_params()),
            Err(DetectError::EmptySeries)
        );
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: DetectorParams = serde_json::from_str(r#"{"ema_span": 21}"#).unwrap();
        assert_eq!(params.ema_span, 21);
        assert_eq!(params.volume_window, 20);
        assert_eq!(params.volume_mult, 1.2);
        assert_eq!(params.breakout_threshold, 0.005);
    }

    #[test]
    fn negative_multiplier_is_invalid() {
        let params = DetectorParams {
            volume_mult: -1.0,
            ..DetectorParams::default()
        };
        assert!(params.validate().is_err());
    }
}
