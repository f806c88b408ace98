//! End-to-end detector tests through the public API.

use chrono::NaiveDate;
use crosslab_core::indicators::ema_of_series;
use crosslab_core::{
    derive_bars, detect_crossovers, detect_recent_crossovers, summarize, Bar, CrossType,
    DetectError, DetectorParams, Outcome, Scope,
};

fn bars_from(closes: &[f64], volumes: &[f64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&c, &v))| Bar::new(base + chrono::Duration::days(i as i64), c, v))
        .collect()
}

/// Rising ramp for 30 bars, then a 1% breakdown on 1.5x volume, then flat.
fn breakdown_series(tail_close_offset: f64, breakdown_volume_ratio: f64) -> Vec<Bar> {
    let params = DetectorParams::default();
    let mut closes: Vec<f64> = (0..30).map(|i| 200.0 + 0.5 * i as f64).collect();
    let ema_29 = *ema_of_series(&closes, params.ema_span).last().unwrap();
    let alpha = 2.0 / (params.ema_span as f64 + 1.0);
    let c30 = 0.99 * (1.0 - alpha) * ema_29 / (1.0 - 0.99 * alpha);
    closes.push(c30);
    closes.extend(std::iter::repeat(c30 + tail_close_offset).take(29));

    let r = breakdown_volume_ratio;
    let mut volumes = vec![5_000.0; 60];
    volumes[30] = r * 19.0 * 5_000.0 / (20.0 - r);
    bars_from(&closes, &volumes)
}

#[test]
fn breakdown_yields_one_support_event() {
    let bars = breakdown_series(-2.0, 1.5);
    let events = detect_crossovers("RELIANCE", &bars, &DetectorParams::default()).unwrap();

    assert_eq!(events.len(), 1);
    let e = &events[0];
    assert_eq!(e.kind, CrossType::Support);
    assert_eq!(e.date, bars[30].date);
    assert_eq!(e.pl_1d, bars[30].close - bars[31].close);
    assert_eq!(e.pl_1d_result, Outcome::Profit);
    assert_eq!(e.pl_1w_result, Outcome::Profit);
}

#[test]
fn breakdown_on_weak_volume_yields_nothing() {
    let bars = breakdown_series(-2.0, 1.1);
    let events = detect_crossovers("RELIANCE", &bars, &DetectorParams::default()).unwrap();
    assert!(events.is_empty());
}

#[test]
fn breakdown_below_threshold_yields_nothing() {
    let bars = breakdown_series(-2.0, 1.5);
    let params = DetectorParams {
        breakout_threshold: 0.02,
        ..DetectorParams::default()
    };
    assert!(detect_crossovers("RELIANCE", &bars, &params)
        .unwrap()
        .is_empty());
}

#[test]
fn bounce_after_breakdown_is_a_loss() {
    // Price recovers to the breakdown close: zero P&L counts as loss.
    let bars = breakdown_series(0.0, 1.5);
    let events = detect_crossovers("RELIANCE", &bars, &DetectorParams::default()).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].pl_1d, 0.0);
    assert_eq!(events[0].pl_1d_result, Outcome::Loss);
    assert_eq!(events[0].pl_1w_result, Outcome::Loss);
}

#[test]
fn recent_window_misses_old_breakdown() {
    let bars = breakdown_series(-2.0, 1.5);
    let recent =
        detect_recent_crossovers("RELIANCE", &bars, 25, &DetectorParams::default()).unwrap();
    assert!(recent.is_empty());
    assert!(summarize(Scope::Global, &recent).is_none());
}

#[test]
fn derived_bars_expose_ema_and_baseline() {
    let bars = breakdown_series(-2.0, 1.5);
    let derived = derive_bars(&bars, &DetectorParams::default()).unwrap();
    assert_eq!(derived.len(), bars.len());
    assert_eq!(derived[0].ema, bars[0].close);
    assert!(derived[18].volume_baseline.is_none());
    assert_eq!(derived[19].volume_baseline, Some(5_000.0));
}

#[test]
fn zero_ema_never_faults() {
    // EMA(3), alpha = 0.5: ema[2] = 0.5 * 2 + 0.5 * -2 = 0 while close[2] = 2
    // sits above it. The crossing exists but the breakout filter fails closed.
    let params = DetectorParams {
        ema_span: 3,
        volume_window: 1,
        volume_mult: 0.0,
        breakout_threshold: 0.0,
    };
    let mut closes = vec![-2.0, -2.0];
    closes.extend([2.0; 8]);
    let bars = bars_from(&closes, &[100.0; 10]);
    assert!(detect_crossovers("ZERO", &bars, &params).unwrap().is_empty());

    // Nudging the crossing close moves the EMA off zero and the event appears.
    closes[2] = 3.0;
    let bars = bars_from(&closes, &[100.0; 10]);
    let events = detect_crossovers("ZERO", &bars, &params).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, CrossType::Resistance);
    assert_eq!(events[0].ema, 0.5);
}

#[test]
fn unsorted_input_is_rejected() {
    let mut bars = breakdown_series(-2.0, 1.5);
    bars.swap(10, 11);
    let err = detect_crossovers("RELIANCE", &bars, &DetectorParams::default()).unwrap_err();
    assert!(matches!(err, DetectError::DateOrder { index: 11, .. }));
}
