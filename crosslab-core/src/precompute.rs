//! Indicator precomputation for one series.
//!
//! The EMA and the volume baseline are each computed once, in a single
//! forward pass, before the crossover scan begins.

use crate::detector::DetectorParams;
use crate::domain::{Bar, DerivedBar};
use crate::error::DetectError;
use crate::indicators::{Ema, Indicator, VolumeBaseline};

/// Compute per-bar EMA and volume baseline for `bars`.
///
/// A baseline still inside its warmup window is reported as `None`.
pub fn derive_bars(
    bars: &[Bar],
    params: &DetectorParams,
) -> Result<Vec<DerivedBar>, DetectError> {
    params.validate()?;

    let indicators: [Box<dyn Indicator>; 2] = [
        Box::new(Ema::new(params.ema_span)),
        Box::new(VolumeBaseline::new(params.volume_window)),
    ];
    let [ema, baseline] = indicators.map(|ind| {
        let series = ind.compute(bars);
        debug_assert_eq!(
            series.len(),
            bars.len(),
            "indicator '{}' produced {} values for {} bars",
            ind.name(),
            series.len(),
            bars.len()
        );
        series
    });

    Ok(ema
        .into_iter()
        .zip(baseline)
        .map(|(ema, vb)| DerivedBar {
            ema,
            volume_baseline: (!vb.is_nan()).then_some(vb),
        })
        .collect())
}
