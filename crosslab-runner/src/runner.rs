//! Per-instrument and portfolio analysis.
//!
//! Each instrument is scanned twice with identical detector logic: once over
//! its full history (feeding the per-symbol report and summary) and once over
//! its trailing `recent_window` bars (feeding the cross-portfolio report).
//! The global summary is built from the recent-window events only.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crosslab_core::{
    derive_bars, detect_crossovers, detect_recent_crossovers, summarize, Bar, CrossoverEvent,
    DetectError, Scope, SummaryStats,
};

use crate::config::AnalysisConfig;

/// One point of the exported EMA history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmaPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub ema: f64,
}

/// Everything computed for a single instrument.
#[derive(Debug, Clone)]
pub struct SymbolReport {
    pub symbol: String,
    pub ema_history: Vec<EmaPoint>,
    /// Events over the full history.
    pub events: Vec<CrossoverEvent>,
    /// Summary of `events`; `None` when there are none.
    pub summary: Option<SummaryStats>,
    /// Events over the trailing recent window.
    pub recent_events: Vec<CrossoverEvent>,
}

/// An instrument whose series the engine rejected.
#[derive(Debug, Clone)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: DetectError,
}

/// Portfolio-wide result of one run.
#[derive(Debug, Clone, Default)]
pub struct PortfolioReport {
    /// Successful instruments in ascending symbol order.
    pub symbols: Vec<SymbolReport>,
    pub failures: Vec<SymbolFailure>,
    /// Recent-window events of every instrument, grouped by symbol.
    pub recent_events: Vec<CrossoverEvent>,
    /// Summary of `recent_events`; `None` when there are none.
    pub global_summary: Option<SummaryStats>,
}

impl PortfolioReport {
    pub fn total_events(&self) -> usize {
        self.symbols.iter().map(|s| s.events.len()).sum()
    }
}

/// Analyze one instrument's series.
pub fn analyze_symbol(
    symbol: &str,
    bars: &[Bar],
    config: &AnalysisConfig,
) -> Result<SymbolReport, DetectError> {
    let params = &config.detector;

    let events = detect_crossovers(symbol, bars, params)?;
    let ema_history = derive_bars(bars, params)?
        .into_iter()
        .zip(bars)
        .map(|(d, bar)| EmaPoint {
            date: bar.date,
            close: bar.close,
            ema: d.ema,
        })
        .collect();
    let summary = summarize(Scope::Symbol(symbol.to_string()), &events);
    let recent_events =
        detect_recent_crossovers(symbol, bars, config.report.recent_window, params)?;

    Ok(SymbolReport {
        symbol: symbol.to_string(),
        ema_history,
        events,
        summary,
        recent_events,
    })
}

/// Analyze every instrument and aggregate the recent-window events.
///
/// Instruments are independent; with `report.parallel` set they run on the
/// rayon pool. Output order is by symbol either way. A rejected series is
/// recorded in `failures` and does not stop the others.
pub fn analyze_portfolio(
    series: &[(String, Vec<Bar>)],
    config: &AnalysisConfig,
) -> PortfolioReport {
    let run = |(symbol, bars): &(String, Vec<Bar>)| {
        analyze_symbol(symbol, bars, config).map_err(|error| SymbolFailure {
            symbol: symbol.clone(),
            error,
        })
    };

    let mut outcomes: Vec<Result<SymbolReport, SymbolFailure>> = if config.report.parallel {
        series.par_iter().map(run).collect()
    } else {
        series.iter().map(run).collect()
    };
    outcomes.sort_by(|a, b| outcome_symbol(a).cmp(outcome_symbol(b)));

    let mut report = PortfolioReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(symbol_report) => {
                info!(
                    symbol = %symbol_report.symbol,
                    events = symbol_report.events.len(),
                    recent = symbol_report.recent_events.len(),
                    "analyzed"
                );
                report
                    .recent_events
                    .extend(symbol_report.recent_events.iter().cloned());
                report.symbols.push(symbol_report);
            }
            Err(failure) => {
                warn!(symbol = %failure.symbol, error = %failure.error, "series rejected");
                report.failures.push(failure);
            }
        }
    }
    report.global_summary = summarize(Scope::Global, &report.recent_events);
    report
}

fn outcome_symbol(outcome: &Result<SymbolReport, SymbolFailure>) -> &str {
    match outcome {
        Ok(r) => &r.symbol,
        Err(f) => &f.symbol,
    }
}
