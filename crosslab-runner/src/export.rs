//! Report export — CSV, text and JSON artifacts.
//!
//! Layout under the results directory:
//! - `<SYMBOL>/ema<span>_history.csv` — close and EMA for every bar
//! - `<SYMBOL>/breakout_analysis.csv` — full-history events (only if any)
//! - `<SYMBOL>/summary.txt` — full-history summary (only if any events)
//! - `recent_<window>day_ema_crosses.csv` — recent-window events, all symbols
//! - `summary.txt` — global summary of the recent-window events
//! - `manifest.json` — run fingerprint and counts
//!
//! Absent events mean absent files; nothing is written zero-filled.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crosslab_core::{CrossoverEvent, SummaryStats};

use crate::config::AnalysisConfig;
use crate::data_loader::LoadedHistory;
use crate::runner::{EmaPoint, PortfolioReport, SymbolReport};

/// Schema version of `manifest.json`.
pub const SCHEMA_VERSION: u32 = 1;

// ─── CSV export ─────────────────────────────────────────────────────

const EVENT_COLUMNS: [&str; 13] = [
    "symbol",
    "date",
    "type",
    "close",
    "ema",
    "volume",
    "volume_baseline",
    "forward_close_1d",
    "pl_1d",
    "pl_1d_result",
    "forward_close_1w",
    "pl_1w",
    "pl_1w_result",
];

/// Export crossover events as CSV, one row per event.
pub fn export_events_csv(events: &[CrossoverEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(EVENT_COLUMNS)?;

    for e in events {
        wtr.write_record([
            e.symbol.as_str(),
            &e.date.format("%Y-%m-%d").to_string(),
            &e.kind.to_string(),
            &format!("{:.6}", e.close),
            &format!("{:.6}", e.ema),
            &format!("{:.6}", e.volume),
            &format!("{:.6}", e.volume_baseline),
            &format!("{:.6}", e.forward_close_1d),
            &format!("{:.6}", e.pl_1d),
            &e.pl_1d_result.to_string(),
            &format!("{:.6}", e.forward_close_1w),
            &format!("{:.6}", e.pl_1w),
            &e.pl_1w_result.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the close/EMA history of one instrument.
pub fn export_ema_history_csv(points: &[EmaPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "close", "ema"])?;
    for p in points {
        wtr.write_record([
            p.date.format("%Y-%m-%d").to_string(),
            format!("{:.6}", p.close),
            format!("{:.6}", p.ema),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Manifest ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureRecord {
    pub symbol: String,
    pub error: String,
}

/// Fingerprint and counts for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub schema_version: u32,
    pub config_hash: String,
    pub dataset_hash: String,
    pub ema_span: usize,
    pub recent_window: usize,
    pub symbols_analyzed: usize,
    pub symbols_skipped: Vec<String>,
    pub failures: Vec<FailureRecord>,
    pub total_events: usize,
    pub recent_events: usize,
    pub global_summary: Option<SummaryStats>,
}

impl RunManifest {
    /// Failures from loading and from analysis are merged, ordered by symbol.
    pub fn new(report: &PortfolioReport, config: &AnalysisConfig, history: &LoadedHistory) -> Self {
        let mut failures: Vec<FailureRecord> = history
            .failed
            .iter()
            .map(|(symbol, error)| FailureRecord {
                symbol: symbol.clone(),
                error: error.clone(),
            })
            .chain(report.failures.iter().map(|f| FailureRecord {
                symbol: f.symbol.clone(),
                error: f.error.to_string(),
            }))
            .collect();
        failures.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        Self {
            schema_version: SCHEMA_VERSION,
            config_hash: config.config_hash(),
            dataset_hash: history.dataset_hash.clone(),
            ema_span: config.detector.ema_span,
            recent_window: config.report.recent_window,
            symbols_analyzed: report.symbols.len(),
            symbols_skipped: history.skipped.clone(),
            failures,
            total_events: report.total_events(),
            recent_events: report.recent_events.len(),
            global_summary: report.global_summary.clone(),
        }
    }
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write one instrument's artifacts under `results_dir/<symbol>/`.
pub fn save_symbol_report(
    report: &SymbolReport,
    ema_span: usize,
    results_dir: &Path,
) -> Result<PathBuf> {
    let dir = results_dir.join(&report.symbol);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create symbol dir: {}", dir.display()))?;

    let ema_csv = export_ema_history_csv(&report.ema_history)?;
    write_file(&dir.join(format!("ema{ema_span}_history.csv")), &ema_csv)?;

    if !report.events.is_empty() {
        let events_csv = export_events_csv(&report.events)?;
        write_file(&dir.join("breakout_analysis.csv"), &events_csv)?;
    }
    if let Some(summary) = &report.summary {
        write_file(&dir.join("summary.txt"), &summary.render_text())?;
    }

    Ok(dir)
}

/// Write the full artifact set for a portfolio run.
pub fn save_reports(
    report: &PortfolioReport,
    config: &AnalysisConfig,
    history: &LoadedHistory,
    results_dir: &Path,
) -> Result<RunManifest> {
    std::fs::create_dir_all(results_dir)
        .with_context(|| format!("failed to create results dir: {}", results_dir.display()))?;

    for symbol_report in &report.symbols {
        save_symbol_report(symbol_report, config.detector.ema_span, results_dir)?;
    }

    if !report.recent_events.is_empty() {
        let recent_csv = export_events_csv(&report.recent_events)?;
        let name = format!("recent_{}day_ema_crosses.csv", config.report.recent_window);
        write_file(&results_dir.join(name), &recent_csv)?;
    }
    if let Some(summary) = &report.global_summary {
        write_file(&results_dir.join("summary.txt"), &summary.render_text())?;
    }

    let manifest = RunManifest::new(report, config, history);
    let json = serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?;
    write_file(&results_dir.join("manifest.json"), &json)?;

    info!(
        dir = %results_dir.display(),
        symbols = manifest.symbols_analyzed,
        recent_events = manifest.recent_events,
        failures = manifest.failures.len(),
        "reports written"
    );
    Ok(manifest)
}

/// Load a manifest written by [`save_reports`], rejecting newer schemas.
pub fn load_manifest(results_dir: &Path) -> Result<RunManifest> {
    let path = results_dir.join("manifest.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: RunManifest =
        serde_json::from_str(&json).context("failed to deserialize manifest")?;
    if manifest.schema_version > SCHEMA_VERSION {
        anyhow::bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
