//! CrossLab Runner — configuration, history loading, analysis and export.
//!
//! This crate builds on `crosslab-core` to provide:
//! - TOML configuration with detector defaults
//! - History discovery and CSV loading, plus synthetic series
//! - Per-instrument (full history) and portfolio (recent window) analysis
//! - CSV, text and JSON report export with a run manifest

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{AnalysisConfig, ConfigError, ReportConfig, Settings};
pub use data_loader::{
    generate_synthetic_bars, load_history, write_history_csv, LoadError, LoadedHistory,
    HISTORY_SUFFIX,
};
pub use export::{load_manifest, save_reports, RunManifest, SCHEMA_VERSION};
pub use runner::{
    analyze_portfolio, analyze_symbol, EmaPoint, PortfolioReport, SymbolFailure, SymbolReport,
};
