//! CrossLab Core — EMA crossover detection, forward-return labeling, aggregation.
//!
//! This crate contains the analysis engine and nothing else:
//! - Domain types (bars, derived indicator values, crossover events)
//! - Indicators (anchored EMA, rolling volume baseline)
//! - Crossover detector with breakout and volume confirmation
//! - Forward-return labeler at 1-bar and 5-bar horizons
//! - Summary aggregation per instrument and across a portfolio
//!
//! All inputs are fully materialized; no I/O happens here.

pub mod aggregate;
pub mod detector;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod labeler;
pub mod precompute;

pub use aggregate::{summarize, Scope, SummaryStats};
pub use detector::{detect_crossovers, detect_recent_crossovers, DetectorParams};
pub use domain::{Bar, CrossType, CrossoverEvent, DerivedBar, Outcome};
pub use error::DetectError;
pub use labeler::{ForwardReturns, DAILY_HORIZON, WEEKLY_HORIZON};
pub use precompute::derive_bars;
