//! Crossover events and their forward-return outcomes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a crossover through the EMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrossType {
    /// Close fell from above the EMA to at-or-below it.
    Support,
    /// Close rose from at-or-below the EMA to above it.
    Resistance,
}

impl fmt::Display for CrossType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossType::Support => f.write_str("Support"),
            CrossType::Resistance => f.write_str("Resistance"),
        }
    }
}

/// Result label for a directional P&L.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Profit,
    Loss,
}

impl Outcome {
    /// `Profit` only for a strictly positive P&L; zero counts as a loss.
    pub fn from_pl(pl: f64) -> Self {
        if pl > 0.0 {
            Outcome::Profit
        } else {
            Outcome::Loss
        }
    }

    pub fn is_profit(self) -> bool {
        self == Outcome::Profit
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Profit => f.write_str("Profit"),
            Outcome::Loss => f.write_str("Loss"),
        }
    }
}

/// A classified, return-labeled crossing of close through the EMA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossoverEvent {
    pub symbol: String,
    pub date: NaiveDate,
    pub kind: CrossType,
    pub close: f64,
    pub ema: f64,
    pub volume: f64,
    pub volume_baseline: f64,
    pub forward_close_1d: f64,
    pub pl_1d: f64,
    pub pl_1d_result: Outcome,
    pub forward_close_1w: f64,
    pub pl_1w: f64,
    pub pl_1w_result: Outcome,
}
