//! Summary statistics over a set of crossover events.
//!
//! An empty event set has no summary at all. Callers must treat `None` as
//! "nothing to report" rather than as a zero-filled record.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{CrossType, CrossoverEvent};

/// What a summary covers: one instrument, or the whole portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Symbol(String),
    Global,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Symbol(s) => f.write_str(s),
            Scope::Global => f.write_str("global"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub scope: Scope,
    pub total: usize,
    pub support_count: usize,
    pub resistance_count: usize,
    pub profit_1d_count: usize,
    /// `profit_1d_count / total` as an unrounded ratio.
    pub profit_1d_pct: f64,
    pub profit_1w_count: usize,
    /// `profit_1w_count / total` as an unrounded ratio.
    pub profit_1w_pct: f64,
}

impl SummaryStats {
    /// Human-readable report, one statistic per line.
    pub fn render_text(&self) -> String {
        let mut lines = Vec::with_capacity(6);
        if let Scope::Symbol(symbol) = &self.scope {
            lines.push(format!("Symbol: {symbol}"));
        }
        lines.push(format!("Total crosses: {}", self.total));
        lines.push(format!("Support crosses: {}", self.support_count));
        lines.push(format!("Resistance crosses: {}", self.resistance_count));
        lines.push(format!(
            "1D Profit: {} / {} ({:.2}%)",
            self.profit_1d_count,
            self.total,
            self.profit_1d_pct * 100.0
        ));
        lines.push(format!(
            "1W Profit: {} / {} ({:.2}%)",
            self.profit_1w_count,
            self.total,
            self.profit_1w_pct * 100.0
        ));
        lines.join("\n")
    }
}

/// Reduce `events` to summary statistics, or `None` if there are none.
pub fn summarize(scope: Scope, events: &[CrossoverEvent]) -> Option<SummaryStats> {
    let total = events.len();
    if total == 0 {
        return None;
    }

    let support_count = events
        .iter()
        .filter(|e| e.kind == CrossType::Support)
        .count();
    let profit_1d_count = events.iter().filter(|e| e.pl_1d_result.is_profit()).count();
    let profit_1w_count = events.iter().filter(|e| e.pl_1w_result.is_profit()).count();

    Some(SummaryStats {
        scope,
        total,
        support_count,
        resistance_count: total - support_count,
        profit_1d_count,
        profit_1d_pct: profit_1d_count as f64 / total as f64,
        profit_1w_count,
        profit_1w_pct: profit_1w_count as f64 / total as f64,
    })
}
