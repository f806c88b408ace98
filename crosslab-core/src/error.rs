//! Errors surfaced by the detection engine.
//!
//! Only malformed input and invalid parameters are errors. A zero EMA is
//! handled inside the breakout filter and an empty event set simply yields
//! no summary; neither ever reaches the caller as a failure.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    #[error("series is empty")]
    EmptySeries,

    #[error("bar {index} ({date}): close {close} is not a finite number")]
    InvalidClose {
        index: usize,
        date: NaiveDate,
        close: f64,
    },

    #[error("bar {index} ({date}): volume {volume} must be finite and non-negative")]
    InvalidVolume {
        index: usize,
        date: NaiveDate,
        volume: f64,
    },

    #[error("bar {index}: date {date} is not after previous date {previous}")]
    DateOrder {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}
