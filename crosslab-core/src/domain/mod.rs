//! Domain types for CrossLab

pub mod bar;
pub mod event;

pub use bar::{validate_series, Bar, DerivedBar};
pub use event::{CrossType, CrossoverEvent, Outcome};
