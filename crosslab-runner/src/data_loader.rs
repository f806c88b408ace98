//! History loading for the runner.
//!
//! Reads one `<SYMBOL>_historical.csv` per instrument from the history
//! directory of a configured date range. Only `date`, `close` and `volume`
//! are used; any other broker columns are ignored.
//!
//! Rows are sorted by date before they reach the engine. Duplicate dates are
//! left in place so the engine's validation rejects them rather than this
//! layer guessing which row is correct.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crosslab_core::Bar;

/// File-name suffix of a per-symbol history file.
pub const HISTORY_SUFFIX: &str = "_historical.csv";

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no history files found in {}", dir.display())]
    NoHistory { dir: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    #[error("{source_name}: missing required column `{column}`")]
    MissingColumn {
        source_name: String,
        column: &'static str,
    },

    #[error("{source_name} row {row}: unrecognised date `{value}`")]
    BadDate {
        source_name: String,
        row: usize,
        value: String,
    },
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    date: String,
    close: f64,
    volume: f64,
}

/// All instrument series found in a history directory.
#[derive(Debug, Default)]
pub struct LoadedHistory {
    /// `(symbol, bars)` in ascending symbol order.
    pub series: Vec<(String, Vec<Bar>)>,
    /// Symbols whose file had no `date` column.
    pub skipped: Vec<String>,
    /// `(symbol, error)` for files that could not be read or parsed.
    pub failed: Vec<(String, String)>,
    /// BLAKE3 over every loaded bar, in symbol order.
    pub dataset_hash: String,
}

/// Load every `*_historical.csv` in `dir`.
///
/// A file that cannot be read or parsed is recorded in
/// [`LoadedHistory::failed`] and does not stop the other symbols loading.
/// Only a missing or unreadable directory is an error.
pub fn load_history(dir: &Path) -> Result<LoadedHistory, LoadError> {
    let files = discover_history_files(dir)?;
    if files.is_empty() {
        return Err(LoadError::NoHistory {
            dir: dir.to_path_buf(),
        });
    }

    let mut loaded = LoadedHistory::default();
    for (symbol, path) in files {
        match read_history_csv(&path) {
            Ok(Some(bars)) => {
                debug!(symbol = %symbol, bars = bars.len(), "loaded history");
                loaded.series.push((symbol, bars));
            }
            Ok(None) => {
                warn!(
                    symbol = %symbol,
                    path = %path.display(),
                    "no `date` column, skipping"
                );
                loaded.skipped.push(symbol);
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "unreadable history");
                loaded.failed.push((symbol, e.to_string()));
            }
        }
    }
    loaded.dataset_hash = dataset_hash(&loaded.series);

    info!(
        dir = %dir.display(),
        symbols = loaded.series.len(),
        skipped = loaded.skipped.len(),
        failed = loaded.failed.len(),
        "history loaded"
    );
    Ok(loaded)
}

/// List `(symbol, path)` for each history file in `dir`, sorted by symbol.
pub fn discover_history_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::NoHistory {
            dir: dir.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(symbol) = name.strip_suffix(HISTORY_SUFFIX) {
            if !symbol.is_empty() && path.is_file() {
                files.push((symbol.to_string(), path.clone()));
            }
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Read one history file. `Ok(None)` means the file has no `date` column.
pub fn read_history_csv(path: &Path) -> Result<Option<Vec<Bar>>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_history(file, &path.display().to_string())
}

/// Parse history CSV from any reader; `source_name` labels errors.
pub fn parse_history<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Option<Vec<Bar>>, LoadError> {
    let csv_err = |source: csv::Error| LoadError::Csv {
        source_name: source_name.to_string(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers().map_err(csv_err)?.clone();
    if !headers.iter().any(|h| h == "date") {
        return Ok(None);
    }
    for column in ["close", "volume"] {
        if !headers.iter().any(|h| h == column) {
            return Err(LoadError::MissingColumn {
                source_name: source_name.to_string(),
                column,
            });
        }
    }

    let mut bars = Vec::new();
    for (row, record) in rdr.deserialize::<HistoryRow>().enumerate() {
        let record = record.map_err(csv_err)?;
        let date = parse_date(&record.date).ok_or_else(|| LoadError::BadDate {
            source_name: source_name.to_string(),
            row: row + 1,
            value: record.date.clone(),
        })?;
        bars.push(Bar::new(date, record.close, record.volume));
    }

    bars.sort_by_key(|b| b.date);
    Ok(Some(bars))
}

/// Accepts plain dates and the timestamp forms broker exports use.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}

/// Write bars in the history CSV layout (`date,close,volume`).
pub fn write_history_csv(path: &Path, bars: &[Bar]) -> anyhow::Result<()> {
    use anyhow::Context;

    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for bar in bars {
        wtr.serialize(bar)?;
    }
    wtr.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

/// Compute a deterministic BLAKE3 hash over all series.
fn dataset_hash(series: &[(String, Vec<Bar>)]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (symbol, bars) in series {
        hasher.update(symbol.as_bytes());
        for bar in bars {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate synthetic weekday bars for dry runs and tests.
///
/// A random walk from 100.0 with occasional volume surges on larger moves,
/// so the default detector finds some crossings. Deterministic per
/// `(symbol, seed)`.
pub fn generate_synthetic_bars(
    symbol: &str,
    start: NaiveDate,
    count: usize,
    seed: u64,
) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut seed_input = symbol.as_bytes().to_vec();
    seed_input.extend_from_slice(&seed.to_le_bytes());
    let mut rng = StdRng::from_seed(*blake3::hash(&seed_input).as_bytes());

    let mut bars = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    let mut current = start;

    while bars.len() < count {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let surge = rng.gen_bool(0.08);
        let daily_return: f64 = if surge {
            rng.gen_range(-0.05..0.05)
        } else {
            rng.gen_range(-0.015..0.015)
        };
        price *= 1.0 + daily_return;
        let mut volume = rng.gen_range(500_000.0..1_500_000.0_f64).round();
        if surge {
            volume *= rng.gen_range(1.5..3.0);
        }

        bars.push(Bar::new(current, price, volume.round()));
        current += chrono::Duration::days(1);
    }

    bars
}
