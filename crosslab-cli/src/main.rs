//! CrossLab CLI — analyze history for EMA crossovers, or generate sample data.
//!
//! Commands:
//! - `analyze` — run the crossover analysis described by a TOML config
//! - `synth` — write synthetic `<SYMBOL>_historical.csv` files for a dry run
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crosslab_core::SummaryStats;
use crosslab_runner::{
    analyze_portfolio, generate_synthetic_bars, load_history, save_reports, write_history_csv,
    AnalysisConfig, HISTORY_SUFFIX,
};

#[derive(Parser)]
#[command(
    name = "crosslab",
    about = "CrossLab CLI — EMA crossover support/resistance analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every history file for the configured date range.
    Analyze {
        /// Path to a TOML config file.
        #[arg(long, default_value = "config/crosslab.toml")]
        config: PathBuf,

        /// Override the results directory from the config.
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Analyze instruments one at a time instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Write synthetic history files.
    Synth {
        /// Output directory (created if missing).
        #[arg(long)]
        out: PathBuf,

        /// Comma-separated symbols.
        #[arg(long, value_delimiter = ',', default_value = "ALPHA,BETA,GAMMA")]
        symbols: Vec<String>,

        /// Number of weekday bars per symbol.
        #[arg(long, default_value_t = 500)]
        bars: usize,

        /// First date (YYYY-MM-DD).
        #[arg(long, default_value = "2021-01-01")]
        start: String,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            config,
            results_dir,
            sequential,
        } => run_analyze(&config, results_dir, sequential),
        Commands::Synth {
            out,
            symbols,
            bars,
            start,
            seed,
        } => run_synth(&out, &symbols, bars, &start, seed),
    }
}

fn run_analyze(config_path: &Path, results_dir: Option<PathBuf>, sequential: bool) -> Result<()> {
    let mut config = AnalysisConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(dir) = results_dir {
        config.settings.results_dir = dir;
    }
    if sequential {
        config.report.parallel = false;
    }

    let history_dir = config.history_dir();
    info!(dir = %history_dir.display(), "loading history");
    let loaded = load_history(&history_dir)?;

    let report = analyze_portfolio(&loaded.series, &config);
    let manifest = save_reports(&report, &config, &loaded, &config.settings.results_dir)?;

    match &report.global_summary {
        Some(summary) => print_summary(summary, config.report.recent_window),
        None => println!(
            "No EMA crosses found in the last {} bars.",
            config.report.recent_window
        ),
    }
    println!(
        "Results saved to: {} ({} symbols, {} full-history events)",
        config.settings.results_dir.display(),
        manifest.symbols_analyzed,
        manifest.total_events
    );

    if !manifest.failures.is_empty() {
        for failure in &manifest.failures {
            eprintln!("Error for {}: {}", failure.symbol, failure.error);
        }
        bail!("{} symbol(s) had invalid history", manifest.failures.len());
    }

    Ok(())
}

fn print_summary(summary: &SummaryStats, recent_window: usize) {
    println!("=== Recent {recent_window}-bar EMA crosses (all symbols) ===");
    println!("{}", summary.render_text());
}

fn run_synth(out: &Path, symbols: &[String], bars: usize, start: &str, seed: u64) -> Result<()> {
    let start_date = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start date '{start}'"))?;
    if symbols.is_empty() {
        bail!("at least one symbol is required");
    }

    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    for symbol in symbols {
        let series = generate_synthetic_bars(symbol, start_date, bars, seed);
        let path = out.join(format!("{symbol}{HISTORY_SUFFIX}"));
        write_history_csv(&path, &series)?;
        info!(
            symbol = %symbol,
            bars = series.len(),
            path = %path.display(),
            "wrote synthetic history"
        );
    }
    Ok(())
}
