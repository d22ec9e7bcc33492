//! Command-line parsing.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the pipeline code. Flags mirror the interactive
//! controls so a TUI session can be reproduced as a one-shot `show` run.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::dates::today_utc;
use crate::domain::{ALL, DataSource, Metric, TrendModel};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "covid",
    version,
    about = "COVID-19 region time series, trend extrapolation, and terminal charts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch data, derive the selected series, and print a summary, table,
    /// and chart.
    Show(ViewArgs),
    /// List available countries, states, or counties.
    Regions(RegionsArgs),
    /// Print the per-state choropleth table for a metric.
    Map(MapArgs),
    /// Export the derived series to CSV or JSON.
    Export(ExportArgs),
    /// Launch the interactive TUI.
    ///
    /// Uses the same derivation pipeline as `covid show`, but renders results
    /// in a terminal UI using Ratatui.
    Tui(ViewArgs),
}

/// Fetch-range options shared by every subcommand.
#[derive(Debug, Parser, Clone)]
pub struct FetchArgs {
    /// Data source to fetch.
    #[arg(long, value_enum, default_value_t = DataSource::Csse)]
    pub source: DataSource,

    /// First day of the fetch range (inclusive).
    #[arg(long, default_value = "2020-01-22")]
    pub first: NaiveDate,

    /// Last day of the fetch range (inclusive; defaults to today, UTC).
    #[arg(long)]
    pub last: Option<NaiveDate>,
}

impl FetchArgs {
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        (self.first, self.last.unwrap_or_else(today_utc))
    }
}

/// Selection and rendering options shared by `show`, `export`, and `tui`.
#[derive(Debug, Parser, Clone)]
pub struct ViewArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Country filter ("ALL" disables).
    #[arg(long, default_value = "US")]
    pub country: String,

    /// State filter ("ALL" disables).
    #[arg(long, default_value = ALL)]
    pub state: String,

    /// County filter ("ALL" disables).
    #[arg(long, default_value = ALL)]
    pub county: String,

    /// Metric to chart.
    #[arg(long, value_enum, default_value_t = Metric::Confirmed)]
    pub metric: Metric,

    /// Days of trend extrapolation (0 disables).
    #[arg(long = "predict", default_value_t = 0)]
    pub predict: usize,

    /// Trend model used for extrapolation.
    #[arg(long, value_enum, default_value_t = TrendModel::RatioAverage)]
    pub model: TrendModel,

    /// Log-scale the value axis.
    #[arg(long)]
    pub log_scale: bool,

    /// Show day-over-day percent changes.
    #[arg(long)]
    pub deltas: bool,

    /// Second state to overlay for comparison.
    #[arg(long)]
    pub compare: Option<String>,

    /// Chart width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Chart height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for listing regions.
#[derive(Debug, Parser)]
pub struct RegionsArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    /// List this country's states instead of all countries.
    #[arg(long)]
    pub country: Option<String>,

    /// List this state's counties (requires --country).
    #[arg(long, requires = "country")]
    pub state: Option<String>,
}

/// Options for the choropleth table.
#[derive(Debug, Parser)]
pub struct MapArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Metric to rank states by.
    #[arg(long, value_enum, default_value_t = Metric::Confirmed)]
    pub metric: Metric,
}

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// Options for exporting a derived series.
#[derive(Debug, Parser)]
pub struct ExportArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    /// Output path.
    #[arg(long, value_name = "PATH")]
    pub out: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    pub format: ExportFormat,
}
