//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// etfmap - Map ETF holdings to per-country weight distributions
///
/// Loads a previously downloaded holdings file, keeps the equity rows,
/// resolves ISO 3166-1 country codes from the instrument identifiers,
/// and writes the aggregated per-country weights for a choropleth
/// consumer.
///
/// Examples:
///   etfmap --ticker WOOD
///   etfmap --ticker WOOD --date 2026-08-07 --format markdown -o weights.md
///   etfmap --file ./WOOD_holdings_2026-08-07.csv --format csv
///   etfmap --ticker WOOD --dry-run
///   etfmap --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Fund ticker whose holdings file should be mapped
    ///
    /// The holdings file is resolved under the downloads directory as
    /// <downloads-dir>/<date>/<TICKER>_holdings_<date>.csv.
    /// Not required when using --init-config or --file.
    #[arg(
        short,
        long,
        value_name = "TICKER",
        required_unless_present_any = ["init_config", "file"]
    )]
    pub ticker: Option<String>,

    /// As-of date of the holdings snapshot (YYYY-MM-DD)
    ///
    /// Defaults to today.
    #[arg(short, long, value_name = "DATE")]
    pub date: Option<NaiveDate>,

    /// Explicit holdings file, bypassing the ticker/date convention
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Directory the downloader stores compositions under
    #[arg(long, value_name = "DIR", env = "ETFMAP_DOWNLOADS_DIR")]
    pub downloads_dir: Option<PathBuf>,

    /// Path to the ISO country mapping CSV
    #[arg(long, value_name = "FILE", env = "ETFMAP_REFERENCE")]
    pub reference: Option<PathBuf>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (json, csv, markdown)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Number of countries in the summary's top list
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Omit zero-weight countries from CSV/Markdown tables
    ///
    /// The JSON report always covers the full country universe.
    #[arg(long)]
    pub drop_zero: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .etfmap.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load and resolve the holdings, show what would be
    /// aggregated, and exit without writing a report
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .etfmap.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON payload with metadata, summary, and all rows (default)
    #[default]
    Json,
    /// CSV table of country weights
    Csv,
    /// Markdown report
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.ticker.is_none() && self.file.is_none() {
            return Err("Either --ticker or --file must be provided".to_string());
        }

        if let Some(ref ticker) = self.ticker {
            if ticker.is_empty() || !ticker.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(format!("Invalid ticker: {:?}", ticker));
            }
        }

        if let Some(top) = self.top {
            if top == 0 {
                return Err("Top count must be at least 1".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate explicit holdings file if provided
        if let Some(ref file) = self.file {
            if !file.exists() {
                return Err(format!("Holdings file does not exist: {}", file.display()));
            }
            if !file.is_file() {
                return Err(format!("Holdings path is not a file: {}", file.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            ticker: Some("WOOD".to_string()),
            date: None,
            file: None,
            downloads_dir: None,
            reference: None,
            output: None,
            format: None,
            top: None,
            drop_zero: false,
            config: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_accepts_ticker() {
        let args = make_args();
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_requires_ticker_or_file() {
        let mut args = make_args();
        args.ticker = None;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_ticker() {
        let mut args = make_args();
        args.ticker = Some("WO OD".to_string());
        assert!(args.validate().is_err());

        args.ticker = Some(String::new());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_top() {
        let mut args = make_args();
        args.top = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.ticker = None;
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_output_format_serde_names() {
        let format: OutputFormat = serde_json::from_str("\"markdown\"").unwrap();
        assert_eq!(format, OutputFormat::Markdown);
        assert_eq!(OutputFormat::default(), OutputFormat::Json);
    }
}
