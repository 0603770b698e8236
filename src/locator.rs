//! Holdings file location convention.
//!
//! The downloader stores compositions as
//! `<downloads_dir>/<date>/<TICKER>_holdings_<date>.csv`; this module
//! resolves a ticker and as-of date to that path. It only builds the
//! path; existence is checked by the loader.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve the holdings file path for a fund ticker and as-of date.
pub fn holdings_path(downloads_dir: &Path, ticker: &str, as_of: NaiveDate) -> PathBuf {
    let date = as_of.format("%Y-%m-%d").to_string();
    let file_name = format!("{}_holdings_{}.csv", ticker.to_uppercase(), date);
    let path = downloads_dir.join(date).join(file_name);

    debug!("Resolved holdings path for {}: {}", ticker, path.display());

    path
}
