//! Holdings file loading and filtering.
//!
//! Reads a fund's published holdings CSV, keeps the equity rows, derives
//! country codes from the instrument identifiers, and accounts for every
//! row it drops so the caller can surface data-quality information.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Holding;
use crate::reference::ReferenceTable;

/// Asset class string that marks rows participating in aggregation.
const EQUITY_CLASS: &str = "Equity";

/// Why a holdings row was excluded from the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    /// Asset class is something other than `"Equity"`.
    #[error("asset class {0:?} is not {EQUITY_CLASS:?}")]
    NotEquity(String),
    /// The weight column did not parse as a finite number.
    #[error("weight {0:?} is not a number")]
    BadWeight(String),
    /// The identifier is too short to carry a two-letter country prefix.
    #[error("identifier {0:?} has no country prefix")]
    ShortIdentifier(String),
    /// The identifier prefix matches no alpha-2 code in the reference table.
    #[error("no alpha-3 mapping for prefix {0:?}")]
    UnmappedPrefix(String),
}

/// A dropped holdings row together with the reason it was dropped.
#[derive(Debug, Clone)]
pub struct DroppedRow {
    /// 1-indexed line number in the holdings file (header is line 1).
    pub line: u64,
    /// Instrument identifier as published, possibly empty.
    pub identifier: String,
    /// Why the row was excluded.
    pub reason: DropReason,
}

/// Result of loading a holdings file.
#[derive(Debug)]
pub struct LoadOutcome {
    /// Rows that survived filtering and code resolution.
    pub holdings: Vec<Holding>,
    /// Rows that were excluded, with reasons.
    pub dropped: Vec<DroppedRow>,
    /// Total number of data rows read.
    pub rows_read: usize,
}

/// CSV record as published in the holdings file; extra columns are ignored.
#[derive(Debug, Deserialize)]
struct HoldingRecord {
    #[serde(rename = "ISIN")]
    isin: String,
    #[serde(rename = "Asset Class")]
    asset_class: String,
    #[serde(rename = "Weight (%)")]
    weight: String,
}

/// Load a holdings file and resolve country codes for its equity rows.
///
/// A missing file is fatal: the composition must be downloaded before it
/// can be mapped. Individual bad rows are a data-quality matter; they are
/// logged, counted, and excluded without failing the load.
pub fn load_holdings(path: &Path, reference: &ReferenceTable) -> Result<LoadOutcome> {
    if !path.exists() {
        bail!(
            "Holdings file not found: {}. Download the composition first.",
            path.display()
        );
    }

    debug!("Loading holdings from {}", path.display());

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open holdings file: {}", path.display()))?;

    let mut holdings = Vec::new();
    let mut dropped = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.deserialize().enumerate() {
        // Header occupies line 1.
        let line = (idx + 2) as u64;
        rows_read += 1;

        let record: HoldingRecord = result
            .with_context(|| format!("Malformed row at {}:{}", path.display(), line))?;

        let identifier = record.isin.trim().to_string();

        if record.asset_class != EQUITY_CLASS {
            // Non-equity rows are expected; not worth a warning.
            debug!("Skipping line {}: {:?} is not equity", line, identifier);
            dropped.push(DroppedRow {
                line,
                identifier,
                reason: DropReason::NotEquity(record.asset_class),
            });
            continue;
        }

        let weight = match parse_weight(&record.weight) {
            Some(w) => w,
            None => {
                warn!("Dropping line {}: weight {:?} is not a number", line, record.weight);
                dropped.push(DroppedRow {
                    line,
                    identifier,
                    reason: DropReason::BadWeight(record.weight),
                });
                continue;
            }
        };

        let prefix: String = identifier.chars().take(2).collect();
        if prefix.chars().count() < 2 {
            warn!("Dropping line {}: identifier {:?} has no country prefix", line, identifier);
            dropped.push(DroppedRow {
                line,
                identifier,
                reason: DropReason::ShortIdentifier(prefix),
            });
            continue;
        }
        let alpha2 = prefix.to_uppercase();

        let alpha3 = match reference.alpha3_from_alpha2(&alpha2) {
            Some(code) => code.to_string(),
            None => {
                dropped.push(DroppedRow {
                    line,
                    identifier,
                    reason: DropReason::UnmappedPrefix(alpha2),
                });
                continue;
            }
        };

        holdings.push(Holding {
            identifier,
            asset_class: record.asset_class,
            weight,
            alpha2,
            alpha3,
        });
    }

    debug!(
        "Loaded {} holdings ({} rows read, {} dropped)",
        holdings.len(),
        rows_read,
        dropped.len()
    );

    Ok(LoadOutcome {
        holdings,
        dropped,
        rows_read,
    })
}

/// Parse a published weight value. Tolerates surrounding whitespace and
/// thousands separators; rejects non-finite results.
fn parse_weight(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    cleaned.parse::<f64>().ok().filter(|w| w.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_holdings(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write fixture");
        file
    }

    fn reference() -> ReferenceTable {
        let file = write_holdings(
            "Name,Alpha-2 code,Alpha-3 code\n\
             United States,US,USA\n\
             Japan,JP,JPN\n\
             Germany,DE,DEU\n",
        );
        ReferenceTable::load(file.path()).unwrap()
    }

    #[test]
    fn test_load_keeps_resolvable_equity_rows() {
        let file = write_holdings(
            "ISIN,Asset Class,Weight (%)\n\
             US0123456789,Equity,40.0\n\
             JP0123456789,Equity,10.0\n",
        );

        let outcome = load_holdings(file.path(), &reference()).unwrap();
        assert_eq!(outcome.rows_read, 2);
        assert_eq!(outcome.holdings.len(), 2);
        assert!(outcome.dropped.is_empty());
        assert_eq!(outcome.holdings[0].alpha3, "USA");
        assert_eq!(outcome.holdings[1].alpha3, "JPN");
    }

    #[test]
    fn test_non_equity_rows_are_dropped() {
        let file = write_holdings(
            "ISIN,Asset Class,Weight (%)\n\
             US0123456789,Equity,40.0\n\
             US9876543210,Bond,50.0\n",
        );

        let outcome = load_holdings(file.path(), &reference()).unwrap();
        assert_eq!(outcome.holdings.len(), 1);
        assert_eq!(outcome.dropped.len(), 1);
        assert_eq!(
            outcome.dropped[0].reason,
            DropReason::NotEquity("Bond".to_string())
        );
    }

    #[test]
    fn test_unmapped_prefix_is_dropped_without_error() {
        let file = write_holdings(
            "ISIN,Asset Class,Weight (%)\n\
             XX0123456789,Equity,5.0\n\
             US0123456789,Equity,40.0\n",
        );

        let outcome = load_holdings(file.path(), &reference()).unwrap();
        assert_eq!(outcome.holdings.len(), 1);
        assert_eq!(
            outcome.dropped[0].reason,
            DropReason::UnmappedPrefix("XX".to_string())
        );
    }

    #[test]
    fn test_malformed_weight_is_dropped() {
        let file = write_holdings(
            "ISIN,Asset Class,Weight (%)\n\
             US0123456789,Equity,n/a\n\
             JP0123456789,Equity,10.0\n",
        );

        let outcome = load_holdings(file.path(), &reference()).unwrap();
        assert_eq!(outcome.holdings.len(), 1);
        assert_eq!(
            outcome.dropped[0].reason,
            DropReason::BadWeight("n/a".to_string())
        );
    }

    #[test]
    fn test_weight_with_thousands_separator() {
        let file = write_holdings(
            "ISIN,Asset Class,Weight (%)\n\
             US0123456789,Equity,\"1,234.5\"\n",
        );

        let outcome = load_holdings(file.path(), &reference()).unwrap();
        assert_eq!(outcome.holdings.len(), 1);
        assert!((outcome.holdings[0].weight - 1234.5).abs() < 1e-9);
    }

    #[test]
    fn test_short_identifier_is_dropped() {
        let file = write_holdings(
            "ISIN,Asset Class,Weight (%)\n\
             U,Equity,40.0\n",
        );

        let outcome = load_holdings(file.path(), &reference()).unwrap();
        assert!(outcome.holdings.is_empty());
        assert_eq!(
            outcome.dropped[0].reason,
            DropReason::ShortIdentifier("U".to_string())
        );
    }

    #[test]
    fn test_lowercase_prefix_is_uppercased() {
        let file = write_holdings(
            "ISIN,Asset Class,Weight (%)\n\
             us0123456789,Equity,40.0\n",
        );

        let outcome = load_holdings(file.path(), &reference()).unwrap();
        assert_eq!(outcome.holdings[0].alpha2, "US");
        assert_eq!(outcome.holdings[0].alpha3, "USA");
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = load_holdings(Path::new("does/not/exist.csv"), &reference());
        assert!(result.is_err());
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Download the composition first"));
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let file = write_holdings(
            "Ticker,ISIN,Name,Asset Class,Weight (%),Price\n\
             AAPL,US0123456789,Apple,Equity,40.0,190.1\n",
        );

        let outcome = load_holdings(file.path(), &reference()).unwrap();
        assert_eq!(outcome.holdings.len(), 1);
    }
}
