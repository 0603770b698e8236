//! Data models for the country weight mapper.
//!
//! This module contains the core data structures used throughout the
//! application for representing holdings, aggregated country weights,
//! and the final report handed to the visualization consumer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single equity holding that survived loading.
///
/// Only rows with asset class `"Equity"`, a parseable weight, and a
/// resolvable country prefix are turned into `Holding` values; everything
/// else is dropped during loading (see `holdings::load_holdings`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    /// Instrument identifier (ISIN-style; first two characters encode
    /// the ISO 3166-1 alpha-2 country code).
    pub identifier: String,
    /// Asset class as published in the holdings file.
    pub asset_class: String,
    /// Portfolio weight in percent.
    pub weight: f64,
    /// Alpha-2 country code derived from the identifier prefix.
    pub alpha2: String,
    /// Alpha-3 country code resolved via the reference table.
    pub alpha3: String,
}

/// Aggregated weight for a single country.
///
/// The aggregator emits one of these per reference-table entry, so a
/// result set always covers the full country universe regardless of
/// which countries the holdings actually touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryWeight {
    /// ISO 3166-1 alpha-3 code.
    pub alpha3: String,
    /// Human-readable country name.
    pub name: String,
    /// Summed portfolio weight in percent; zero if no holding maps here.
    pub weight: f64,
    /// Natural log of the weight. `None` when the weight is zero, so the
    /// consumer has to handle the absent case instead of receiving a
    /// non-finite number.
    pub log_weight: Option<f64>,
}

/// Metadata about a mapping run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Fund ticker, if the holdings file was located by ticker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    /// As-of date of the holdings snapshot.
    pub as_of: NaiveDate,
    /// Path of the holdings file that was loaded.
    pub holdings_file: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of data rows read from the holdings file.
    pub rows_read: usize,
    /// Number of rows that survived filtering and code resolution.
    pub rows_kept: usize,
    /// Number of rows dropped (non-equity, malformed, or unmappable).
    pub rows_dropped: usize,
}

/// A (country, weight) pair used in the summary's top list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCountry {
    /// ISO 3166-1 alpha-3 code.
    pub alpha3: String,
    /// Summed portfolio weight in percent.
    pub weight: f64,
}

/// Summary statistics over the aggregated country weights.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeightSummary {
    /// Sum of all country weights in percent.
    pub total_weight: f64,
    /// Number of countries with a non-zero weight.
    pub represented: usize,
    /// Total number of countries in the reference universe.
    pub universe: usize,
    /// The heaviest countries, sorted by weight descending.
    pub top: Vec<TopCountry>,
}

impl WeightSummary {
    /// Creates a summary from aggregated country weights.
    pub fn from_rows(rows: &[CountryWeight], top_n: usize) -> Self {
        let total_weight = rows.iter().map(|r| r.weight).sum();
        let represented = rows.iter().filter(|r| r.weight != 0.0).count();

        let mut top: Vec<TopCountry> = rows
            .iter()
            .filter(|r| r.weight != 0.0)
            .map(|r| TopCountry {
                alpha3: r.alpha3.clone(),
                weight: r.weight,
            })
            .collect();
        top.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        top.truncate(top_n);

        Self {
            total_weight,
            represented,
            universe: rows.len(),
            top,
        }
    }
}

/// The complete country weight report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightReport {
    /// Metadata about the run.
    pub metadata: ReportMetadata,
    /// Summary statistics.
    pub summary: WeightSummary,
    /// One row per country in the reference universe.
    pub rows: Vec<CountryWeight>,
}
