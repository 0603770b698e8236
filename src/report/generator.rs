//! Weight report rendering.
//!
//! Renders a `WeightReport` for the downstream visualization consumer.
//! JSON carries the complete report verbatim; the CSV and Markdown
//! renderings are tabular views that can optionally omit zero-weight
//! countries.

use crate::models::{CountryWeight, WeightReport};
use anyhow::{Context, Result};

/// Presentation settings for the tabular renderings.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Omit zero-weight countries from CSV/Markdown tables. The JSON
    /// report always stays complete.
    pub drop_zero: bool,
    /// Decimal places for weights in the Markdown rendering.
    pub precision: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            drop_zero: false,
            precision: 4,
        }
    }
}

impl From<&crate::config::ReportConfig> for RenderOptions {
    fn from(config: &crate::config::ReportConfig) -> Self {
        Self {
            drop_zero: config.drop_zero,
            precision: config.precision,
        }
    }
}

/// Generate the complete report as pretty-printed JSON.
pub fn generate_json_report(report: &WeightReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report as JSON")
}

/// Generate a CSV rendering of the country weight rows.
///
/// Rows stay in reference-table order. The log weight field is empty for
/// zero-weight countries.
pub fn generate_csv_report(report: &WeightReport, options: &RenderOptions) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(["alpha3", "country", "weight", "log_weight"])
        .context("Failed to write CSV header")?;

    for row in visible_rows(&report.rows, options) {
        let log_weight = row
            .log_weight
            .map(|v| v.to_string())
            .unwrap_or_default();
        writer
            .write_record([
                row.alpha3.as_str(),
                row.name.as_str(),
                &row.weight.to_string(),
                &log_weight,
            ])
            .context("Failed to write CSV row")?;
    }

    let bytes = writer
        .into_inner()
        .context("Failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}

/// Generate a Markdown rendering of the report.
pub fn generate_markdown_report(report: &WeightReport, options: &RenderOptions) -> String {
    let mut output = String::new();

    output.push_str("# Country Weight Report\n\n");
    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_summary_section(report, options));
    output.push_str(&generate_weights_section(report, options));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(report: &WeightReport) -> String {
    let metadata = &report.metadata;
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    if let Some(ref ticker) = metadata.ticker {
        section.push_str(&format!("- **Fund:** {}\n", ticker));
    }
    section.push_str(&format!("- **As of:** {}\n", metadata.as_of));
    section.push_str(&format!("- **Holdings File:** `{}`\n", metadata.holdings_file));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Rows:** {} read, {} kept, {} dropped\n",
        metadata.rows_read, metadata.rows_kept, metadata.rows_dropped
    ));
    section.push('\n');

    section
}

/// Generate the summary section.
fn generate_summary_section(report: &WeightReport, options: &RenderOptions) -> String {
    let summary = &report.summary;
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "- **Total Weight:** {:.prec$}%\n",
        summary.total_weight,
        prec = options.precision
    ));
    section.push_str(&format!(
        "- **Countries Represented:** {} of {}\n",
        summary.represented, summary.universe
    ));
    section.push('\n');

    if !summary.top.is_empty() {
        section.push_str("### Top Countries\n\n");
        section.push_str("| Rank | Alpha-3 | Weight (%) |\n");
        section.push_str("|:---:|:---|---:|\n");

        for (rank, entry) in summary.top.iter().enumerate() {
            section.push_str(&format!(
                "| {} | {} | {:.prec$} |\n",
                rank + 1,
                entry.alpha3,
                entry.weight,
                prec = options.precision
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the per-country weight table, sorted by weight descending.
fn generate_weights_section(report: &WeightReport, options: &RenderOptions) -> String {
    let mut section = String::new();

    section.push_str("## Country Weights\n\n");

    let mut rows: Vec<&CountryWeight> = visible_rows(&report.rows, options).collect();
    rows.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.alpha3.cmp(&b.alpha3))
    });

    if rows.is_empty() {
        section.push_str("No countries to display.\n\n");
        return section;
    }

    section.push_str("| Alpha-3 | Country | Weight (%) | Log Weight |\n");
    section.push_str("|:---|:---|---:|---:|\n");

    for row in rows {
        let log_weight = row
            .log_weight
            .map(|v| format!("{:.prec$}", v, prec = options.precision))
            .unwrap_or_else(|| "n/a".to_string());
        section.push_str(&format!(
            "| {} | {} | {:.prec$} | {} |\n",
            row.alpha3,
            row.name,
            row.weight,
            log_weight,
            prec = options.precision
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by etfmap*\n".to_string()
}

/// Rows to include in the tabular renderings.
fn visible_rows<'a>(
    rows: &'a [CountryWeight],
    options: &'a RenderOptions,
) -> impl Iterator<Item = &'a CountryWeight> {
    rows.iter()
        .filter(move |row| !options.drop_zero || row.weight != 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportMetadata, TopCountry, WeightSummary};
    use chrono::{NaiveDate, Utc};

    fn create_test_report() -> WeightReport {
        let rows = vec![
            CountryWeight {
                alpha3: "USA".to_string(),
                name: "United States".to_string(),
                weight: 40.0,
                log_weight: Some(40.0_f64.ln()),
            },
            CountryWeight {
                alpha3: "JPN".to_string(),
                name: "Japan".to_string(),
                weight: 10.0,
                log_weight: Some(10.0_f64.ln()),
            },
            CountryWeight {
                alpha3: "DEU".to_string(),
                name: "Germany".to_string(),
                weight: 0.0,
                log_weight: None,
            },
        ];

        WeightReport {
            metadata: ReportMetadata {
                ticker: Some("WOOD".to_string()),
                as_of: NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
                holdings_file: "downloads/compositions/2026-08-07/WOOD_holdings_2026-08-07.csv"
                    .to_string(),
                generated_at: Utc::now(),
                rows_read: 4,
                rows_kept: 3,
                rows_dropped: 1,
            },
            summary: WeightSummary {
                total_weight: 50.0,
                represented: 2,
                universe: 3,
                top: vec![
                    TopCountry {
                        alpha3: "USA".to_string(),
                        weight: 40.0,
                    },
                    TopCountry {
                        alpha3: "JPN".to_string(),
                        weight: 10.0,
                    },
                ],
            },
            rows,
        }
    }

    #[test]
    fn test_json_report_is_complete() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"USA\""));
        assert!(json.contains("\"DEU\""));
        // Absent log weights serialize as null, not a number.
        assert!(json.contains("\"log_weight\": null"));
    }

    #[test]
    fn test_csv_report_columns() {
        let report = create_test_report();
        let csv = generate_csv_report(&report, &RenderOptions::default()).unwrap();

        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("alpha3,country,weight,log_weight"));
        assert!(csv.contains("USA,United States,40,"));
        // Zero-weight row present with an empty log field.
        assert!(csv.contains("DEU,Germany,0,\n") || csv.ends_with("DEU,Germany,0,"));
    }

    #[test]
    fn test_csv_drop_zero() {
        let report = create_test_report();
        let options = RenderOptions {
            drop_zero: true,
            ..Default::default()
        };
        let csv = generate_csv_report(&report, &options).unwrap();

        assert!(csv.contains("USA"));
        assert!(!csv.contains("DEU"));
    }

    #[test]
    fn test_markdown_report_sections() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &RenderOptions::default());

        assert!(markdown.contains("# Country Weight Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Country Weights"));
        assert!(markdown.contains("WOOD"));
        assert!(markdown.contains("| USA | United States |"));
        // Zero-weight row renders a placeholder log weight.
        assert!(markdown.contains("| DEU | Germany | 0.0000 | n/a |"));
    }

    #[test]
    fn test_markdown_drop_zero() {
        let report = create_test_report();
        let options = RenderOptions {
            drop_zero: true,
            ..Default::default()
        };
        let markdown = generate_markdown_report(&report, &options);

        assert!(markdown.contains("USA"));
        assert!(!markdown.contains("DEU"));
    }

    #[test]
    fn test_markdown_sorted_by_weight() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &RenderOptions::default());

        let usa = markdown.find("| USA |").unwrap();
        let jpn = markdown.find("| JPN |").unwrap();
        let deu = markdown.find("| DEU |").unwrap();
        assert!(usa < jpn && jpn < deu);
    }
}
