//! Country weight aggregation.
//!
//! This module turns a list of resolved equity holdings into the complete
//! per-country weight series consumed by the visualization layer.

use std::collections::HashMap;

use crate::models::{CountryWeight, Holding};
use crate::reference::ReferenceTable;

/// Aggregate holdings into one weight row per reference-table country.
///
/// Weights are summed per alpha-3 code, then projected onto the full
/// country universe in reference-table order: countries absent from the
/// holdings get a zero weight. This keeps the output cardinality fixed
/// across funds, so legends and color scales stay stable.
///
/// The log weight is `None` for zero-weight rows; see `CountryWeight`.
pub fn aggregate_country_weights(
    holdings: &[Holding],
    reference: &ReferenceTable,
) -> Vec<CountryWeight> {
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for holding in holdings {
        *sums.entry(holding.alpha3.as_str()).or_insert(0.0) += holding.weight;
    }

    reference
        .entries()
        .iter()
        .map(|entry| {
            let weight = sums.get(entry.alpha3.as_str()).copied().unwrap_or(0.0);
            let log_weight = (weight > 0.0).then(|| weight.ln());
            CountryWeight {
                alpha3: entry.alpha3.clone(),
                name: entry.name.clone(),
                weight,
                log_weight,
            }
        })
        .collect()
}

/// Sum of all row weights.
pub fn total_weight(rows: &[CountryWeight]) -> f64 {
    rows.iter().map(|r| r.weight).sum()
}

/// Number of countries with a non-zero weight.
pub fn represented(rows: &[CountryWeight]) -> usize {
    rows.iter().filter(|r| r.weight != 0.0).count()
}

/// The N heaviest countries, sorted by weight descending.
pub fn top_countries(rows: &[CountryWeight], n: usize) -> Vec<(String, f64)> {
    let mut weighted: Vec<(String, f64)> = rows
        .iter()
        .filter(|r| r.weight != 0.0)
        .map(|r| (r.alpha3.clone(), r.weight))
        .collect();

    weighted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    weighted.truncate(n);

    weighted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn reference() -> ReferenceTable {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(
            b"Name,Alpha-2 code,Alpha-3 code\n\
              United States,US,USA\n\
              Japan,JP,JPN\n\
              Germany,DE,DEU\n",
        )
        .expect("write fixture");
        ReferenceTable::load(file.path()).unwrap()
    }

    fn holding(identifier: &str, alpha2: &str, alpha3: &str, weight: f64) -> Holding {
        Holding {
            identifier: identifier.to_string(),
            asset_class: "Equity".to_string(),
            weight,
            alpha2: alpha2.to_string(),
            alpha3: alpha3.to_string(),
        }
    }

    #[test]
    fn test_worked_example() {
        // US 40% + JP 10% equity, with DE in the universe but unheld.
        let reference = reference();
        let holdings = vec![
            holding("US0123", "US", "USA", 40.0),
            holding("JP0456", "JP", "JPN", 10.0),
        ];

        let rows = aggregate_country_weights(&holdings, &reference);
        assert_eq!(rows.len(), 3);

        let by_code: std::collections::HashMap<&str, &CountryWeight> =
            rows.iter().map(|r| (r.alpha3.as_str(), r)).collect();
        assert!((by_code["USA"].weight - 40.0).abs() < 1e-9);
        assert!((by_code["JPN"].weight - 10.0).abs() < 1e-9);
        assert_eq!(by_code["DEU"].weight, 0.0);
    }

    #[test]
    fn test_output_covers_full_universe() {
        let reference = reference();

        let rows = aggregate_country_weights(&[], &reference);
        assert_eq!(rows.len(), reference.len());
        assert!(rows.iter().all(|r| r.weight == 0.0));
    }

    #[test]
    fn test_weights_sum_per_country() {
        let reference = reference();
        let holdings = vec![
            holding("US0123", "US", "USA", 25.0),
            holding("US0456", "US", "USA", 15.0),
        ];

        let rows = aggregate_country_weights(&holdings, &reference);
        let usa = rows.iter().find(|r| r.alpha3 == "USA").unwrap();
        assert!((usa.weight - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_weight_conservation() {
        let reference = reference();
        let holdings = vec![
            holding("US0123", "US", "USA", 40.0),
            holding("JP0456", "JP", "JPN", 10.0),
            holding("DE0789", "DE", "DEU", 12.5),
        ];

        let input_total: f64 = holdings.iter().map(|h| h.weight).sum();
        let rows = aggregate_country_weights(&holdings, &reference);
        assert!((total_weight(&rows) - input_total).abs() < 1e-9);
    }

    #[test]
    fn test_idempotence() {
        let reference = reference();
        let holdings = vec![
            holding("US0123", "US", "USA", 40.0),
            holding("JP0456", "JP", "JPN", 10.0),
        ];

        let first = aggregate_country_weights(&holdings, &reference);
        let second = aggregate_country_weights(&holdings, &reference);
        assert_eq!(first, second);
    }

    #[test]
    fn test_log_weight_absent_for_zero_rows() {
        let reference = reference();
        let holdings = vec![holding("US0123", "US", "USA", 40.0)];

        let rows = aggregate_country_weights(&holdings, &reference);
        let usa = rows.iter().find(|r| r.alpha3 == "USA").unwrap();
        let deu = rows.iter().find(|r| r.alpha3 == "DEU").unwrap();

        assert!((usa.log_weight.unwrap() - 40.0_f64.ln()).abs() < 1e-12);
        assert_eq!(deu.log_weight, None);
    }

    #[test]
    fn test_country_names_attached() {
        let reference = reference();
        let rows = aggregate_country_weights(&[], &reference);
        let usa = rows.iter().find(|r| r.alpha3 == "USA").unwrap();
        assert_eq!(usa.name, "United States");
    }

    #[test]
    fn test_top_countries_sorted_descending() {
        let reference = reference();
        let holdings = vec![
            holding("JP0456", "JP", "JPN", 10.0),
            holding("US0123", "US", "USA", 40.0),
            holding("DE0789", "DE", "DEU", 20.0),
        ];

        let rows = aggregate_country_weights(&holdings, &reference);
        let top = top_countries(&rows, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, "USA");
        assert_eq!(top[1].0, "DEU");
    }

    #[test]
    fn test_represented_ignores_zero_rows() {
        let reference = reference();
        let holdings = vec![holding("US0123", "US", "USA", 40.0)];

        let rows = aggregate_country_weights(&holdings, &reference);
        assert_eq!(represented(&rows), 1);
    }
}
