//! ISO 3166-1 country code reference table.
//!
//! Loads the static alpha-2 / alpha-3 / name mapping from a CSV file,
//! normalizes the codes, and caches the result for the lifetime of the
//! process. The table is immutable once loaded, so the cache never needs
//! invalidation.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// One row of the reference table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceEntry {
    /// Country name (e.g., "United States").
    pub name: String,
    /// ISO 3166-1 alpha-2 code (e.g., "US").
    pub alpha2: String,
    /// ISO 3166-1 alpha-3 code (e.g., "USA").
    pub alpha3: String,
}

/// CSV record as published in the reference file. The code columns may
/// contain stray embedded whitespace.
#[derive(Debug, Deserialize)]
struct ReferenceRecord {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Alpha-2 code")]
    alpha2: String,
    #[serde(rename = "Alpha-3 code")]
    alpha3: String,
}

/// The loaded, normalized country code table with lookup indices.
#[derive(Debug)]
pub struct ReferenceTable {
    entries: Vec<ReferenceEntry>,
    by_alpha2: HashMap<String, usize>,
    by_alpha3: HashMap<String, usize>,
}

static TABLE: OnceLock<ReferenceTable> = OnceLock::new();

impl ReferenceTable {
    /// Load the reference table from a CSV file.
    ///
    /// A missing or unparseable file is fatal: nothing downstream can
    /// resolve country codes without the table.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading ISO country mapping from {}", path.display());

        if !path.exists() {
            bail!("Reference table not found: {}", path.display());
        }

        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open reference table: {}", path.display()))?;

        let mut entries = Vec::new();
        let mut by_alpha2: HashMap<String, usize> = HashMap::new();
        let mut by_alpha3: HashMap<String, usize> = HashMap::new();

        for result in reader.deserialize() {
            let record: ReferenceRecord = result
                .with_context(|| format!("Malformed reference row in {}", path.display()))?;

            let entry = ReferenceEntry {
                name: record.name.trim().to_string(),
                alpha2: normalize_code(&record.alpha2),
                alpha3: normalize_code(&record.alpha3),
            };

            let idx = entries.len();

            // Duplicate codes keep the first entry.
            match by_alpha2.entry(entry.alpha2.clone()) {
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(idx);
                }
                std::collections::hash_map::Entry::Occupied(_) => {
                    warn!("Duplicate alpha-2 code {:?} in reference table, keeping first", entry.alpha2);
                }
            }
            match by_alpha3.entry(entry.alpha3.clone()) {
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(idx);
                }
                std::collections::hash_map::Entry::Occupied(_) => {
                    warn!("Duplicate alpha-3 code {:?} in reference table, keeping first", entry.alpha3);
                }
            }

            entries.push(entry);
        }

        if entries.is_empty() {
            bail!("Reference table is empty: {}", path.display());
        }

        debug!("Loaded {} reference entries", entries.len());

        Ok(Self {
            entries,
            by_alpha2,
            by_alpha3,
        })
    }

    /// Process-wide cached table, loaded on first call.
    pub fn global(path: &Path) -> Result<&'static ReferenceTable> {
        if let Some(table) = TABLE.get() {
            return Ok(table);
        }
        let table = Self::load(path)?;
        Ok(TABLE.get_or_init(|| table))
    }

    /// Resolve an alpha-2 code to its alpha-3 code.
    ///
    /// Logs a warning and returns `None` when no mapping exists; an
    /// unresolvable code is expected data (e.g., a non-country prefix)
    /// and must not abort the pipeline.
    pub fn alpha3_from_alpha2(&self, alpha2: &str) -> Option<&str> {
        match self.by_alpha2.get(alpha2) {
            Some(&idx) => Some(self.entries[idx].alpha3.as_str()),
            None => {
                warn!("No ISO mapping found for alpha-2 code {:?}", alpha2);
                None
            }
        }
    }

    /// Resolve an alpha-3 code to its country name.
    pub fn name_from_alpha3(&self, alpha3: &str) -> Option<&str> {
        match self.by_alpha3.get(alpha3) {
            Some(&idx) => Some(self.entries[idx].name.as_str()),
            None => {
                warn!("No ISO mapping found for alpha-3 code {:?}", alpha3);
                None
            }
        }
    }

    /// All entries in table order.
    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    /// Number of countries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table holds no entries.
    #[allow(dead_code)] // Completes the len() pair
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Strip all whitespace from a code; the source data is inconsistently
/// padded.
fn normalize_code(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_reference(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write fixture");
        file
    }

    #[test]
    fn test_load_and_lookup() {
        let file = write_reference(
            "Name,Alpha-2 code,Alpha-3 code\n\
             United States,US,USA\n\
             Japan,JP,JPN\n\
             Germany,DE,DEU\n",
        );

        let table = ReferenceTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.alpha3_from_alpha2("US"), Some("USA"));
        assert_eq!(table.name_from_alpha3("JPN"), Some("Japan"));
    }

    #[test]
    fn test_codes_are_whitespace_normalized() {
        let file = write_reference(
            "Name,Alpha-2 code,Alpha-3 code\n\
             United States, U S , USA \n",
        );

        let table = ReferenceTable::load(file.path()).unwrap();
        assert_eq!(table.alpha3_from_alpha2("US"), Some("USA"));
    }

    #[test]
    fn test_missing_lookup_returns_none() {
        let file = write_reference(
            "Name,Alpha-2 code,Alpha-3 code\n\
             Japan,JP,JPN\n",
        );

        let table = ReferenceTable::load(file.path()).unwrap();
        assert_eq!(table.alpha3_from_alpha2("XX"), None);
        assert_eq!(table.name_from_alpha3("XXX"), None);
    }

    #[test]
    fn test_duplicate_codes_keep_first_entry() {
        let file = write_reference(
            "Name,Alpha-2 code,Alpha-3 code\n\
             First,US,USA\n\
             Second,US,USA\n",
        );

        let table = ReferenceTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.name_from_alpha3("USA"), Some("First"));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = ReferenceTable::load(Path::new("does/not/exist.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_table_is_fatal() {
        let file = write_reference("Name,Alpha-2 code,Alpha-3 code\n");
        assert!(ReferenceTable::load(file.path()).is_err());
    }

    #[test]
    fn test_entries_preserve_order() {
        let file = write_reference(
            "Name,Alpha-2 code,Alpha-3 code\n\
             Japan,JP,JPN\n\
             Germany,DE,DEU\n",
        );

        let table = ReferenceTable::load(file.path()).unwrap();
        let codes: Vec<&str> = table.entries().iter().map(|e| e.alpha3.as_str()).collect();
        assert_eq!(codes, vec!["JPN", "DEU"]);
    }
}
