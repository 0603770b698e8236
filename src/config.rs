//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.etfmap.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::OutputFormat;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input path settings.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Locations of input data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory the downloader stores compositions under.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: String,

    /// Path to the ISO country mapping CSV.
    #[serde(default = "default_reference_file")]
    pub reference_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            reference_file: default_reference_file(),
        }
    }
}

fn default_downloads_dir() -> String {
    "downloads/compositions".to_string()
}

fn default_reference_file() -> String {
    "data/iso_country_mapping.csv".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Number of countries in the summary's top list.
    #[serde(default = "default_top")]
    pub top: usize,

    /// Omit zero-weight countries from CSV/Markdown tables.
    #[serde(default)]
    pub drop_zero: bool,

    /// Decimal places for weights in the Markdown rendering.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
            top: default_top(),
            drop_zero: false,
            precision: default_precision(),
        }
    }
}

fn default_output() -> String {
    "country_weights.json".to_string()
}

fn default_top() -> usize {
    10
}

fn default_precision() -> usize {
    4
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".etfmap.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings; optional
    /// arguments only override when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref downloads_dir) = args.downloads_dir {
            self.paths.downloads_dir = downloads_dir.display().to_string();
        }
        if let Some(ref reference) = args.reference {
            self.paths.reference_file = reference.display().to_string();
        }

        if let Some(ref output) = args.output {
            self.report.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(top) = args.top {
            self.report.top = top;
        }
        if args.drop_zero {
            self.report.drop_zero = true;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.paths.downloads_dir, "downloads/compositions");
        assert_eq!(config.paths.reference_file, "data/iso_country_mapping.csv");
        assert_eq!(config.report.output, "country_weights.json");
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.top, 10);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[paths]
downloads_dir = "data/downloads"

[report]
output = "weights.md"
format = "markdown"
top = 5
drop_zero = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.paths.downloads_dir, "data/downloads");
        // Unset keys fall back to defaults.
        assert_eq!(config.paths.reference_file, "data/iso_country_mapping.csv");
        assert_eq!(config.report.output, "weights.md");
        assert_eq!(config.report.format, OutputFormat::Markdown);
        assert_eq!(config.report.top, 5);
        assert!(config.report.drop_zero);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[paths]"));
        assert!(toml_str.contains("[report]"));
    }
}
