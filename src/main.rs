//! etfmap - ETF Country Weight Mapper
//!
//! A CLI tool that loads a previously downloaded ETF holdings file,
//! keeps the equity rows, resolves ISO 3166-1 country codes from the
//! instrument identifiers, and writes the aggregated per-country weight
//! distribution for a choropleth map consumer.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing input file, bad config, write failure)

mod analysis;
mod cli;
mod config;
mod holdings;
mod locator;
mod models;
mod reference;
mod report;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use cli::{Args, OutputFormat};
use config::Config;
use models::{ReportMetadata, WeightReport, WeightSummary};
use reference::ReferenceTable;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        if let Err(e) = handle_init_config() {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    // Initialize logging
    init_logging(&args);

    info!("etfmap v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the mapping pipeline
    if let Err(e) = run(args) {
        error!("Mapping failed: {}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Handle --init-config: generate a default .etfmap.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(".etfmap.toml");

    if path.exists() {
        eprintln!("⚠️  .etfmap.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .etfmap.toml")?;

    println!("✅ Created .etfmap.toml with default settings.");
    println!("   Edit it to customize paths, output format, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete mapping workflow.
fn run(args: Args) -> Result<()> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Step 1: Locate the holdings file
    let as_of = args.date.unwrap_or_else(|| Local::now().date_naive());
    let holdings_file = match args.file {
        Some(ref file) => file.clone(),
        None => {
            let ticker = args.ticker.as_deref().unwrap_or_default();
            locator::holdings_path(Path::new(&config.paths.downloads_dir), ticker, as_of)
        }
    };

    println!("📥 Loading holdings: {}", holdings_file.display());

    // Step 2: Load the reference table (cached for the process lifetime)
    let reference = ReferenceTable::global(Path::new(&config.paths.reference_file))?;
    info!("Reference universe: {} countries", reference.len());

    // Step 3: Load and filter the holdings
    let outcome = holdings::load_holdings(&holdings_file, reference)?;
    info!(
        "Kept {} equity holdings out of {} rows",
        outcome.holdings.len(),
        outcome.rows_read
    );

    // Handle --dry-run: show the load breakdown and exit
    if args.dry_run {
        return handle_dry_run(&outcome);
    }

    // Step 4: Aggregate weights per country
    println!("🌍 Aggregating weights across {} countries...", reference.len());
    let rows = analysis::aggregate_country_weights(&outcome.holdings, reference);
    let summary = WeightSummary::from_rows(&rows, config.report.top);

    // Step 5: Build the report
    let metadata = ReportMetadata {
        ticker: args.ticker.as_ref().map(|t| t.to_uppercase()),
        as_of,
        holdings_file: holdings_file.display().to_string(),
        generated_at: Utc::now(),
        rows_read: outcome.rows_read,
        rows_kept: outcome.holdings.len(),
        rows_dropped: outcome.dropped.len(),
    };

    let report = WeightReport {
        metadata,
        summary: summary.clone(),
        rows,
    };

    // Step 6: Render and save the report
    let format_name = match config.report.format {
        OutputFormat::Json => "JSON",
        OutputFormat::Csv => "CSV",
        OutputFormat::Markdown => "Markdown",
    };
    println!("📝 Writing {} report...", format_name);

    let render_options = report::RenderOptions::from(&config.report);
    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Csv => report::generate_csv_report(&report, &render_options)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &render_options),
    };

    let output_path = PathBuf::from(&config.report.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    println!("\n📊 Weight Summary:");
    println!("   Total weight: {:.2}%", summary.total_weight);
    println!(
        "   Countries represented: {} of {}",
        summary.represented, summary.universe
    );
    if let Some(heaviest) = summary.top.first() {
        println!(
            "   Heaviest country: {} ({:.2}%)",
            heaviest.alpha3, heaviest.weight
        );
    }
    if !outcome.dropped.is_empty() {
        println!(
            "   Dropped rows: {} (run with --dry-run for details)",
            outcome.dropped.len()
        );
    }
    println!(
        "\n✅ Done! Report saved to: {}",
        output_path.display()
    );

    Ok(())
}

/// Handle --dry-run: print the load breakdown, write nothing.
fn handle_dry_run(outcome: &holdings::LoadOutcome) -> Result<()> {
    println!("\n🔍 Dry run: holdings loaded, no report written.\n");
    println!("   Rows read: {}", outcome.rows_read);
    println!("   Equity rows kept: {}", outcome.holdings.len());
    println!("   Rows dropped: {}", outcome.dropped.len());

    if !outcome.dropped.is_empty() {
        println!();
        for row in &outcome.dropped {
            let identifier = if row.identifier.is_empty() {
                "<no identifier>"
            } else {
                row.identifier.as_str()
            };
            println!("     line {}: {} ({})", row.line, identifier, row.reason);
        }
    }

    println!("\n✅ Dry run complete.");
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .etfmap.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
