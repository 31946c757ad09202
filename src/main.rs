//! JocReport - Journey of Change report generator
//!
//! A CLI tool that aggregates outcome measurement meetings into
//! cohort-level Journey of Change reports: every beneficiary's first and
//! last assessments are paired and compared across the questions and
//! categories of an outcome set.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, store failure, report failure)

mod cli;
mod config;
mod error;
mod models;
mod report;
mod store;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use indicatif::ProgressBar;
use models::ReportMetadata;
use report::ReportOptions;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use store::{JsonDirStore, MeetingStore};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("JocReport v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .jocreport.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".jocreport.toml");

    if path.exists() {
        eprintln!("⚠️  .jocreport.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .jocreport.toml")?;

    println!("✅ Created .jocreport.toml with default settings.");
    println!("   Edit it to customize the data directory, output path, and timeouts.");
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

/// Run the complete report workflow.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Step 1: Open the meeting store
    let data_dir = PathBuf::from(&config.store.data_dir);
    println!("📂 Loading data from: {}", data_dir.display());
    let store = JsonDirStore::open(&data_dir)
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
    println!(
        "   {} outcome sets, {} meetings",
        store.outcome_set_count(),
        store.meeting_count()
    );

    let outcome_set_id = args
        .outcome_set
        .clone()
        .ok_or_else(|| anyhow!("--outcome-set is required"))?;

    // Handle --meeting: single-meeting aggregates view, no cohort report.
    if let Some(ref meeting_id) = args.meeting {
        return show_meeting_aggregates(&store, &outcome_set_id, meeting_id).await;
    }

    let (from, to) = args.date_range().map_err(|e| anyhow!(e))?;

    // Step 2: Generate the report
    println!("\n📊 Generating Journey of Change report...");
    println!("   Outcome set: {}", outcome_set_id);
    println!(
        "   Window: {} to {} (inclusive)",
        from.format("%Y-%m-%d %H:%M"),
        to.format("%Y-%m-%d %H:%M")
    );
    if let Some(timeout) = config.report.timeout_seconds {
        println!("   Timeout: {}s", timeout);
    }

    let options = ReportOptions {
        concurrency: config.general.concurrency,
        timeout: config.report.timeout_seconds.map(Duration::from_secs),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Pairing and aggregating cohort...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    let result = report::generate_joc_report(&store, from, to, &outcome_set_id, &options).await;
    spinner.finish_and_clear();
    let joc = result?;

    // Step 3: Render and save
    let outcome_set = store.outcome_set(&outcome_set_id).await?;
    let metadata = ReportMetadata {
        outcome_set_id: outcome_set.id.clone(),
        outcome_set_name: outcome_set.name.clone(),
        from,
        to,
        generated_at: Utc::now(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    let output = match args.format {
        OutputFormat::Markdown => report::generate_markdown_report(&joc, &outcome_set, &metadata),
        OutputFormat::Json => report::generate_json_report(&joc, &metadata)?,
    };

    let output_path = PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    println!("\n📊 Report Summary:");
    println!("   Beneficiaries in cohort: {}", joc.beneficiary_ids.len());
    println!(
        "   Questions aggregated: {} | excluded: {}",
        joc.question_aggregates.first.len(),
        joc.excluded.question_ids.len()
    );
    println!(
        "   Categories aggregated: {} | excluded: {}",
        joc.category_aggregates.first.len(),
        joc.excluded.category_ids.len()
    );
    if !joc.warnings.is_empty() {
        println!("   ⚠️  Warnings: {}", joc.warnings.len());
        for warning in &joc.warnings {
            println!("      - {}", warning);
        }
    }
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!("\n✅ Report saved to: {}", output_path.display());

    Ok(())
}

/// Handle --meeting: print one meeting's per-category aggregates.
async fn show_meeting_aggregates(
    store: &JsonDirStore,
    outcome_set_id: &str,
    meeting_id: &str,
) -> Result<()> {
    let outcome_set = store.outcome_set(outcome_set_id).await?;
    let meeting = store
        .meeting(meeting_id)
        .ok_or_else(|| anyhow!("Meeting {} not found", meeting_id))?;
    if meeting.outcome_set_id != outcome_set_id {
        bail!(
            "Meeting {} belongs to outcome set {}, not {}",
            meeting_id,
            meeting.outcome_set_id,
            outcome_set_id
        );
    }

    println!(
        "\n🔎 Category aggregates for meeting {} (beneficiary {}, conducted {}):\n",
        meeting.id,
        meeting.beneficiary,
        meeting.conducted.format("%Y-%m-%d")
    );

    let aggregates = report::category_aggregates(meeting, &outcome_set)?;
    if aggregates.is_empty() {
        println!("   No category had any answers in this meeting.");
        return Ok(());
    }
    for aggregate in &aggregates {
        let label = outcome_set
            .category(&aggregate.category_id)
            .map(|c| c.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(aggregate.category_id.as_str());
        println!("   {}: {:.2}", label, aggregate.value);
    }

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
            info!("Loaded default config from .jocreport.toml");
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
