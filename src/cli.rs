//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Parser;
use std::path::PathBuf;

/// JocReport - Journey of Change report generator
///
/// Aggregate outcome measurement meetings into a cohort-level Journey of
/// Change report: each beneficiary's first and last assessments are paired
/// and compared across every question and category of an outcome set.
///
/// Examples:
///   jocreport --outcome-set wellbeing --from 2024-01-01 --to 2024-06-30
///   jocreport --data ./fixtures --outcome-set wellbeing --from 2024-01-01 --to 2024-06-30 --format json
///   jocreport --data ./fixtures --outcome-set wellbeing --meeting amina-2
///   jocreport --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Data directory containing outcomesets/ and meetings/
    ///
    /// Defaults to ./data or the data_dir from .jocreport.toml.
    #[arg(short, long, value_name = "DIR", env = "JOCREPORT_DATA")]
    pub data: Option<PathBuf>,

    /// Outcome set to report on
    #[arg(
        short = 's',
        long = "outcome-set",
        value_name = "ID",
        required_unless_present = "init_config",
        env = "JOCREPORT_OUTCOME_SET"
    )]
    pub outcome_set: Option<String>,

    /// Start of the reporting window (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,

    /// End of the reporting window, inclusive (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,

    /// Output file path for the report
    ///
    /// Defaults to joc_report.md or the output from .jocreport.toml.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Print the category aggregates of a single meeting and exit
    ///
    /// Skips cohort reporting entirely; --from/--to are not needed.
    #[arg(long, value_name = "MEETING_ID", conflicts_with_all = ["from", "to"])]
    pub meeting: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .jocreport.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of concurrent beneficiary history fetches
    #[arg(long, default_value = "4", value_name = "NUM")]
    pub concurrency: usize,

    /// Abort report generation after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .jocreport.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
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

        // Cohort reports need a window; the single-meeting view doesn't.
        if self.meeting.is_none() {
            let (from, to) = self.date_range()?;
            if from > to {
                return Err(format!(
                    "--from ({}) must not be after --to ({})",
                    from.format("%Y-%m-%d"),
                    to.format("%Y-%m-%d")
                ));
            }
        }

        // Validate concurrency
        if self.concurrency == 0 {
            return Err("Concurrency must be at least 1".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// The parsed reporting window.
    pub fn date_range(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
        let from = self
            .from
            .as_deref()
            .ok_or_else(|| "--from is required when generating a report".to_string())?;
        let to = self
            .to
            .as_deref()
            .ok_or_else(|| "--to is required when generating a report".to_string())?;
        Ok((parse_date(from)?, parse_date(to)?))
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

/// Parse a CLI date: a plain date is taken as midnight UTC, anything else
/// must be a full RFC 3339 timestamp.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }
    Err(format!(
        "Invalid date '{}': expected YYYY-MM-DD or RFC 3339",
        input
    ))
}
