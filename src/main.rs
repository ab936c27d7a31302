//! CLI entry point for the space occupancy tool.
//!
//! Provides subcommands for the month-over-month occupancy report and for a
//! plain hourly bucket export.

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use space_occupancy::analyzers::aggregate::aggregate;
use space_occupancy::analyzers::analyzer::{AnalyzeOptions, DEFAULT_TOP_HOURS, analyze, load_visits};
use space_occupancy::analyzers::types::PeriodSummary;
use space_occupancy::config::ColumnConfig;
use space_occupancy::output::{log_summary, print_pretty, write_buckets_csv, write_report_json};
use space_occupancy::parser::parse_timestamp;
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "space_occupancy")]
#[command(about = "Hourly occupancy statistics and month-over-month comparison for check-in logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare this month to date against the same span of last month
    Report {
        /// Path or URL of the visit CSV (optionally .gz)
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Reference instant, e.g. "2024-04-15 18:00:00" (defaults to now)
        #[arg(long, value_parser = parse_now)]
        now: Option<NaiveDateTime>,

        /// JSON file to write the report to
        #[arg(short, long, default_value = "report.json")]
        output: String,

        /// JSON file mapping visit fields to CSV header names
        #[arg(short, long)]
        columns: Option<String>,

        /// Number of busiest hours listed per period
        #[arg(long, default_value_t = DEFAULT_TOP_HOURS)]
        top: usize,
    },
    /// Aggregate every valid visit into hourly buckets and export them as CSV
    Hourly {
        /// Path or URL of the visit CSV (optionally .gz)
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// CSV file to write the buckets to
        #[arg(short, long, default_value = "buckets.csv")]
        output: String,

        /// JSON file mapping visit fields to CSV header names
        #[arg(short, long)]
        columns: Option<String>,
    },
}

fn parse_now(raw: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/space_occupancy.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("space_occupancy.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let api_token = std::env::var("VISITS_API_TOKEN").ok();

    match cli.command {
        Commands::Report {
            source,
            now,
            output,
            columns,
            top,
        } => {
            // The only wall-clock read; everything below is driven by `now`.
            let now = now.unwrap_or_else(|| Local::now().naive_local());
            let options = AnalyzeOptions {
                columns: ColumnConfig::load_or_default(columns.as_deref())?,
                top_hours: top,
                api_token,
            };

            let report = analyze(&source, now, &options).await?;

            print_pretty(&report);
            log_summary(&report);
            write_report_json(&output, &report)?;
            info!(output = %output, "Report written");
        }
        Commands::Hourly {
            source,
            output,
            columns,
        } => {
            let options = AnalyzeOptions {
                columns: ColumnConfig::load_or_default(columns.as_deref())?,
                api_token,
                ..AnalyzeOptions::default()
            };

            let normalized = load_visits(&source, &options).await?;
            let occupancy = aggregate(&normalized.visits);
            let summary = PeriodSummary::from_occupancy(&occupancy);

            write_buckets_csv(&output, &occupancy.buckets)?;
            info!(
                output = %output,
                buckets = occupancy.buckets.len(),
                total_hours = summary.total_hours,
                peak_occupancy = summary.peak_occupancy,
                average_occupancy = summary.average_occupancy,
                "Hourly buckets written"
            );
        }
    }

    Ok(())
}
