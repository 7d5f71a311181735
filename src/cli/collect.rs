//! Collect command implementation

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::{CliError, StatusArgs};
use crate::api::{RetryingClient, Routes, ScanWindow};
use crate::collector::config::{
    DEFAULT_CHECKPOINT_EVERY, DEFAULT_HISTORY_WINDOW, DEFAULT_MATCHES_PER_PLAYER,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_PAGES_PER_DIVISION, DEFAULT_MIN_DURATION_SECS,
    DEFAULT_PER_SECOND, DEFAULT_PER_TWO_MINUTES, DEFAULT_QUEUE_ID, DEFAULT_TARGET_MATCHES,
    MAX_CONCURRENCY,
};
use crate::collector::{Collector, CollectorConfig, RateLimiter, RunSummary};
use crate::credential::{ApiKey, DEFAULT_ENV_FILE, DEFAULT_ENV_VAR};
use crate::shutdown::SharedShutdown;
use crate::AcceptFilters;

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Ranked Match Collector CLI
#[derive(Parser, Debug)]
#[command(name = "ranked-match-collector")]
#[command(about = "Collect ranked matches and timelines from the game-data API", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Logging level (DEBUG, INFO, WARNING, ERROR); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "INFO")]
    pub log_level: LogLevel,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect matches until the match list reaches the target
    Collect(CollectArgs),

    /// Inspect the match list and raw directory without network access
    Status(StatusArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Log verbosity accepted by `--log-level`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug and above
    Debug,
    /// Info and above
    Info,
    /// Warnings and errors
    Warn,
    /// Errors only
    Error,
}

impl LogLevel {
    /// Directive for the tracing filter
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" | "critical" => Ok(LogLevel::Error),
            _ => Err(format!(
                "Invalid log level: {s}. Valid options: DEBUG, INFO, WARNING, ERROR"
            )),
        }
    }
}

/// Collect command arguments
#[derive(Parser, Debug, Clone)]
pub struct CollectArgs {
    /// Total unique matches to keep on disk
    #[arg(long, default_value_t = DEFAULT_TARGET_MATCHES)]
    pub target_match_count: usize,

    /// Match ids requested per history page (capped at 100)
    #[arg(long, default_value_t = DEFAULT_MATCHES_PER_PLAYER)]
    pub matches_per_player: u32,

    /// Maximum depth of match history to scan per player
    #[arg(long, default_value_t = DEFAULT_HISTORY_WINDOW)]
    pub history_window: u32,

    /// Ladder pages to walk per division
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES_PER_DIVISION)]
    pub max_pages_per_division: u32,

    /// Directory where match documents and timelines are stored
    #[arg(long, default_value = "data/raw")]
    pub raw_dir: PathBuf,

    /// Match list file to update
    #[arg(long, default_value = "matchlist.json")]
    pub matchlist: PathBuf,

    /// Minimum game duration in seconds
    #[arg(long, default_value_t = DEFAULT_MIN_DURATION_SECS)]
    pub min_duration: i64,

    /// Queue id to keep (420 is ranked solo/duo); -1 keeps every queue
    #[arg(long, default_value_t = DEFAULT_QUEUE_ID, allow_negative_numbers = true)]
    pub queue_id: i64,

    /// Requests admitted per second
    #[arg(long, default_value_t = DEFAULT_PER_SECOND)]
    pub per_second: usize,

    /// Requests admitted per two minutes
    #[arg(long, default_value_t = DEFAULT_PER_TWO_MINUTES)]
    pub per_two_minutes: usize,

    /// Attempts per request, retries included (range: 1-20)
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: u32,

    /// Flush the match list after this many new matches (0 = only at the end)
    #[arg(long, default_value_t = DEFAULT_CHECKPOINT_EVERY)]
    pub checkpoint_every: usize,

    /// Players processed concurrently (max: 8)
    ///
    /// All players share one rate limiter, so this only helps when requests
    /// are slow rather than quota-bound.
    #[arg(long, default_value = "1", value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Stop starting new players after this many seconds
    #[arg(long)]
    pub max_runtime_secs: Option<u64>,

    /// Skip completing detail-only bundles at startup
    #[arg(long, default_value_t = false)]
    pub no_stub_sweep: bool,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,

    /// Dotenv file consulted when RIOT_API_KEY is not set
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Platform host override for ladder and account endpoints
    #[arg(long)]
    pub platform_url: Option<String>,

    /// Regional host override for match endpoints
    #[arg(long)]
    pub regional_url: Option<String>,
}

impl CollectArgs {
    /// Run configuration derived from the arguments
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig::new(self.target_match_count)
            .with_scan(ScanWindow::new(self.matches_per_player, self.history_window))
            .with_max_pages(self.max_pages_per_division)
            .with_filters(AcceptFilters::from_cli(self.queue_id, self.min_duration))
            .with_paths(&self.matchlist, &self.raw_dir)
            .with_checkpoint_every(self.checkpoint_every)
            .with_concurrency(self.concurrency)
            .with_max_runtime(self.max_runtime_secs.map(Duration::from_secs))
            .with_stub_sweep(!self.no_stub_sweep)
    }

    /// Endpoint routing with any host overrides applied
    pub fn routes(&self) -> Routes {
        let mut routes = Routes::default();
        if let Some(url) = &self.platform_url {
            routes.platform_url = url.clone();
        }
        if let Some(url) = &self.regional_url {
            routes.regional_url = url.clone();
        }
        routes
    }

    /// Execute the collect command
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        // Checked before anything touches the network
        let key = ApiKey::require(DEFAULT_ENV_VAR, &self.env_file)?;

        if let Some(addr) = self.metrics_addr {
            crate::metrics::init_metrics(addr)?;
        }

        let limiter = Arc::new(RateLimiter::new(self.per_second, self.per_two_minutes));
        let client = RetryingClient::new(&key, limiter)?.with_max_attempts(self.max_retries);
        let config = self.collector_config();
        info!(
            target = config.target,
            raw_dir = %config.raw_dir.display(),
            matchlist = %config.matchlist_path.display(),
            concurrency = config.concurrency,
            "Starting collection"
        );

        let mut collector = Collector::new(Arc::new(client), Arc::new(self.routes()), config)
            .with_shutdown(shutdown);
        let progress = match cli.output_format {
            OutputFormat::Human => {
                let pb = create_progress_bar(self.target_match_count);
                collector = collector.with_progress(pb.clone());
                Some(pb)
            }
            OutputFormat::Json => None,
        };

        let result = collector.run().await;
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        match cli.output_format {
            OutputFormat::Json => output_json(&result),
            OutputFormat::Human => output_human(&result),
        }
        result.map(|_| ()).map_err(CliError::from)
    }
}

/// Create progress bar with style
fn create_progress_bar(target: usize) -> ProgressBar {
    let pb = ProgressBar::new(target as u64);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message("matches");
    pb
}

fn output_json(result: &Result<RunSummary, crate::collector::CollectError>) {
    let output = match result {
        Ok(summary) => serde_json::json!({
            "success": true,
            "summary": summary,
            "target_met": summary.target_met(),
            "error": null,
        }),
        Err(e) => serde_json::json!({
            "success": false,
            "summary": null,
            "error": e.to_string(),
        }),
    };
    match serde_json::to_string(&output) {
        Ok(line) => println!("{line}"),
        Err(e) => error!(error = %e, "Failed to serialize run report"),
    }
}

fn output_human(result: &Result<RunSummary, crate::collector::CollectError>) {
    match result {
        Ok(summary) => {
            println!("\nCollection finished ({})", summary.stop_reason);
            println!("New matches: {}", summary.newly_accepted);
            println!("Total matches: {}/{}", summary.total_known, summary.target);
            if summary.stubs_completed > 0 {
                println!("Stubs completed: {}", summary.stubs_completed);
            }
            println!("Players scanned: {}", summary.players_scanned);
            if !summary.skipped.is_empty() {
                println!("Skipped:");
                for (label, count) in &summary.skipped {
                    println!("  {label}: {count}");
                }
            }
            println!("Elapsed: {:.1}s", summary.elapsed_secs());
        }
        Err(e) => {
            eprintln!("\nCollection failed!");
            eprintln!("Error: {e}");
            error!("Collection failed: {}", e);
        }
    }
}
