//! Sleep Analyzer CLI
//!
//! Records movement readings from a motion sensor and analyzes session logs.

use clap::{Args, Parser, Subcommand};
use sleep_analyzer::{
    config::Config,
    core::{report, AnalysisSession, AnalyzerConfig, Entry, EntrySink, SummaryBuilder},
    logfile::{LogFileReader, LogWriter, RecordError, LOG_FILE_SUFFIX},
    source::{ChannelSource, Reading},
    telemetry::{create_shared_telemetry_with_persistence, SharedTelemetry},
    VERSION,
};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "upload")]
use sleep_analyzer::{BlockingUploadClient, UploadConfig};

#[derive(Parser)]
#[command(name = "sleep-analyzer")]
#[command(version = VERSION)]
#[command(about = "Live movement logger and analyzer for overnight recordings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record readings from a device into a new session log
    Record {
        /// Device to read from, one value per line ("-" for stdin)
        #[arg(long, default_value = "-")]
        device: String,

        /// Directory for the session log (defaults to the configured log_dir)
        #[arg(long)]
        log_dir: Option<PathBuf>,

        #[command(flatten)]
        analyzer: AnalyzerArgs,

        /// Do not export a JSON session summary
        #[arg(long)]
        no_summary: bool,
    },

    /// Replay one or more session logs and print their summaries
    Analyze {
        /// Session logs to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        analyzer: AnalyzerArgs,

        /// Directory for exported summaries (defaults to the data directory)
        #[arg(long)]
        summary_out: Option<PathBuf>,

        /// Do not export JSON session summaries
        #[arg(long)]
        no_summary: bool,
    },

    /// Upload completed session logs (requires upload feature)
    Upload {
        /// Directory holding session logs (defaults to the configured log_dir)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Log server URL (overrides the configured endpoint)
        #[arg(long)]
        endpoint: Option<String>,

        /// Bearer token (overrides the configured token)
        #[arg(long)]
        token: Option<String>,
    },

    /// Show local logs and cumulative statistics
    Status,

    /// Show configuration
    Config,
}

/// Analyzer overrides shared by `record` and `analyze`.
#[derive(Args)]
struct AnalyzerArgs {
    /// Movement values above this count as big movements
    #[arg(short = 'm', long)]
    minimum_value: Option<u32>,

    /// Log trailing sums above this value
    #[arg(short = 's', long)]
    minimum_sum: Option<u64>,

    /// Number of entries in the trailing sum window
    #[arg(long)]
    trailing_window: Option<usize>,

    /// Number of decaying scores the trend is fitted over
    #[arg(long)]
    regression_window: Option<usize>,
}

impl AnalyzerArgs {
    fn apply(&self, base: &AnalyzerConfig) -> AnalyzerConfig {
        let mut config = base.clone();
        if let Some(value) = self.minimum_value {
            config.min_movement_value = value;
        }
        if let Some(sum) = self.minimum_sum {
            config.min_movement_sum = Some(sum);
        }
        if let Some(window) = self.trailing_window {
            config.trailing_window = window;
        }
        if let Some(window) = self.regression_window {
            config.regression_window = window;
        }
        config
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Record {
            device,
            log_dir,
            analyzer,
            no_summary,
        } => {
            cmd_record(&device, log_dir, &analyzer, no_summary);
        }
        Commands::Analyze {
            files,
            analyzer,
            summary_out,
            no_summary,
        } => {
            cmd_analyze(&files, &analyzer, summary_out, no_summary);
        }
        Commands::Upload {
            dir,
            endpoint,
            token,
        } => {
            cmd_upload(dir, endpoint, token);
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

/// Load the configuration, exiting on an invalid file.
fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config {:?}: {e}", Config::config_path());
            std::process::exit(1);
        }
    }
}

fn resolve_analyzer_config(config: &Config, args: &AnalyzerArgs) -> AnalyzerConfig {
    let analyzer_config = args.apply(&config.analyzer);
    if let Err(e) = analyzer_config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    analyzer_config
}

fn cmd_record(device: &str, log_dir: Option<PathBuf>, args: &AnalyzerArgs, no_summary: bool) {
    println!("Sleep Analyzer v{VERSION}");
    println!();

    let config = load_config();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }
    let analyzer_config = resolve_analyzer_config(&config, args);

    let mut source = ChannelSource::new(config.channel_capacity);
    let started = if device == "-" {
        source.start(BufReader::new(std::io::stdin()))
    } else {
        match File::open(device) {
            Ok(file) => source.start(BufReader::new(file)),
            Err(e) => {
                eprintln!("Error opening device {device}: {e}");
                std::process::exit(1);
            }
        }
    };
    if let Err(e) = started {
        eprintln!("Error starting reader: {e}");
        std::process::exit(1);
    }

    let log_dir = log_dir.unwrap_or_else(|| config.log_dir.clone());
    let mut writer = match LogWriter::create_in(&log_dir) {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("Error creating log in {log_dir:?}: {e}");
            std::process::exit(1);
        }
    };

    let telemetry = create_shared_telemetry_with_persistence(config.telemetry_path());
    let mut session = AnalysisSession::new(analyzer_config).with_telemetry(telemetry.clone());

    println!("Recording...");
    println!("  Device: {}", if device == "-" { "stdin" } else { device });
    if let Some(path) = writer.path() {
        println!("  Log file: {path:?}");
    }
    println!(
        "  Big movement threshold: {}",
        session.config().min_movement_value
    );
    println!("  Trailing window: {} entries", session.config().trailing_window);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    while running.load(Ordering::SeqCst) {
        match source.next_value_timeout(Duration::from_millis(100)) {
            Some(Reading::Value(value)) => {
                let entry = match session.ingest(Entry::new(value)) {
                    Ok(entry) => entry,
                    Err(e) => {
                        eprintln!("Warning: Entry rejected: {e}");
                        continue;
                    }
                };

                if let Err(e) = writer.write_entry(&entry).and_then(|_| writer.flush()) {
                    eprintln!("Error writing log: {e}");
                    break;
                }
                telemetry.record_row_written();

                if session.analyzer().is_big_movement(value) {
                    println!("[{}] Big movement: {value}", entry.time_string());
                }
            }
            Some(Reading::Invalid(reason)) => {
                tracing::warn!("Skipping device reading: {reason}");
                telemetry.record_malformed_record();
            }
            Some(Reading::EndOfStream) => {
                println!("Device stream ended");
                break;
            }
            None => {}
        }
    }

    println!();
    println!("Stopping recording...");
    source.stop();

    if let Err(e) = writer.close() {
        eprintln!("Error closing log: {e}");
    }

    println!();
    println!("{}", report::render(&session));

    if !no_summary {
        export_summary(&session, &config.summary_dir(), &telemetry);
    }

    if let Err(e) = telemetry.save() {
        eprintln!("Warning: Could not save telemetry: {e}");
    }

    println!();
    println!("{}", telemetry.summary());
}

fn cmd_analyze(
    files: &[PathBuf],
    args: &AnalyzerArgs,
    summary_out: Option<PathBuf>,
    no_summary: bool,
) {
    let config = load_config();
    let analyzer_config = resolve_analyzer_config(&config, args);
    let summary_dir = summary_out.unwrap_or_else(|| config.summary_dir());
    let telemetry = create_shared_telemetry_with_persistence(config.telemetry_path());

    for path in files {
        println!("Analyzing {path:?}");

        let session = match replay_file(path, &analyzer_config, &telemetry) {
            Ok(session) => session,
            Err(e) => {
                eprintln!("Error reading {path:?}: {e}");
                continue;
            }
        };

        println!("{}", report::render(&session));
        if !no_summary {
            export_summary(&session, &summary_dir, &telemetry);
        }
        println!();
    }

    if let Err(e) = telemetry.save() {
        eprintln!("Warning: Could not save telemetry: {e}");
    }
}

/// Replay one log into a fresh session, skipping malformed rows.
///
/// A read error ends the replay but keeps what was analyzed so far.
fn replay_file(
    path: &Path,
    analyzer_config: &AnalyzerConfig,
    telemetry: &SharedTelemetry,
) -> Result<AnalysisSession, RecordError> {
    let mut log = LogFileReader::open(path)?;
    let session_id = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(LOG_FILE_SUFFIX).to_string())
        .unwrap_or_else(|| path.display().to_string());
    let mut session = AnalysisSession::new(analyzer_config.clone())
        .with_session_id(session_id)
        .with_telemetry(telemetry.clone());

    let mut last_percent = None;
    while let Some(record) = log.next() {
        match record {
            Ok(entry) => {
                if let Err(e) = session.ingest(entry) {
                    eprintln!("\nWarning: Entry rejected: {e}");
                }
            }
            Err(e @ RecordError::MalformedRecord { .. }) => {
                eprintln!("\nWarning: {e}");
                telemetry.record_malformed_record();
            }
            Err(e) => {
                eprintln!("\nWarning: Replay stopped early: {e}");
                break;
            }
        }

        let percent = log.progress_percent() as u32;
        if last_percent != Some(percent) {
            print!("\r{percent}%");
            let _ = std::io::stdout().flush();
            last_percent = Some(percent);
        }
    }
    println!("\r100%");

    Ok(session)
}

fn export_summary(session: &AnalysisSession, dir: &Path, telemetry: &SharedTelemetry) {
    let summary = SummaryBuilder::new().build(session);
    let path = dir.join(summary.file_name());
    match summary.write_to(&path) {
        Ok(()) => {
            telemetry.record_summary_exported();
            println!("Exported summary to {path:?}");
        }
        Err(e) => eprintln!("Error writing summary: {e}"),
    }
}

#[allow(unused_variables)]
fn cmd_upload(dir: Option<PathBuf>, endpoint: Option<String>, token: Option<String>) {
    #[cfg(feature = "upload")]
    {
        let config = load_config();
        let mut settings = config.upload.clone();
        if endpoint.is_some() {
            settings.endpoint = endpoint;
        }
        if token.is_some() {
            settings.token = token;
        }

        let client = match UploadConfig::from_settings(&settings).and_then(BlockingUploadClient::new)
        {
            Ok(client) => client,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        };

        println!("Device ID: {}", client.device_id());
        match client.test_connection() {
            Ok(true) => println!("Log server connection: OK"),
            Ok(false) => eprintln!("Warning: Log server health check failed"),
            Err(e) => eprintln!("Warning: Could not connect to log server: {e}"),
        }

        let dir = dir.unwrap_or(config.log_dir);
        match client.upload_new_logfiles(&dir) {
            Ok(report) => {
                for (name, error) in &report.failed {
                    eprintln!("  {name}: {error}");
                }
                println!("Upload complete ({report})");
            }
            Err(e) => {
                eprintln!("Upload failed: {e}");
                std::process::exit(1);
            }
        }
    }

    #[cfg(not(feature = "upload"))]
    {
        eprintln!("Error: upload command unavailable (upload feature not enabled at compile time)");
        std::process::exit(1);
    }
}

fn cmd_status() {
    let config = load_config();

    println!("Sleep Analyzer Status");
    println!("=====================");
    println!();

    println!("Configuration:");
    println!("  Log directory: {:?}", config.log_dir);
    println!(
        "  Big movement threshold: {}",
        config.analyzer.min_movement_value
    );
    println!(
        "  Trailing window: {} entries",
        config.analyzer.trailing_window
    );
    println!(
        "  Regression window: {} entries",
        config.analyzer.regression_window
    );
    println!();

    let logs: Vec<PathBuf> = std::fs::read_dir(&config.log_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.ends_with(LOG_FILE_SUFFIX))
                        .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default();
    println!("Session logs: {}", logs.len());
    println!();

    let stats_path = config.telemetry_path();
    if stats_path.exists() {
        let stats = create_shared_telemetry_with_persistence(stats_path).stats();
        println!("Cumulative Statistics:");
        println!("  Entries observed: {}", stats.entries_observed);
        println!("  Big movements: {}", stats.big_movements);
        println!("  Rejected entries: {}", stats.rejected_entries);
        println!("  Malformed records: {}", stats.malformed_records);
        println!("  Rows written: {}", stats.rows_written);
        println!("  Summaries exported: {}", stats.summaries_exported);
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_config() {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}
