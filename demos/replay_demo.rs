//! Demonstration of recording and replaying a sleep session.
//!
//! This example shows how to:
//! 1. Feed simulated device readings through a channel source
//! 2. Persist each entry to a session log
//! 3. Replay the log into a fresh analysis session
//! 4. Render the summary and export it as JSON
//!
//! Run with: cargo run --example replay_demo

use std::io::Cursor;
use std::time::Duration;

use sleep_analyzer::{
    core::{report, AggregateView, AnalysisSession, AnalyzerConfig, Entry, EntrySink},
    logfile::{LogFileReader, LogWriter},
    source::{ChannelSource, Reading},
    telemetry::SessionTelemetry,
    SummaryBuilder,
};
use std::sync::Arc;

fn main() {
    println!("Sleep Analyzer - Replay Demo");
    println!("============================");
    println!();

    // A quiet night with a restless stretch in the middle
    let mut device_output = String::new();
    for minute in 0..240u32 {
        let value = if (100..130).contains(&minute) {
            5 + minute % 7
        } else if minute % 17 == 0 {
            1
        } else {
            0
        };
        device_output.push_str(&format!("{value}\n"));
    }
    device_output.push_str("noise\n");

    let dir = std::env::temp_dir().join("sleep-analyzer-demo");
    let config = AnalyzerConfig {
        trailing_window: 30,
        regression_window: 10,
        min_movement_value: 4,
        min_movement_sum: Some(150),
    };
    let telemetry = Arc::new(SessionTelemetry::new());

    // Record
    let mut source = ChannelSource::new(64);
    if let Err(e) = source.start(Cursor::new(device_output)) {
        eprintln!("Could not start source: {e}");
        return;
    }

    let mut writer = match LogWriter::create_in(&dir) {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("Could not create log: {e}");
            return;
        }
    };
    let log_path = writer.path().map(|p| p.to_path_buf());

    let mut live = AnalysisSession::new(config.clone()).with_telemetry(telemetry.clone());
    loop {
        match source.next_value_timeout(Duration::from_millis(100)) {
            Some(Reading::Value(value)) => {
                if let Ok(entry) = live.ingest(Entry::new(value)) {
                    if writer.write_entry(&entry).is_ok() {
                        telemetry.record_row_written();
                    }
                }
            }
            Some(Reading::Invalid(reason)) => {
                println!("Skipped device line: {reason}");
                telemetry.record_malformed_record();
            }
            Some(Reading::EndOfStream) => break,
            None => {}
        }
    }
    if let Err(e) = writer.close() {
        eprintln!("Could not close log: {e}");
        return;
    }

    println!("Live session:");
    println!("{}", report::render(&live));
    println!();

    // Replay
    let Some(log_path) = log_path else {
        return;
    };
    let reader = match LogFileReader::open(&log_path) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Could not open {log_path:?}: {e}");
            return;
        }
    };

    let mut replayed = AnalysisSession::new(config).with_session_id("replay-demo");
    for entry in reader.filter_map(Result::ok) {
        let _ = replayed.ingest(entry);
    }

    println!("Replayed {:?}:", log_path);
    println!("{}", report::render(&replayed));
    println!();
    println!(
        "Trailing sums match: {}",
        live.trailing_sum_series() == replayed.trailing_sum_series()
    );

    let summary = SummaryBuilder::new().build(&replayed);
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Could not serialize summary: {e}"),
    }

    println!();
    println!("{}", telemetry.summary());

    let _ = std::fs::remove_file(&log_path);
}
