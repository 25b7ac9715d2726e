use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct StreamSummary {
    pub capacity: usize,
    pub frames_delivered: u64,
    pub bytes_delivered: u64,
    pub audio_config_seen: bool,
    pub video_config_seen: bool,
    pub elapsed_ms: f64,
}

pub fn print_stream_summary(summary: &StreamSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(summary),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CAPACITY", "FRAMES", "BYTES", "CONFIGS", "ELAPSED"])
                .add_row(vec![
                    summary.capacity.to_string(),
                    summary.frames_delivered.to_string(),
                    summary.bytes_delivered.to_string(),
                    format!(
                        "audio={} video={}",
                        summary.audio_config_seen, summary.video_config_seen
                    ),
                    format!("{:.1} ms", summary.elapsed_ms),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "delivered {} frames ({} bytes) through a {}-byte fifo in {:.1} ms (audio_config={}, video_config={})",
                summary.frames_delivered,
                summary.bytes_delivered,
                summary.capacity,
                summary.elapsed_ms,
                summary.audio_config_seen,
                summary.video_config_seen
            );
        }
    }
}

#[derive(Serialize)]
pub struct BenchSummary {
    pub capacity: usize,
    pub messages: u64,
    pub message_size: usize,
    pub elapsed_ms: f64,
    pub msgs_per_sec: f64,
    pub mb_per_sec: f64,
}

pub fn print_bench_summary(summary: &BenchSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(summary),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CAPACITY", "MESSAGES", "SIZE", "MSGS/S", "MB/S"])
                .add_row(vec![
                    summary.capacity.to_string(),
                    summary.messages.to_string(),
                    summary.message_size.to_string(),
                    format!("{:.0}", summary.msgs_per_sec),
                    format!("{:.2}", summary.mb_per_sec),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} messages of {} bytes in {:.1} ms: {:.0} msgs/s, {:.2} MB/s",
                summary.messages,
                summary.message_size,
                summary.elapsed_ms,
                summary.msgs_per_sec,
                summary.mb_per_sec
            );
        }
    }
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}
