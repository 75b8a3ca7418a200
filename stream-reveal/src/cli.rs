use std::path::PathBuf;

use clap::Parser;

/// Replay a text file as a token stream and reveal it line by line.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Text to stream. Reads stdin when omitted.
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Stream config (TOML). Missing files fall back to defaults.
    #[arg(long = "config", short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of characters per simulated delta.
    #[arg(long = "chunk-chars", default_value_t = 7)]
    pub chunk_chars: usize,

    /// Delay between simulated deltas, in milliseconds.
    #[arg(long = "delta-interval-ms", default_value_t = 5)]
    pub delta_interval_ms: u64,

    /// Flush everything at once when the stream finishes instead of animating the tail.
    #[arg(long = "flush", default_value_t = false)]
    pub flush: bool,

    /// Deliver the whole input as a single final answer instead of deltas.
    #[arg(long = "final-answer", default_value_t = false, conflicts_with = "flush")]
    pub final_answer: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}
