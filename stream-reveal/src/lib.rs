// Forbid accidental stdout/stderr writes in the *library* portion of the crate.
#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::AsyncReadExt;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod app;
mod cli;
pub mod config;
pub mod markdown_fence;
pub mod markdown_stream;
pub mod sink;
pub mod streaming;

pub use cli::Cli;
pub use config::ConfigError;
pub use config::StreamConfig;
pub use markdown_fence::MarkdownNormalization;
pub use markdown_stream::LineCollector;
pub use markdown_stream::simulate_stream;
pub use sink::ChannelSink;
pub use sink::SinkEvent;
pub use sink::StreamSink;
pub use sink::WriterSink;
pub use streaming::LineStreamer;
pub use streaming::StreamStep;
pub use streaming::commit_tick::CommitTickScheduler;
pub use streaming::commit_tick::ManualTickScheduler;
pub use streaming::commit_tick::TickGuard;
pub use streaming::commit_tick::TokioTickScheduler;
pub use streaming::controller::StreamController;
pub use streaming::controller::StreamPhase;

use crate::app::RevealOptions;

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    // Keep the guard alive until the reveal finishes so buffered log lines are flushed.
    let _log_guard = init_tracing(cli.log_file.as_deref())?;

    let config = match cli.config.as_deref() {
        Some(path) => StreamConfig::load(path)?,
        None => StreamConfig::default(),
    };
    tracing::debug!(?config, "loaded stream config");

    let input = read_input(cli.input.as_deref()).await?;
    let options = RevealOptions {
        chunk_chars: cli.chunk_chars,
        delta_interval: Duration::from_millis(cli.delta_interval_ms),
        flush: cli.flush,
        final_answer: cli.final_answer,
    };

    let sink: Arc<dyn StreamSink> = Arc::new(WriterSink::new(std::io::stdout()));
    app::reveal(&config, &input, options, &sink).await
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    // use RUST_LOG env var, default to info for this crate.
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stream_reveal=info"))
    };

    let Some(path) = log_file else {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(env_filter());
        let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
        return Ok(None);
    };

    let mut log_file_opts = OpenOptions::new();
    log_file_opts.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        log_file_opts.mode(0o600);
    }
    let file = log_file_opts
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let (non_blocking, guard) = non_blocking(file);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_ansi(false)
        .with_filter(env_filter());
    let _ = tracing_subscriber::registry().with(file_layer).try_init();
    Ok(Some(guard))
}

async fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read input {}", path.display())),
        None => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .context("failed to read input from stdin")?;
            Ok(input)
        }
    }
}
