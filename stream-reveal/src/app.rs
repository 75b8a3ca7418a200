//! Event loop that replays text through a [`StreamController`].
//!
//! A producer task splits the input into deltas and sends them as [`AppEvent::Delta`], followed by
//! [`AppEvent::Finished`]. The controller's [`TokioTickScheduler`] feeds [`AppEvent::CommitTick`]
//! into the same channel, so every controller call happens on this loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::StreamConfig;
use crate::sink::StreamSink;
use crate::streaming::commit_tick::TokioTickScheduler;
use crate::streaming::controller::StreamController;

#[derive(Clone, Debug)]
pub(crate) enum AppEvent {
    Delta(String),
    Finished,
    CommitTick,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct RevealOptions {
    pub(crate) chunk_chars: usize,
    pub(crate) delta_interval: Duration,
    pub(crate) flush: bool,
    pub(crate) final_answer: bool,
}

/// Stream `input` into `sink` and return once the controller has gone idle.
pub(crate) async fn reveal(
    config: &StreamConfig,
    input: &str,
    options: RevealOptions,
    sink: &Arc<dyn StreamSink>,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = TokioTickScheduler::new(tx.clone(), AppEvent::CommitTick);
    let mut controller = StreamController::new(config, scheduler);

    if options.final_answer {
        controller.apply_final_answer(input, sink);
        return Ok(());
    }

    controller.begin(sink);
    let deltas = split_into_deltas(input, options.chunk_chars);
    tracing::info!(deltas = deltas.len(), bytes = input.len(), "replaying stream");
    let producer = tokio::spawn(produce(deltas, options.delta_interval, tx));

    while let Some(event) = rx.recv().await {
        match event {
            AppEvent::Delta(delta) => controller.push_and_maybe_commit(&delta),
            AppEvent::Finished => {
                controller.finalize(options.flush);
                if !controller.is_write_cycle_active() {
                    break;
                }
            }
            AppEvent::CommitTick => {
                if controller.on_commit_tick() {
                    break;
                }
            }
        }
    }
    controller.clear_all();
    producer.await?;
    tracing::info!("stream revealed");
    Ok(())
}

async fn produce(deltas: Vec<String>, interval: Duration, tx: UnboundedSender<AppEvent>) {
    for delta in deltas {
        if tx.send(AppEvent::Delta(delta)).is_err() {
            return;
        }
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
    let _ = tx.send(AppEvent::Finished);
}

/// Split `input` into deltas of at most `chunk_chars` characters, never inside a code point.
pub(crate) fn split_into_deltas(input: &str, chunk_chars: usize) -> Vec<String> {
    let chunk_chars = chunk_chars.max(1);
    let mut deltas = Vec::new();
    let mut current = String::new();
    for (idx, ch) in input.chars().enumerate() {
        current.push(ch);
        if (idx + 1) % chunk_chars == 0 {
            deltas.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        deltas.push(current);
    }
    deltas
}
