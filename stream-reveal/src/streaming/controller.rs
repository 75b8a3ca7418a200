//! Orchestrates one logical stream from producer deltas to revealed sink lines.
//!
//! The producer delivers assistant output as a sequence of deltas, or as one complete message.
//! [`StreamController`] glues together:
//!
//! - newline-gated, fence-safe accumulation ([`LineCollector`]),
//! - commit-tick animation ([`LineStreamer`] queue paced by a [`CommitTickScheduler`]), and
//! - delivery to the caller's [`StreamSink`].
//!
//! Lifecycle: `Idle` --begin--> `Active` --finalize(false)--> `Draining` --queue empty--> `Idle`.
//! `finalize(true)` and [`StreamController::clear_all`] return to `Idle` immediately.

use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;
use std::time::Instant;

use crate::config::StreamConfig;
use crate::markdown_stream::LineCollector;
use crate::sink::StreamSink;

use super::LineStreamer;
use super::commit_tick::CommitTickScheduler;
use super::commit_tick::TickGuard;

/// Lifecycle phase of a [`StreamController`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamPhase {
    /// No stream in flight.
    Idle,
    /// Accepting deltas.
    Active,
    /// Finalized without an immediate flush; queued lines are still being revealed.
    Draining,
}

/// Controller that manages newline-gated streaming and commit animation for one stream at a time.
pub struct StreamController {
    collector: LineCollector,
    streamer: LineStreamer,
    phase: StreamPhase,
    sink: Option<Weak<dyn StreamSink>>,
    scheduler: Box<dyn CommitTickScheduler>,
    commit_tick: Option<TickGuard>,
    tick_interval: Duration,
}

impl StreamController {
    pub fn new(config: &StreamConfig, scheduler: impl CommitTickScheduler + 'static) -> Self {
        Self {
            collector: LineCollector::with_normalization(config.normalization()),
            streamer: LineStreamer::new(),
            phase: StreamPhase::Idle,
            sink: None,
            scheduler: Box::new(scheduler),
            commit_tick: None,
            tick_interval: config.commit_tick_interval(),
        }
    }

    /// Start a logical stream that reveals into `sink`.
    ///
    /// Collector and queue contents are left alone; call [`Self::clear_all`] first when reusing
    /// the controller for a new turn.
    pub fn begin(&mut self, sink: &Arc<dyn StreamSink>) {
        tracing::debug!(prev = ?self.phase, "stream.begin");
        self.sink = Some(Arc::downgrade(sink));
        self.phase = StreamPhase::Active;
    }

    /// Push a delta; if it contains a newline, commit completed lines and start animation.
    pub fn push_and_maybe_commit(&mut self, delta: &str) {
        if !self.is_write_cycle_active() {
            tracing::debug!("push_and_maybe_commit called without an active stream");
            return;
        }
        self.collector.push_delta(delta);
        if delta.contains('\n') {
            let newly_completed = self.collector.commit_complete_lines();
            if !newly_completed.is_empty() {
                tracing::debug!(lines = newly_completed.len(), "stream.commit");
                self.streamer.enqueue(newly_completed);
                self.start_commit_animation();
            }
        }
    }

    /// Finalize the active stream.
    ///
    /// With `flush_immediately`, the queued lines followed by the uncommitted tail are delivered in
    /// one `insert_lines` call and the controller returns to `Idle`; returns `true`. Otherwise the
    /// remaining lines join the queue and keep animating out, and the controller returns to `Idle`
    /// on the tick that empties the queue; returns `false`.
    pub fn finalize(&mut self, flush_immediately: bool) -> bool {
        if !self.is_write_cycle_active() {
            tracing::debug!("finalize called without an active stream");
            return false;
        }
        let remaining = self.collector.finalize_and_drain();

        if flush_immediately {
            // Queued lines precede the leftovers in the source text, so the batch keeps that order.
            if !remaining.is_empty() {
                self.streamer.enqueue(remaining);
            }
            let out_lines = self.streamer.drain_all().lines;
            tracing::debug!(lines = out_lines.len(), "stream.finalize flush");
            if !out_lines.is_empty() {
                self.with_sink(|sink| sink.insert_lines(out_lines));
            }
            self.cleanup();
            return true;
        }

        if !remaining.is_empty() {
            self.streamer.enqueue(remaining);
        }
        if self.streamer.is_empty() {
            // Nothing left to animate, so no tick will ever finish the drain.
            tracing::debug!("stream.finalize with empty queue");
            self.cleanup();
            return false;
        }
        tracing::debug!(queued = self.streamer.len(), "stream.finalize draining");
        self.phase = StreamPhase::Draining;
        self.start_commit_animation();
        false
    }

    /// Reveal a complete message that was not streamed as deltas, then flush immediately.
    ///
    /// If deltas already built this turn's content, the message is assumed to equal their
    /// concatenation and only the streamed content is finalized.
    pub fn apply_final_answer(&mut self, message: &str, sink: &Arc<dyn StreamSink>) -> bool {
        tracing::debug!(
            message_len = message.len(),
            has_seen_delta = self.collector.has_seen_delta(),
            "apply_final_answer"
        );
        self.begin(sink);
        if !self.collector.has_seen_delta() && !message.is_empty() {
            let mut msg = message.to_owned();
            if !msg.ends_with('\n') {
                msg.push('\n');
            }
            let committed = self.collector.committed_count();
            self.collector
                .replace_with_and_mark_committed(&msg, committed);
        }
        self.finalize(true)
    }

    /// Cancel any in-flight stream and reset to `Idle`. Safe to call in any phase.
    pub fn clear_all(&mut self) {
        tracing::debug!(phase = ?self.phase, "clear_all");
        self.stop_commit_animation();
        self.collector.clear();
        self.streamer.clear();
        self.phase = StreamPhase::Idle;
    }

    pub fn is_write_cycle_active(&self) -> bool {
        self.phase != StreamPhase::Idle
    }

    /// Step animation: reveal at most one queued line and handle end-of-drain cleanup.
    ///
    /// Returns `true` when this tick completed a draining stream.
    pub fn on_commit_tick(&mut self) -> bool {
        if !self.is_write_cycle_active() {
            return false;
        }
        let step = self.streamer.step();
        if !step.lines.is_empty() {
            let lines = step.lines;
            self.with_sink(|sink| sink.insert_lines(lines));
        }
        tracing::trace!(
            queued = self.streamer.len(),
            phase = ?self.phase,
            "commit tick"
        );

        if step.is_complete {
            self.stop_commit_animation();
            if self.phase == StreamPhase::Draining {
                self.cleanup();
                return true;
            }
        }
        false
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn queued_lines(&self) -> usize {
        self.streamer.len()
    }

    pub fn oldest_queued_age(&self, now: Instant) -> Option<Duration> {
        self.streamer.oldest_queued_age(now)
    }

    /// Whether a commit tick source is currently running.
    pub fn is_animating(&self) -> bool {
        self.commit_tick.is_some()
    }

    fn start_commit_animation(&mut self) {
        if self.commit_tick.is_some() || self.streamer.is_empty() {
            return;
        }
        tracing::debug!(interval = ?self.tick_interval, "start commit animation");
        self.commit_tick = Some(self.scheduler.start(self.tick_interval));
        self.with_sink(|sink| sink.start_animation());
    }

    fn stop_commit_animation(&mut self) {
        if self.commit_tick.take().is_some() {
            tracing::debug!("stop commit animation");
            self.with_sink(|sink| sink.stop_animation());
        }
    }

    fn cleanup(&mut self) {
        self.stop_commit_animation();
        self.collector.clear();
        self.streamer.clear();
        self.phase = StreamPhase::Idle;
        tracing::debug!("stream finished");
    }

    fn with_sink(&self, f: impl FnOnce(&dyn StreamSink)) {
        match self.sink.as_ref().and_then(Weak::upgrade) {
            Some(sink) => f(sink.as_ref()),
            None => tracing::debug!("stream sink dropped; skipping notification"),
        }
    }
}
