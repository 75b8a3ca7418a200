//! Streaming primitives used by the transcript reveal pipeline.
//!
//! [`LineStreamer`] is a FIFO queue of committed lines. Higher-level modules build on top of it:
//! - `controller` owns one stream's lifecycle and moves collector output through the queue to a
//!   [`crate::StreamSink`].
//! - `commit_tick` provides the timer sources that pace the queue drain.
//!
//! The key invariant is queue ordering. All drains pop from the front, and enqueue records an
//! arrival timestamp so callers can report how long the oldest line has been waiting.

use std::collections::VecDeque;
use std::time::Duration;
use std::time::Instant;

pub mod commit_tick;
pub mod controller;

struct QueuedLine {
    line: String,
    enqueued_at: Instant,
}

/// Lines released by one drain of a [`LineStreamer`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamStep {
    pub lines: Vec<String>,
    /// `true` when the queue is empty after this drain.
    pub is_complete: bool,
}

/// FIFO queue of committed lines waiting to be revealed.
#[derive(Default)]
pub struct LineStreamer {
    queued_lines: VecDeque<QueuedLine>,
}

impl LineStreamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends committed lines to the queue with a shared enqueue timestamp.
    pub fn enqueue(&mut self, lines: Vec<String>) {
        let now = Instant::now();
        self.queued_lines
            .extend(lines.into_iter().map(|line| QueuedLine {
                line,
                enqueued_at: now,
            }));
    }

    /// Drains one queued line from the front of the queue.
    pub fn step(&mut self) -> StreamStep {
        let lines = self
            .queued_lines
            .pop_front()
            .map(|queued| queued.line)
            .into_iter()
            .collect();
        StreamStep {
            lines,
            is_complete: self.queued_lines.is_empty(),
        }
    }

    /// Drains all queued lines at once.
    pub fn drain_all(&mut self) -> StreamStep {
        StreamStep {
            lines: self
                .queued_lines
                .drain(..)
                .map(|queued| queued.line)
                .collect(),
            is_complete: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queued_lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queued_lines.len()
    }

    pub fn clear(&mut self) {
        self.queued_lines.clear();
    }

    /// Returns the age of the oldest queued line.
    pub fn oldest_queued_age(&self, now: Instant) -> Option<Duration> {
        self.queued_lines
            .front()
            .map(|queued| now.saturating_duration_since(queued.enqueued_at))
    }
}
