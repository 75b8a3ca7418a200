//! Rendering-side contract for revealed lines.
//!
//! A [`StreamSink`] receives committed lines in order plus start/stop cues for the reveal
//! animation. Calls are fire-and-forget: nothing the sink does feeds back into the controller.
//! Implementations therefore take `&self` and use their own interior mutability.

use std::io::Write;
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;

/// Consumer of revealed transcript lines.
pub trait StreamSink {
    /// Append `lines` to the visible transcript, in order.
    fn insert_lines(&self, lines: Vec<String>);

    /// Visual cue that a reveal is in progress.
    fn start_animation(&self) {}

    /// Visual cue that the reveal has paused or stopped.
    fn stop_animation(&self) {}
}

/// Sink notification forwarded by [`ChannelSink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    InsertLines(Vec<String>),
    StartAnimation,
    StopAnimation,
}

/// Forwards sink calls over a channel so another task can apply them to the UI.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<SinkEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: SinkEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("sink channel closed; dropping event");
        }
    }
}

impl StreamSink for ChannelSink {
    fn insert_lines(&self, lines: Vec<String>) {
        self.send(SinkEvent::InsertLines(lines));
    }

    fn start_animation(&self) {
        self.send(SinkEvent::StartAnimation);
    }

    fn stop_animation(&self) {
        self.send(SinkEvent::StopAnimation);
    }
}

/// Writes each revealed line, newline-terminated, to an [`io::Write`](std::io::Write).
pub struct WriterSink<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write> StreamSink for WriterSink<W> {
    fn insert_lines(&self, lines: Vec<String>) {
        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(writer, "{line}"))
            .and_then(|()| writer.flush());
        if let Err(err) = result {
            tracing::warn!("failed to write revealed lines: {err}");
        }
    }
}
