//! Timer sources that pace commit-tick animation.
//!
//! The controller never sleeps. When it has queued lines it asks its [`CommitTickScheduler`] for a
//! periodic tick source and keeps the returned [`TickGuard`] for as long as ticks are wanted.
//! Dropping the guard stops the source. Ticks are delivered by the host, which calls
//! [`StreamController::on_commit_tick`](super::controller::StreamController::on_commit_tick) when
//! one arrives. This keeps every state change on the host's event loop.
//!
//! Two schedulers are provided:
//! - [`TokioTickScheduler`] spawns one task per started source that sends a host event on an
//!   unbounded channel every period.
//! - [`ManualTickScheduler`] only records whether a source is running; the caller ticks by hand.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::MissedTickBehavior;

/// Starts periodic tick sources for one controller.
pub trait CommitTickScheduler {
    /// Start a tick source firing every `period`. Ticks stop when the guard is dropped.
    fn start(&self, period: Duration) -> TickGuard;
}

/// Keeps a tick source alive; dropping it stops the source.
#[must_use = "dropping the guard stops the tick source"]
pub struct TickGuard {
    stop: Option<Box<dyn FnOnce()>>,
}

impl TickGuard {
    pub fn new(stop: impl FnOnce() + 'static) -> Self {
        Self {
            stop: Some(Box::new(stop)),
        }
    }
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }
}

impl fmt::Debug for TickGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickGuard")
            .field("active", &self.stop.is_some())
            .finish()
    }
}

/// Sends a clone of `event` on `tx` once per period from a spawned tokio task.
///
/// [`CommitTickScheduler::start`] must be called from within a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioTickScheduler<E> {
    tx: UnboundedSender<E>,
    event: E,
}

impl<E> TokioTickScheduler<E> {
    pub fn new(tx: UnboundedSender<E>, event: E) -> Self {
        Self { tx, event }
    }
}

impl<E> CommitTickScheduler for TokioTickScheduler<E>
where
    E: Clone + Send + 'static,
{
    fn start(&self, period: Duration) -> TickGuard {
        let tx = self.tx.clone();
        let event = self.event.clone();
        let handle = tokio::spawn(async move {
            // The first tick fires one period after start, not immediately.
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(event.clone()).is_err() {
                    tracing::debug!("commit tick receiver dropped; stopping tick task");
                    break;
                }
            }
        });
        TickGuard::new(move || handle.abort())
    }
}

/// Scheduler whose ticks are driven by the caller.
///
/// Clones share state, so a host or test can keep one clone to observe the controller's timer.
#[derive(Clone, Debug, Default)]
pub struct ManualTickScheduler {
    running: Arc<AtomicBool>,
    starts: Arc<AtomicUsize>,
}

impl ManualTickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a tick source is currently alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of tick sources started so far.
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::Acquire)
    }
}

impl CommitTickScheduler for ManualTickScheduler {
    fn start(&self, period: Duration) -> TickGuard {
        tracing::trace!(?period, "manual tick source started");
        self.running.store(true, Ordering::Release);
        self.starts.fetch_add(1, Ordering::AcqRel);
        let running = self.running.clone();
        TickGuard::new(move || running.store(false, Ordering::Release))
    }
}
