use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use stream_reveal::ChannelSink;
use stream_reveal::SinkEvent;
use stream_reveal::StreamConfig;
use stream_reveal::StreamController;
use stream_reveal::StreamPhase;
use stream_reveal::StreamSink;
use stream_reveal::TokioTickScheduler;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::time::FutureExt;

#[derive(Clone, Debug)]
enum HostEvent {
    CommitTick,
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn draining_stream_reveals_one_line_per_period() {
    let config = StreamConfig::from_toml_str("commit_tick_interval_ms = 40").expect("config");
    let (host_tx, mut host_rx) = mpsc::unbounded_channel();
    let mut controller =
        StreamController::new(&config, TokioTickScheduler::new(host_tx, HostEvent::CommitTick));
    let (sink_tx, mut sink_rx) = mpsc::unbounded_channel();
    let sink: Arc<dyn StreamSink> = Arc::new(ChannelSink::new(sink_tx));

    controller.begin(&sink);
    controller.push_and_maybe_commit("alpha\nbeta\n");
    controller.push_and_maybe_commit("gamma");
    assert!(!controller.finalize(false));
    assert_eq!(controller.phase(), StreamPhase::Draining);

    let started = Instant::now();
    let mut reveal_times = Vec::new();
    loop {
        let event = host_rx
            .recv()
            .timeout(Duration::from_secs(1))
            .await
            .expect("timed out waiting for a commit tick");
        let Some(HostEvent::CommitTick) = event else {
            panic!("tick channel closed");
        };
        reveal_times.push(started.elapsed());
        if controller.on_commit_tick() {
            break;
        }
    }

    assert_eq!(
        reveal_times,
        vec![
            Duration::from_millis(40),
            Duration::from_millis(80),
            Duration::from_millis(120),
        ]
    );
    assert_eq!(controller.phase(), StreamPhase::Idle);
    assert!(!controller.is_animating());

    let mut events = Vec::new();
    while let Ok(event) = sink_rx.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            SinkEvent::StartAnimation,
            SinkEvent::InsertLines(vec!["alpha".to_string()]),
            SinkEvent::InsertLines(vec!["beta".to_string()]),
            SinkEvent::InsertLines(vec!["gamma".to_string()]),
            SinkEvent::StopAnimation,
        ]
    );
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn clear_all_stops_the_tick_task() {
    let (host_tx, mut host_rx) = mpsc::unbounded_channel();
    let mut controller = StreamController::new(
        &StreamConfig::default(),
        TokioTickScheduler::new(host_tx, HostEvent::CommitTick),
    );
    let sink: Arc<dyn StreamSink> = Arc::new(ChannelSink::new(mpsc::unbounded_channel().0));

    controller.begin(&sink);
    controller.push_and_maybe_commit("queued\n");
    assert!(controller.is_animating());
    controller.clear_all();
    assert!(!controller.is_animating());

    tokio::time::advance(Duration::from_millis(500)).await;
    let after_clear = host_rx.recv().timeout(Duration::from_millis(200)).await;
    assert!(after_clear.is_err(), "tick delivered after clear_all");
}
