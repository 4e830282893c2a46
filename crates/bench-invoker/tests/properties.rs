//! Behavioural properties of invokers sharing one channel.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use assert_matches::assert_matches;
use parking_lot::Mutex;
use proptest::prelude::*;
use tokio::sync::mpsc;

use bench_channel::SharedChannel;
use bench_core::{CommandDef, CommandMessage, CorrelationToken};
use bench_invoker::{BufferSink, CommandInvoker, InvokerError, OutputSink, Outcome, RunState, fault_line};

struct Panel {
    invoker: Arc<CommandInvoker>,
    sink: Arc<BufferSink>,
}

fn panel(channel: &SharedChannel, token: &str) -> Panel {
    let sink = Arc::new(BufferSink::new());
    let invoker = CommandInvoker::with_token(
        CorrelationToken::from_string(token),
        CommandDef::script("Sample", "/sample/sh-test.mjs").with_args(true),
        Arc::new(channel.clone()),
        sink.clone(),
    );
    Panel { invoker, sink }
}

fn drain(rx: &mut mpsc::Receiver<CommandMessage>) -> Vec<CommandMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

// ── Isolation ──

proptest! {
    #[test]
    fn chunks_only_reach_their_owner(
        deliveries in prop::collection::vec((0_usize..4, "[a-z]{1,8}"), 0..40)
    ) {
        let (channel, _rx) = SharedChannel::new(8);
        let tokens = ["P0:a", "P1:b", "P2:c"];
        let panels: Vec<_> = tokens.iter().map(|t| panel(&channel, t)).collect();
        for p in &panels {
            p.invoker.run().unwrap();
        }

        let mut expected: Vec<Vec<String>> = vec![Vec::new(); tokens.len()];
        for (idx, body) in &deliveries {
            // Index 3 stands for a token nobody holds.
            let reference = tokens.get(*idx).copied().unwrap_or("X:zzz");
            let _ = channel.deliver(&CommandMessage::chunk(reference, body.clone()));
            if let Some(lines) = expected.get_mut(*idx) {
                lines.push(body.clone());
            }
        }

        for (p, lines) in panels.iter().zip(&expected) {
            prop_assert_eq!(&p.sink.lines(), lines);
            prop_assert_eq!(p.invoker.state(), RunState::Running);
        }
    }
}

#[test]
fn terminal_for_one_leaves_others_running() {
    let (channel, _rx) = SharedChannel::new(8);
    let a = panel(&channel, "A:1");
    let b = panel(&channel, "B:2");
    a.invoker.run().unwrap();
    b.invoker.run().unwrap();

    let _ = channel.deliver(&CommandMessage::failure("A:1", "boom"));
    assert_eq!(a.invoker.state(), RunState::Idle);
    assert_eq!(b.invoker.state(), RunState::Running);
    assert!(b.sink.is_empty());
}

// ── Single flight ──

#[test]
fn at_most_one_request_per_running_invoker() {
    let (channel, mut rx) = SharedChannel::new(8);
    let p = panel(&channel, "V1:xyz");
    p.invoker.run().unwrap();
    for _ in 0..5 {
        assert_matches!(p.invoker.run(), Err(InvokerError::AlreadyRunning));
    }
    assert_eq!(drain(&mut rx).len(), 1);

    let _ = channel.deliver(&CommandMessage::success("V1:xyz"));
    p.invoker.run().unwrap();
    assert_eq!(drain(&mut rx).len(), 1);
}

#[test]
fn concurrent_runs_send_exactly_once() {
    let (channel, mut rx) = SharedChannel::new(64);
    let p = panel(&channel, "V1:xyz");

    let accepted = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| p.invoker.run().is_ok()))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count()
    });

    assert_eq!(accepted, 1);
    assert_eq!(drain(&mut rx).len(), 1);
}

// ── Idempotent termination ──

#[test]
fn second_terminal_is_a_noop() {
    let (channel, _rx) = SharedChannel::new(8);
    let p = panel(&channel, "V1:xyz");
    p.invoker.run().unwrap();

    let _ = channel.deliver(&CommandMessage::success("V1:xyz"));
    let after_first = p.sink.lines();
    let _ = channel.deliver(&CommandMessage::success("V1:xyz"));
    let _ = channel.deliver(&CommandMessage::failure("V1:xyz", "late error"));
    let _ = channel.broadcast_fault("late fault");
    let _ = channel.deliver(&CommandMessage::chunk("V1:xyz", "late chunk"));

    assert_eq!(p.sink.lines(), after_first);
    assert_eq!(p.invoker.last_outcome(), Some(Outcome::Succeeded));
}

// ── Global fault fan-out ──

#[test]
fn fault_terminates_every_running_invoker() {
    let (channel, _rx) = SharedChannel::new(8);
    let panels: Vec<_> = ["P0:a", "P1:b", "P2:c"].iter().map(|t| panel(&channel, t)).collect();
    let idle = panel(&channel, "P3:d");
    for p in &panels {
        p.invoker.run().unwrap();
    }

    assert_eq!(channel.broadcast_fault("connection closed"), 4);

    let expected = "Connection error [connection closed] the shared connection was closed.";
    for p in &panels {
        assert_eq!(p.invoker.state(), RunState::Idle);
        assert_eq!(p.sink.lines(), vec![expected.to_string()]);
    }
    assert!(idle.sink.is_empty());
    assert!(idle.invoker.last_outcome().is_none());
}

#[test]
fn wire_fault_wins_over_status() {
    let (channel, _rx) = SharedChannel::new(8);
    let p = panel(&channel, "A:1");
    p.invoker.run().unwrap();

    let fault = CommandMessage::from_json(r#"{"reference":"server.global","status":"success","error":"gone"}"#)
        .unwrap();
    let _ = channel.deliver(&fault);
    assert_eq!(p.invoker.last_outcome(), Some(Outcome::Faulted("gone".into())));
}

// ── Worked scenario ──

#[test]
fn help_run_streams_then_finishes() {
    let (channel, mut rx) = SharedChannel::new(8);
    let p = panel(&channel, "V1:xyz");
    assert!(p.invoker.set_args("-h"));
    p.invoker.run().unwrap();

    let sent = drain(&mut rx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reference, "V1:xyz");
    assert_eq!(sent[0].args_src, "-h");
    assert_eq!(p.invoker.state(), RunState::Running);

    let _ = channel.deliver(&CommandMessage::chunk("V1:xyz", "usage:\n"));
    let _ = channel.deliver(&CommandMessage::chunk("V1:xyz", "  -h  show help\n"));
    let _ = channel.deliver(&CommandMessage::chunk("V2:abc", "someone else\n"));
    assert_eq!(p.sink.lines(), vec!["usage:\n".to_string(), "  -h  show help\n".to_string()]);
    assert_eq!(p.invoker.state(), RunState::Running);

    let _ = channel.deliver(&CommandMessage::success("V1:xyz"));
    assert_eq!(
        p.sink.lines(),
        vec![
            "usage:\n".to_string(),
            "  -h  show help\n".to_string(),
            "Command finished: [success] [runjs /sample/sh-test.mjs]".to_string(),
        ]
    );
    assert_eq!(p.invoker.state(), RunState::Idle);
}

// ── Registration lifetime ──

#[test]
fn dropped_invoker_stops_receiving() {
    let (channel, _rx) = SharedChannel::new(8);
    let keep = panel(&channel, "A:1");
    let gone = panel(&channel, "B:2");
    keep.invoker.run().unwrap();
    gone.invoker.run().unwrap();
    let gone_sink = gone.sink.clone();
    drop(gone);

    assert_eq!(channel.dispatcher().listener_count(), 1);
    assert_eq!(channel.deliver(&CommandMessage::chunk("B:2", "x")), 0);
    assert_eq!(channel.broadcast_fault("down"), 1);
    assert!(gone_sink.is_empty());
    assert_eq!(keep.invoker.last_outcome(), Some(Outcome::Faulted("down".into())));
}

// ── Output ordering across threads ──

/// Buffer whose appends take a while, widening any gap between the state
/// change and the line landing.
struct SlowSink {
    inner: BufferSink,
    delay: Duration,
}

impl OutputSink for SlowSink {
    fn append(&self, line: &str) {
        std::thread::sleep(self.delay);
        self.inner.append(line);
    }

    fn clear(&self) {
        self.inner.clear();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn terminal_line_lands_before_idle_is_visible() {
    let (channel, _rx) = SharedChannel::new(8);
    let sink = Arc::new(SlowSink {
        inner: BufferSink::new(),
        delay: Duration::from_millis(100),
    });
    let invoker = CommandInvoker::with_token(
        CorrelationToken::from_string("V1:xyz"),
        CommandDef::script("A", "/a.mjs"),
        Arc::new(channel.clone()),
        sink.clone(),
    );
    invoker.run().unwrap();

    let transport = std::thread::spawn(move || {
        let _ = channel.deliver(&CommandMessage::success("V1:xyz"));
    });
    invoker.wait_until_idle().await;

    assert_eq!(sink.inner.lines(), vec!["Command finished: [success] [runjs /a.mjs]".to_string()]);
    transport.join().unwrap();
}

/// Fires a connection fault from another thread the first time the invoker
/// clears its output, then lingers inside `clear`.
struct FaultDuringClear {
    inner: BufferSink,
    channel: Mutex<Option<SharedChannel>>,
    fault: Mutex<Option<JoinHandle<()>>>,
}

impl OutputSink for FaultDuringClear {
    fn append(&self, line: &str) {
        self.inner.append(line);
    }

    fn clear(&self) {
        if let Some(channel) = self.channel.lock().take() {
            let handle = std::thread::spawn(move || {
                let _ = channel.broadcast_fault("connection reset");
            });
            *self.fault.lock() = Some(handle);
            std::thread::sleep(Duration::from_millis(50));
        }
        self.inner.clear();
    }
}

#[test]
fn fault_racing_run_start_is_not_erased() {
    let (channel, _rx) = SharedChannel::new(8);
    let sink = Arc::new(FaultDuringClear {
        inner: BufferSink::new(),
        channel: Mutex::new(Some(channel.clone())),
        fault: Mutex::new(None),
    });
    let invoker = CommandInvoker::with_token(
        CorrelationToken::from_string("V1:xyz"),
        CommandDef::script("A", "/a.mjs"),
        Arc::new(channel),
        sink.clone(),
    );

    invoker.run().unwrap();
    let fault = sink.fault.lock().take().unwrap();
    fault.join().unwrap();

    assert_eq!(invoker.state(), RunState::Idle);
    assert_eq!(invoker.last_outcome(), Some(Outcome::Faulted("connection reset".into())));
    assert_eq!(sink.inner.lines(), vec![fault_line("connection reset")]);
}
