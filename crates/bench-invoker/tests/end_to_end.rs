//! Invokers driven over a real WebSocket connection.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::time::timeout;

use bench_channel::{SharedChannel, TransportConfig, TransportExit, connect};
use bench_core::{CommandDef, CommandMessage, CorrelationToken};
use bench_invoker::{BufferSink, CommandInvoker, Outcome, RunState};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn ws_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(serve_socket)
}

/// Echoes the arguments back as one chunk and succeeds. `-fail` produces an
/// error reply; `-hangup` closes the socket while other commands are pending.
async fn serve_socket(mut socket: WebSocket) {
    while let Some(Ok(frame)) = socket.recv().await {
        let Message::Text(text) = frame else { continue };
        let request = CommandMessage::from_json(text.as_str()).unwrap();
        let replies = match request.args_src.as_str() {
            "-hangup" => {
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
            "-wait" => Vec::new(),
            "-fail" => vec![CommandMessage::failure(request.reference.clone(), "bad arguments")],
            args => vec![
                CommandMessage::chunk(request.reference.clone(), format!("args: {args}")),
                CommandMessage::success(request.reference.clone()),
            ],
        };
        for reply in replies {
            let json = reply.to_json().unwrap();
            if socket.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
    }
}

async fn boot() -> (SharedChannel, bench_channel::TransportHandle) {
    let app = Router::new().route("/wsoapi", get(ws_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move { axum::serve(listener, app).await });

    let (channel, outbound) = SharedChannel::new(16);
    let config = TransportConfig::new(format!("ws://{addr}/wsoapi"));
    let handle = connect(&config, &channel, outbound).await.unwrap();
    (channel, handle)
}

fn invoker(channel: &SharedChannel, token: &str, args: &str) -> (Arc<CommandInvoker>, Arc<BufferSink>) {
    let sink = Arc::new(BufferSink::new());
    let invoker = CommandInvoker::with_token(
        CorrelationToken::from_string(token),
        CommandDef::new("Sample", "runjs", "/sample/sh-test.mjs").with_args(true),
        Arc::new(channel.clone()),
        sink.clone(),
    );
    assert!(invoker.set_args(args));
    (invoker, sink)
}

#[tokio::test]
async fn parallel_invokers_each_get_their_own_result() {
    let (channel, handle) = boot().await;
    let (ok, ok_sink) = invoker(&channel, "A:1", "-h");
    let (bad, bad_sink) = invoker(&channel, "B:2", "-fail");

    ok.run().unwrap();
    bad.run().unwrap();
    timeout(TIMEOUT, ok.wait_until_idle()).await.unwrap();
    timeout(TIMEOUT, bad.wait_until_idle()).await.unwrap();

    assert_eq!(
        ok_sink.lines(),
        vec![
            "args: -h".to_string(),
            "Command finished: [success] [runjs /sample/sh-test.mjs]".to_string(),
        ]
    );
    assert_eq!(bad_sink.lines(), vec!["bad arguments".to_string()]);
    assert_eq!(bad.last_outcome(), Some(Outcome::Failed("bad arguments".into())));

    handle.shutdown();
    assert_eq!(handle.join().await, TransportExit::Cancelled);
}

#[tokio::test]
async fn hangup_faults_all_running_invokers() {
    let (channel, handle) = boot().await;
    let (first, first_sink) = invoker(&channel, "A:1", "-wait");
    let (second, second_sink) = invoker(&channel, "B:2", "-wait");
    let (trigger, _trigger_sink) = invoker(&channel, "C:3", "-hangup");

    first.run().unwrap();
    second.run().unwrap();
    trigger.run().unwrap();

    for inv in [&first, &second, &trigger] {
        timeout(TIMEOUT, inv.wait_until_idle()).await.unwrap();
        assert_matches::assert_matches!(inv.last_outcome(), Some(Outcome::Faulted(_)));
    }
    let exit = timeout(TIMEOUT, handle.join()).await.unwrap();
    assert!(exit.fault_reason().is_some(), "got {exit:?}");

    for sink in [&first_sink, &second_sink] {
        let line = sink.last_line().unwrap();
        assert!(line.starts_with("Connection error ["), "got {line}");
        assert!(line.ends_with("] the shared connection was closed."), "got {line}");
    }

    // Nothing can be sent once the transport is gone.
    assert!(first.run().is_err());
    assert_eq!(first.state(), RunState::Idle);
}
