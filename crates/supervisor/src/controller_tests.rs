// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::log_stream::CaptureSink;
use nctl_wire::CommandError;
use tokio::io::{duplex, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};

const BANNER: &str = "controller (64 bit): Version 6.2.0 (Build abc123ef) Copyright (c) 2026";

/// The native side of an in-memory controller connection.
struct Peer {
    log: DuplexStream,
    command: DuplexStream,
}

impl Peer {
    async fn log(&mut self, level: &str, pid: u32, message: &str) {
        let line = format!(
            r#"{{"logger":"controller","pid":{pid},"file":"Main.cc","line":1,"level":"{level}","message":"{message}"}}"#
        ) + "\n";
        self.log.write_all(line.as_bytes()).await.unwrap();
    }

    async fn read_commands(self) -> String {
        drop(self.log);
        let mut out = String::new();
        let mut command = self.command;
        command.read_to_string(&mut out).await.unwrap();
        out
    }
}

fn controller() -> (ProcessController, Peer) {
    controller_with(ControllerOptions::default().query_timeout(Duration::from_secs(5)))
}

fn controller_with(options: ControllerOptions) -> (ProcessController, Peer) {
    let (log_tx, log_rx) = duplex(64 * 1024);
    let (command_tx, command_rx) = duplex(64 * 1024);
    let controller = ProcessController::from_streams(log_rx, command_tx, options);
    (controller, Peer { log: log_tx, command: command_rx })
}

#[tokio::test]
async fn start_process_writes_exact_bytes() {
    let (controller, peer) = controller();

    controller.start_process(["--jobid", "job-42"]).await.unwrap();
    controller.close().await;

    assert_eq!(peer.read_commands().await, "start\t--jobid\tjob-42\n");
}

#[tokio::test]
async fn kill_process_sends_decimal_pid() {
    let (controller, peer) = controller();

    controller.kill_process(31337).await.unwrap();
    controller.close().await;

    assert_eq!(peer.read_commands().await, "kill\t31337\n");
}

#[tokio::test]
async fn invalid_argument_is_rejected_without_writing() {
    let (controller, peer) = controller();

    let result = controller.start_process(["--jobid", "job\t42"]).await;
    assert!(matches!(
        result,
        Err(ControllerError::Validation(CommandError::ReservedByte { byte: b'\t', .. }))
    ));
    let result = controller.start_process(["multi\nline"]).await;
    assert!(matches!(result, Err(ControllerError::Validation(_))));

    controller.start_process(["ok"]).await.unwrap();
    controller.close().await;

    assert_eq!(peer.read_commands().await, "start\tok\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_commands_never_interleave() {
    let (controller, peer) = controller();
    let controller = Arc::new(controller);
    let Peer { log: _log, command } = peer;

    let writers: Vec<_> = (0..16)
        .map(|i| {
            let controller = controller.clone();
            tokio::spawn(async move {
                let job = format!("job-{i}-{}", "x".repeat(512));
                controller.start_process(["--jobid".to_string(), job]).await
            })
        })
        .collect();

    let mut lines = BufReader::new(command).lines();
    let mut seen = Vec::new();
    for _ in 0..16 {
        seen.push(lines.next_line().await.unwrap().unwrap());
    }
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    seen.sort();
    let mut expected: Vec<_> =
        (0..16).map(|i| format!("start\t--jobid\tjob-{i}-{}", "x".repeat(512))).collect();
    expected.sort();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn native_code_info_parses_banner() {
    let (controller, mut peer) = controller();
    peer.log("INFO", 4242, BANNER).await;

    let info = controller.native_code_info().await.unwrap();

    assert_eq!(
        info,
        ProcessDescriptor {
            pid: 4242,
            version: "6.2.0".to_string(),
            build_hash: "abc123ef".to_string(),
        }
    );
}

#[tokio::test]
async fn native_code_info_is_cached() {
    let (controller, mut peer) = controller();
    peer.log("INFO", 9, BANNER).await;
    let first = controller.native_code_info().await.unwrap();

    drop(peer);
    controller.log_stream().wait_for_stream_end(Duration::from_secs(1)).await.unwrap();

    assert_eq!(controller.native_code_info().await.unwrap(), first);
}

#[tokio::test]
async fn unexpected_banner_is_a_protocol_mismatch() {
    let (controller, mut peer) = controller();
    peer.log("INFO", 9, "controller Release 7 Copyright (c) 2026").await;

    match controller.native_code_info().await {
        Err(ControllerError::ProtocolMismatch { banner }) => {
            assert_eq!(banner, "controller Release 7 Copyright (c) 2026");
        }
        other => panic!("expected protocol mismatch, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn native_code_info_waits_one_query_timeout_in_total() {
    let (controller, mut peer) =
        controller_with(ControllerOptions::default().query_timeout(Duration::from_secs(10)));

    // The pid shows up late and the banner never does.
    let late = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(8)).await;
        peer.log("INFO", 4242, "starting up").await;
        peer
    });

    let start = tokio::time::Instant::now();
    let result = controller.native_code_info().await;

    assert!(matches!(result, Err(ControllerError::Timeout { .. })), "got {result:?}");
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11), "{elapsed:?}");
    assert_eq!(controller.pid().await.unwrap(), 4242);
    drop(late.await.unwrap());
}

#[tokio::test]
async fn close_unblocks_pending_pid_query() {
    let (controller, _peer) =
        controller_with(ControllerOptions::default().query_timeout(Duration::from_secs(60)));
    let controller = Arc::new(controller);

    let query = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.pid().await })
    };
    tokio::task::yield_now().await;

    let start = std::time::Instant::now();
    controller.close().await;
    let result = tokio::time::timeout(Duration::from_secs(1), query).await.unwrap().unwrap();

    assert!(matches!(result, Err(ControllerError::Closed)));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn close_is_idempotent_and_refuses_commands() {
    let (controller, _peer) = controller();

    controller.close().await;
    controller.close().await;

    assert!(controller.is_closed());
    assert!(matches!(controller.start_process(["x"]).await, Err(ControllerError::Closed)));
}

#[tokio::test]
async fn no_new_processes_after_stream_ends() {
    let (controller, mut peer) = controller();
    peer.log("ERROR", 5, "segfault in worker").await;
    drop(peer.log);
    controller.log_stream().wait_for_stream_end(Duration::from_secs(1)).await.unwrap();

    match controller.start_process(["--jobid", "job-1"]).await {
        Err(ControllerError::Stopped { command }) => assert_eq!(command, "start --jobid job-1"),
        other => panic!("expected stopped, got {other:?}"),
    }
    assert_eq!(controller.errors(), "segfault in worker");
}

#[tokio::test]
async fn broken_command_pipe_is_an_io_error() {
    let (controller, peer) = controller();
    drop(peer.command);

    let result = controller.start_process(["x"]).await;

    assert!(matches!(result, Err(ControllerError::Io(_))));
}

#[tokio::test]
async fn records_reach_the_configured_sink() {
    let sink = Arc::new(CaptureSink::default());
    let (controller, mut peer) = controller_with(ControllerOptions::default().sink(sink.clone()));

    peer.log("DEBUG", 1, "hello").await;
    drop(peer);
    controller.log_stream().wait_for_stream_end(Duration::from_secs(1)).await.unwrap();

    assert_eq!(sink.messages(), vec!["hello"]);
}
