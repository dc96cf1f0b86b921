// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! What the supervisor knows after the native controller dies.

use crate::prelude::*;

#[tokio::test]
async fn exit_leaves_recent_errors_and_refuses_new_processes() {
    let harness = Harness::new();
    let (controller, mut peer) = harness.connect().await;

    peer.banner("6.2.0", "abc123ef").await.unwrap();
    for i in 1..=6 {
        peer.log(Level::Error, &format!("allocation failed {i}")).await.unwrap();
    }
    peer.log(Level::Fatal, "giving up").await.unwrap();
    drop(peer);

    let end = controller.log_stream().wait_for_stream_end(Duration::from_secs(5)).await.unwrap();
    assert_eq!(end, StreamEnd::Eof);
    assert!(controller.log_stream().seen_fatal());
    assert_eq!(
        controller.errors(),
        "allocation failed 3\nallocation failed 4\nallocation failed 5\nallocation failed 6\ngiving up"
    );

    match controller.start_process(["--jobid", "job-1"]).await {
        Err(ControllerError::Stopped { command }) => assert_eq!(command, "start --jobid job-1"),
        other => panic!("expected stopped, got {other:?}"),
    }
}

#[tokio::test]
async fn exit_before_banner_fails_identity_query() {
    let harness = Harness::new();
    let (controller, peer) = harness.connect().await;

    drop(peer);

    let result = controller.native_code_info().await;
    assert!(matches!(result, Err(ControllerError::StreamEnded)));
}

#[tokio::test]
async fn close_fails_a_pending_identity_query() {
    let harness = Harness::new();
    let (controller, _peer) = harness.connect().await;
    let controller = std::sync::Arc::new(controller);

    let query = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.native_code_info().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    controller.close().await;

    let result = tokio::time::timeout(Duration::from_secs(1), query).await.unwrap().unwrap();
    assert!(matches!(result, Err(ControllerError::Closed)));
}
