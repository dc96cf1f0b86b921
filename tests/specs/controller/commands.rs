// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commands written to the native controller.

use std::sync::Arc;

use crate::prelude::*;

#[tokio::test]
async fn start_and_kill_reach_the_peer() {
    let harness = Harness::new();
    let (controller, mut peer) = harness.connect().await;

    controller.start_process(["--jobid", "job-42"]).await.unwrap();
    controller.kill_process(977).await.unwrap();

    assert_eq!(peer.read_command().await.unwrap().as_deref(), Some("start\t--jobid\tjob-42"));
    assert_eq!(peer.read_command().await.unwrap().as_deref(), Some("kill\t977"));
}

#[tokio::test]
async fn rejected_arguments_never_reach_the_peer() {
    let harness = Harness::new();
    let (controller, mut peer) = harness.connect().await;

    let result = controller.start_process(["--jobid", "job\n42"]).await;
    assert!(matches!(result, Err(ControllerError::Validation(_))));
    controller.start_process(["--jobid", "job-43"]).await.unwrap();

    assert_eq!(peer.read_command().await.unwrap().as_deref(), Some("start\t--jobid\tjob-43"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_arrive_whole() {
    let harness = Harness::new();
    let (controller, mut peer) = harness.connect().await;
    let controller = Arc::new(controller);

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller.start_process(["--jobid".to_string(), format!("job-{i}")]).await
            })
        })
        .collect();

    let mut seen = Vec::new();
    for _ in 0..8 {
        seen.push(peer.read_command().await.unwrap().unwrap());
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    seen.sort();
    let mut expected: Vec<_> = (0..8).map(|i| format!("start\t--jobid\tjob-{i}")).collect();
    expected.sort();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn close_releases_pipes() {
    let harness = Harness::new();
    let (controller, mut peer) = harness.connect().await;

    controller.close().await;

    assert_eq!(peer.read_command().await.unwrap(), None);
    assert_eq!(std::fs::read_dir(harness.dir.path()).unwrap().count(), 0);
    assert!(matches!(controller.start_process(["x"]).await, Err(ControllerError::Closed)));
}
