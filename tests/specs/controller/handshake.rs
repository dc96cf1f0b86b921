// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connecting to the native controller and learning who it is.

use crate::prelude::*;

#[tokio::test]
async fn reports_pid_and_version_from_banner() {
    let harness = Harness::new();
    let (controller, mut peer) = harness.connect().await;

    peer.log(Level::Info, "starting up").await.unwrap();
    peer.banner("6.2.0", "abc123ef").await.unwrap();

    let info = controller.native_code_info().await.unwrap();
    assert_eq!(info.pid, PEER_PID);
    assert_eq!(info.version, "6.2.0");
    assert_eq!(info.build_hash, "abc123ef");
    assert_eq!(controller.pid().await.unwrap(), PEER_PID);
}

#[tokio::test]
async fn incompatible_banner_is_reported_as_protocol_mismatch() {
    let harness = Harness::new();
    let (controller, mut peer) = harness.connect().await;

    peer.log(Level::Info, "controller 7.0 Copyright (c) 2026").await.unwrap();

    let result = controller.native_code_info().await;
    assert!(matches!(result, Err(ControllerError::ProtocolMismatch { .. })));
}

#[tokio::test]
async fn connect_times_out_without_a_peer() {
    let harness = Harness::new();
    let config = harness.config.clone().connect_timeout(Duration::from_millis(100));

    let result = ProcessController::connect(&config).await;

    match result {
        Err(ControllerError::ConnectTimeout { endpoint, .. }) => {
            assert_eq!(endpoint, config.naming().controller().log);
        }
        Err(e) => panic!("expected connect timeout, got {e}"),
        Ok(_) => panic!("expected connect timeout, got a controller"),
    }
    assert_eq!(std::fs::read_dir(harness.dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn peer_that_never_opens_the_log_pipe_fails_the_connect() {
    let harness = Harness::new();
    let config = harness.config.clone().connect_timeout(Duration::from_millis(300));
    let endpoints = config.naming().controller();
    let command = endpoints.command.clone().unwrap();

    // Listens on the command pipe but never writes a log.
    let half_peer = async {
        loop {
            match tokio::net::unix::pipe::OpenOptions::new().open_receiver(&command) {
                Ok(reader) => return reader,
                Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
    };
    let (result, _reader) = tokio::join!(ProcessController::connect(&config), half_peer);

    match result {
        Err(ControllerError::ConnectTimeout { endpoint, .. }) => assert_eq!(endpoint, endpoints.log),
        Err(e) => panic!("expected connect timeout, got {e}"),
        Ok(_) => panic!("expected connect timeout, got a controller"),
    }
}

#[tokio::test]
async fn malformed_log_lines_do_not_break_the_stream() {
    let harness = Harness::new();
    let (controller, mut peer) = harness.connect().await;

    peer.log(Level::Info, "before").await.unwrap();
    peer.write_raw(b"{not json at all\n").await.unwrap();
    peer.banner("6.2.0", "abc123ef").await.unwrap();

    assert_eq!(controller.native_code_info().await.unwrap().version, "6.2.0");
    assert_eq!(controller.log_stream().stats().malformed, 1);
}
