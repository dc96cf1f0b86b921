// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The host-wide controller registry over real pipes.

use std::sync::Arc;

use crate::prelude::*;

#[tokio::test]
async fn first_use_connects_and_later_uses_share_the_controller() {
    let harness = Harness::new();
    let registry = ControllerRegistry::new();

    let (first, mut peer) = tokio::join!(registry.get(&harness.config), harness.accept_peer());
    let first = first.unwrap().unwrap();
    let second = registry.get(&harness.config).await.unwrap().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.state(), RegistryState::Ready);

    peer.banner("6.2.0", "abc123ef").await.unwrap();
    assert_eq!(second.native_code_info().await.unwrap().build_hash, "abc123ef");

    registry.shutdown().await;
    assert!(first.is_closed());
}

#[tokio::test]
async fn disabled_native_code_means_no_controller() {
    let harness = Harness::new();
    let registry = ControllerRegistry::new();
    let config = harness.config.clone().enabled(false);

    assert!(registry.get(&config).await.unwrap().is_none());
    assert_eq!(std::fs::read_dir(harness.dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn failed_connect_is_not_retried() {
    let harness = Harness::new();
    let registry = ControllerRegistry::new();
    let config = harness.config.clone().connect_timeout(Duration::from_millis(50));

    assert!(matches!(registry.get(&config).await, Err(ControllerError::ConnectTimeout { .. })));
    assert!(matches!(registry.state(), RegistryState::Failed(_)));
    assert!(matches!(registry.get(&config).await, Err(ControllerError::RegistryFailed(_))));
}
