// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! nctld: hosts the native controller.
//!
//! Connects to (and optionally launches) the native controller, reports
//! its identity, and keeps its log flowing into the host log until Ctrl-C
//! or until the controller exits.

use anyhow::{Context, Result};
use nctl_supervisor::{env, Config, ControllerError, ControllerRegistry, ControllerSpawner, StreamEnd};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

fn setup_logging(config: &Config) -> Result<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    std::fs::create_dir_all(&config.state_dir)
        .with_context(|| format!("creating {}", config.state_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&config.state_dir, "nctld.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false);
    let stdout_layer = (!env::quiet()).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry().with(env_filter).with(stdout_layer).with(file_layer).init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();
    let _guard = setup_logging(&config)?;
    info!(
        enabled = config.enabled,
        pipe_dir = %config.pipe_dir.display(),
        log = %config.log_path().display(),
        "nctld starting"
    );

    // Held so the controller is killed if nctld exits first.
    let _child = if config.enabled && config.spawn_controller {
        let endpoints = config.naming().controller();
        Some(ControllerSpawner::from_config(&config).spawn(&endpoints)?)
    } else {
        None
    };

    let registry = ControllerRegistry::global();
    let Some(controller) =
        registry.get(&config).await.context("connecting to native controller")?
    else {
        info!("native controller disabled, nothing to supervise");
        return Ok(());
    };

    match controller.native_code_info().await {
        Ok(info) => info!(
            pid = info.pid,
            version = %info.version,
            build = %info.build_hash,
            "native controller running"
        ),
        Err(e @ ControllerError::ProtocolMismatch { .. }) => {
            registry.shutdown().await;
            return Err(e).context("native controller is from an incompatible build");
        }
        Err(e) => warn!(error = %e, "could not identify native controller"),
    }

    let end = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            None
        }
        end = controller.log_stream().ended() => Some(end),
    };

    registry.shutdown().await;

    match end {
        Some(StreamEnd::Eof | StreamEnd::Failed) => {
            let errors = controller.errors();
            if errors.is_empty() {
                error!("native controller exited");
            } else {
                error!(%errors, "native controller exited");
            }
            anyhow::bail!("native controller exited")
        }
        _ => {
            info!("nctld stopped");
            Ok(())
        }
    }
}
