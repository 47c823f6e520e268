// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup wiring and graceful shutdown.

use crate::auth::AuthGate;
use crate::config::{ConfigError, DaemonConfig, ServiceMode};
use crate::http::{router, AppState};
use ft_engine::{spawn_retention, JobManager, WorkerPool};
use ft_trainers::{
    AdapterTrainer, ContinuousTrainer, DatasetAssemblyTrainer, FeedbackProvider,
    JsonlFeedbackQueue, JsonlIndexSearch, SearchProvider, TrainerRegistry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// How often the retention sweep runs.
const SWEEP_EVERY: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("bind failure on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server failure: {0}")]
    Serve(#[from] std::io::Error),
}

/// Build the trainer registry for the configured service mode.
fn build_registry(config: &DaemonConfig) -> TrainerRegistry {
    let search: Option<Arc<dyn SearchProvider>> = config
        .search_index
        .as_ref()
        .map(|path| Arc::new(JsonlIndexSearch::new(path)) as Arc<dyn SearchProvider>);
    let feedback: Option<Arc<dyn FeedbackProvider>> = config
        .feedback_path
        .as_ref()
        .map(|path| Arc::new(JsonlFeedbackQueue::new(path)) as Arc<dyn FeedbackProvider>);

    let mut registry = TrainerRegistry::new();
    if matches!(config.mode, ServiceMode::Training | ServiceMode::All) {
        registry.register(Arc::new(AdapterTrainer::lora(config.export_root.clone())));
        registry.register(Arc::new(AdapterTrainer::qlora(config.export_root.clone())));
        registry.register(Arc::new(ContinuousTrainer::new(
            config.export_root.clone(),
            feedback,
        )));
    }
    if matches!(config.mode, ServiceMode::Dataset | ServiceMode::All) {
        registry.register(Arc::new(DatasetAssemblyTrainer::new(
            config.export_root.clone(),
            search,
            config.document_root.clone(),
        )));
    }
    registry
}

/// Run the daemon until ctrl-c, then drain.
pub async fn run(config: DaemonConfig) -> Result<(), LifecycleError> {
    let registry = Arc::new(build_registry(&config));
    let manager = JobManager::new(config.engine.clone(), registry);
    let pool = WorkerPool::spawn(manager.clone());

    let shutdown = CancellationToken::new();
    let retention = spawn_retention(manager.clone(), SWEEP_EVERY, shutdown.clone());

    let auth = AuthGate::new(
        config.auth_mode,
        config.jwt_secret.as_deref(),
        config.issuer.as_deref(),
        config.mock_roles.clone(),
    );
    let state = Arc::new(AppState {
        manager: manager.clone(),
        auth,
        mode: config.mode,
        started_at: Instant::now(),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await.map_err(|source| {
        LifecycleError::Bind { addr: config.bind_addr.clone(), source }
    })?;
    info!(
        addr = %config.bind_addr,
        service = %config.mode,
        workers = config.engine.workers,
        auth = %config.auth_mode,
        "daemon listening"
    );

    let server_shutdown = shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                () = server_shutdown.cancelled() => {}
            }
        })
        .await?;

    // Connections are gone; drain the engine.
    info!("shutting down: draining workers");
    shutdown.cancel();
    manager.shutdown();
    pool.join().await;
    let _ = retention.await;
    info!("daemon stopped");
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
