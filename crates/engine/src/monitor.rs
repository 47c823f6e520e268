// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic retention sweep.

use crate::manager::JobManager;
use ft_core::Clock;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Spawn the background task that evicts expired terminal jobs.
///
/// The sweep interval is independent of the retention window; sweeping is
/// idempotent and cheap, so erring frequent is fine.
pub fn spawn_retention<C: Clock>(
    manager: JobManager<C>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    manager.sweep_retention();
                    let metrics = manager.metrics();
                    debug!(
                        queued = metrics.jobs_queued,
                        running = metrics.jobs_running,
                        queue_depth = metrics.queue_depth,
                        subscribers = metrics.subscribers,
                        "engine gauges"
                    );
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
