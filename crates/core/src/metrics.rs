// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics snapshot shared between engine and wire crates.

use serde::{Deserialize, Serialize};

/// Point-in-time gauges and counters assembled by the manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub jobs_queued: usize,
    pub jobs_running: usize,
    pub jobs_completed: usize,
    pub jobs_failed: usize,
    pub jobs_cancelled: usize,
    pub queue_depth: usize,
    pub workers_total: usize,
    pub workers_busy: usize,
    pub subscribers: usize,
    /// Total events handed to the fan-out since startup.
    pub events_published: u64,
    /// Intermediate events dropped to keep slow subscribers alive.
    pub events_coalesced: u64,
    /// Subscriptions force-closed for falling behind.
    pub subscribers_force_closed: u64,
}
