// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tunables.

use std::time::Duration;

/// Capacity limits and timing knobs for one engine instance.
///
/// Loaded once at startup; the engine never re-reads configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed worker pool size.
    pub workers: usize,
    /// Queue entries beyond this are rejected at submit.
    pub max_queue_depth: usize,
    /// How long terminal jobs stay queryable after finishing.
    pub retain_terminal_for: Duration,
    /// Grace window between cancellation signal and forced abandonment.
    pub cancel_grace: Duration,
    /// Wall-clock bound on a single run; `None` means unbounded.
    pub job_run_timeout: Option<Duration>,
    /// Live subscriptions beyond this are rejected at attach.
    pub max_subscribers: usize,
    /// Outbound event buffer per subscription before coalescing kicks in.
    pub subscriber_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            max_queue_depth: 256,
            retain_terminal_for: Duration::from_secs(24 * 60 * 60),
            cancel_grace: Duration::from_secs(30),
            job_run_timeout: None,
            max_subscribers: 1024,
            subscriber_buffer: 64,
        }
    }
}
