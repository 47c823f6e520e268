// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress tracking and the live-update event frame.

use crate::error::ErrorKind;
use crate::job::{JobId, JobStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Last-known progress snapshot for one job.
///
/// Counters never decrease and `updated_at_ms` strictly increases across
/// accepted merges; [`Progress::merge`] enforces both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub epochs_done: u32,
    pub epochs_total: u32,
    pub steps_done: u64,
    pub steps_total: u64,
    /// Most recent metrics snapshot only; not a history.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub last_metrics: BTreeMap<String, f64>,
    pub updated_at_ms: u64,
}

/// Incremental progress report from a trainer.
///
/// Absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epochs_done: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epochs_total: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps_done: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps_total: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, f64>,
}

impl ProgressDelta {
    pub fn epochs(done: u32, total: u32) -> Self {
        Self { epochs_done: Some(done), epochs_total: Some(total), ..Self::default() }
    }

    pub fn steps(done: u64, total: u64) -> Self {
        Self { steps_done: Some(done), steps_total: Some(total), ..Self::default() }
    }

    pub fn with_steps(mut self, done: u64, total: u64) -> Self {
        self.steps_done = Some(done);
        self.steps_total = Some(total);
        self
    }

    pub fn metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.epochs_done.is_none()
            && self.epochs_total.is_none()
            && self.steps_done.is_none()
            && self.steps_total.is_none()
            && self.metrics.is_empty()
    }
}

/// Rejected progress merge.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    /// A counter tried to move backwards.
    #[error("progress counter '{field}' would regress from {current} to {proposed}")]
    WouldRegress { field: &'static str, current: u64, proposed: u64 },
}

impl Progress {
    /// Merge a delta, enforcing monotonicity.
    ///
    /// Counters may only grow; `updated_at_ms` is bumped past its previous
    /// value even when the caller's clock has not advanced, so event
    /// timestamps stay strictly ordered within a job.
    pub fn merge(&mut self, delta: &ProgressDelta, now_ms: u64) -> Result<(), ProgressError> {
        if let Some(v) = delta.epochs_done {
            if v < self.epochs_done {
                return Err(ProgressError::WouldRegress {
                    field: "epochs_done",
                    current: self.epochs_done as u64,
                    proposed: v as u64,
                });
            }
        }
        if let Some(v) = delta.steps_done {
            if v < self.steps_done {
                return Err(ProgressError::WouldRegress {
                    field: "steps_done",
                    current: self.steps_done,
                    proposed: v,
                });
            }
        }

        if let Some(v) = delta.epochs_done {
            self.epochs_done = v;
        }
        if let Some(v) = delta.epochs_total {
            self.epochs_total = v;
        }
        if let Some(v) = delta.steps_done {
            self.steps_done = v;
        }
        if let Some(v) = delta.steps_total {
            self.steps_total = v;
        }
        for (name, value) in &delta.metrics {
            self.last_metrics.insert(name.clone(), *value);
        }
        self.updated_at_ms = now_ms.max(self.updated_at_ms + 1);
        Ok(())
    }
}

/// One frame on a live-update stream.
///
/// `seq` is per-job, monotonic from 0, and is what lets subscribers
/// deduplicate across the bootstrap/live attach boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub seq: u64,
    pub progress: Progress,
    /// Present iff the event is terminal with status `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_refs: Option<BTreeMap<String, String>>,
    /// Present iff the event is terminal with status `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
