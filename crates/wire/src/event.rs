// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live-update stream frames.

use ft_core::{ErrorKind, Progress, ProgressEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Progress snapshot as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressWire {
    pub epochs_done: u32,
    pub epochs_total: u32,
    pub steps_done: u64,
    pub steps_total: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub last_metrics: BTreeMap<String, f64>,
    pub updated_at_ms: u64,
}

impl From<&Progress> for ProgressWire {
    fn from(p: &Progress) -> Self {
        Self {
            epochs_done: p.epochs_done,
            epochs_total: p.epochs_total,
            steps_done: p.steps_done,
            steps_total: p.steps_total,
            last_metrics: p.last_metrics.clone(),
            updated_at_ms: p.updated_at_ms,
        }
    }
}

/// One event frame. Terminal frames carry artifacts or an error tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEventWire {
    pub job_id: String,
    pub status: String,
    pub seq: u64,
    pub progress: ProgressWire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_refs: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl From<&ProgressEvent> for ProgressEventWire {
    fn from(event: &ProgressEvent) -> Self {
        Self {
            job_id: event.job_id.to_string(),
            status: event.status.to_string(),
            seq: event.seq,
            progress: (&event.progress).into(),
            artifact_refs: event.artifact_refs.clone(),
            error_kind: event.error_kind,
        }
    }
}

/// Envelope for everything sent down a live-update connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    /// A progress event.
    Event(ProgressEventWire),
    /// The subscription ended abnormally; the connection closes after this.
    Error { error: ErrorKind, message: String },
    /// The subscription ended normally (single-job stream reached terminal,
    /// or the service is shutting down).
    End,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
