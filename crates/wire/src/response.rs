// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound response payloads.

use ft_core::{DatasetDescriptor, ErrorKind, Job, MetricsSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every submit response carries the assigned job ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
}

/// Every error response carries a taxonomy tag and a readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: ErrorKind, message: impl Into<String>) -> Self {
        Self { error, message: message.into() }
    }
}

/// One row of a job listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub trainer_kind: String,
    pub status: String,
    pub priority: u8,
    pub submitted_by: String,
    pub submitted_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            trainer_kind: job.kind.to_string(),
            status: job.status.to_string(),
            priority: job.priority.get(),
            submitted_by: job.submitted_by.clone(),
            submitted_at_ms: job.submitted_at_ms,
            finished_at_ms: job.finished_at_ms,
        }
    }
}

/// Full job record for get calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    pub job_id: String,
    pub trainer_kind: String,
    pub status: String,
    pub priority: u8,
    pub config_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub submitted_by: String,
    pub submitted_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    pub progress: crate::event::ProgressWire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub artifact_refs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetDescriptor>,
}

impl From<&Job> for JobDetail {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            trainer_kind: job.kind.to_string(),
            status: job.status.to_string(),
            priority: job.priority.get(),
            config_ref: job.config_ref.clone(),
            dataset_ref: job.dataset_ref.clone(),
            tags: job.tags.iter().cloned().collect(),
            submitted_by: job.submitted_by.clone(),
            submitted_at_ms: job.submitted_at_ms,
            started_at_ms: job.started_at_ms,
            finished_at_ms: job.finished_at_ms,
            progress: (&job.progress).into(),
            error_kind: job.last_error.as_ref().map(|e| e.kind),
            error_message: job.last_error.as_ref().map(|e| e.message.clone()),
            artifact_refs: job.artifact_refs.clone(),
            dataset: job.dataset.clone(),
        }
    }
}

/// Acknowledgement of a cancel call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub job_id: String,
    /// Status after the cancel was applied or signalled.
    pub status: String,
}

/// Health endpoint body. Open in every auth mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub uptime_ms: u64,
    pub workers: usize,
    pub queue_depth: usize,
}

/// Metrics endpoint body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
