// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound request payloads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Body of a submit call.
///
/// Shape validation (recognised kind, priority range) happens when this is
/// converted into a core spec at the surface; semantic validation happens in
/// the manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    /// Trainer kind tag, e.g. `"lora"` or `"dataset_assembly"`.
    pub trainer_kind: String,
    pub config_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_ref: Option<String>,
    /// 1..=5, higher runs sooner; omitted means 3.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

/// Query parameters of a list call. Set-valued filters are comma-separated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListJobsQuery {
    /// Comma-separated status tags, e.g. `"queued,running"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Comma-separated trainer kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Query parameters of the live-update endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObserveQuery {
    /// A job ID, or `"*"` / absent for every visible job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
