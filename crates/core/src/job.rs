// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and lifecycle state machine.

use crate::clock::Clock;
use crate::dataset::DatasetDescriptor;
use crate::error::ErrorKind;
use crate::progress::{Progress, ProgressEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

crate::define_id! {
    /// Unique identifier for a submitted job.
    ///
    /// Generated at accept time; used to track state, query status,
    /// and reference the job in logs and live-update streams.
    pub struct JobId("job-");
}

/// Which trainer implementation executes a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainerKind {
    /// Epoch-structured low-rank adapter training.
    Lora,
    /// Quantized variant of LoRA training.
    Qlora,
    /// Incremental training over a live feedback buffer.
    Continuous,
    /// Corpus assembly producing dataset exports instead of model artifacts.
    DatasetAssembly,
}

impl TrainerKind {
    pub const ALL: [TrainerKind; 4] =
        [TrainerKind::Lora, TrainerKind::Qlora, TrainerKind::Continuous, TrainerKind::DatasetAssembly];

    /// Training kinds require a dataset reference at submit time.
    pub fn requires_dataset(&self) -> bool {
        matches!(self, TrainerKind::Lora | TrainerKind::Qlora | TrainerKind::Continuous)
    }

    /// Whether this kind produces model artifacts (vs dataset exports).
    pub fn is_training(&self) -> bool {
        !matches!(self, TrainerKind::DatasetAssembly)
    }

    pub fn parse(s: &str) -> Option<TrainerKind> {
        match s {
            "lora" => Some(TrainerKind::Lora),
            "qlora" => Some(TrainerKind::Qlora),
            "continuous" => Some(TrainerKind::Continuous),
            "dataset_assembly" => Some(TrainerKind::DatasetAssembly),
            _ => None,
        }
    }
}

crate::simple_display! {
    TrainerKind {
        Lora => "lora",
        Qlora => "qlora",
        Continuous => "continuous",
        DatasetAssembly => "dataset_assembly",
    }
}

/// Scheduling priority, 1 (lowest) through 5 (highest). Higher runs sooner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const MIN: Priority = Priority(1);
    pub const MAX: Priority = Priority(5);

    pub fn new(value: u8) -> Option<Priority> {
        (1..=5).contains(&value).then_some(Priority(value))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority(3)
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Priority::new(value).ok_or_else(|| format!("priority out of range 1..=5: {}", value))
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> u8 {
        p.0
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a job.
///
/// `Pending` is held only between record creation and enqueue inside a
/// single submit; every observable job is `Queued` or later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal states are sinks; no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }

    pub fn parse(s: &str) -> Option<JobStatus> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "queued" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    /// Legal edges of the lifecycle state machine.
    pub fn can_transition(self, to: JobStatus) -> bool {
        matches!(
            (self, to),
            (JobStatus::Pending, JobStatus::Queued)
                | (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Queued, JobStatus::Cancelled)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Cancelled)
        )
    }
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Terminal failure detail: taxonomy tag plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Validated submission request: everything immutable about a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub kind: TrainerKind,
    /// Location of the trainer-specific configuration document.
    pub config_ref: String,
    /// Input corpus location; required for training kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_ref: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Principal identifier of the submitter.
    pub submitted_by: String,
}

impl JobSpec {
    pub fn new(kind: TrainerKind, config_ref: impl Into<String>) -> Self {
        Self {
            kind,
            config_ref: config_ref.into(),
            dataset_ref: None,
            priority: Priority::default(),
            tags: BTreeSet::new(),
            submitted_by: String::new(),
        }
    }

    pub fn dataset_ref(mut self, r: impl Into<String>) -> Self {
        self.dataset_ref = Some(r.into());
        self
    }

    pub fn priority(mut self, p: Priority) -> Self {
        self.priority = p;
        self
    }

    pub fn tag(mut self, t: impl Into<String>) -> Self {
        self.tags.insert(t.into());
        self
    }

    pub fn submitted_by(mut self, p: impl Into<String>) -> Self {
        self.submitted_by = p.into();
        self
    }
}

/// A job instance: immutable spec plus mutable lifecycle state.
///
/// Only the manager mutates these; workers and trainers see clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: TrainerKind,
    pub config_ref: String,
    pub dataset_ref: Option<String>,
    pub priority: Priority,
    pub tags: BTreeSet<String>,
    pub submitted_by: String,
    pub submitted_at_ms: u64,

    pub status: JobStatus,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
    pub progress: Progress,
    /// Populated only when status is `Failed`.
    pub last_error: Option<JobError>,
    /// Named outputs, populated only when status is `Completed`.
    pub artifact_refs: BTreeMap<String, String>,
    /// Dataset summary, populated on completed dataset-assembly jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetDescriptor>,

    /// Next event sequence number to assign for this job.
    pub seq_next: u64,
    /// Set once a cancel has been requested; sticky until terminal.
    pub cancel_requested: bool,
}

impl Job {
    /// Create a new job record in `Pending` state.
    pub fn new(id: JobId, spec: JobSpec, clock: &impl Clock) -> Self {
        Self::new_at(id, spec, clock.epoch_ms())
    }

    /// Create a new job record with an explicit submission timestamp.
    pub fn new_at(id: JobId, spec: JobSpec, submitted_at_ms: u64) -> Self {
        Self {
            id,
            kind: spec.kind,
            config_ref: spec.config_ref,
            dataset_ref: spec.dataset_ref,
            priority: spec.priority,
            tags: spec.tags,
            submitted_by: spec.submitted_by,
            submitted_at_ms,
            status: JobStatus::Pending,
            started_at_ms: None,
            finished_at_ms: None,
            progress: Progress::default(),
            last_error: None,
            artifact_refs: BTreeMap::new(),
            dataset: None,
            seq_next: 0,
            cancel_requested: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Assign the next event sequence number for this job.
    pub fn bump_seq(&mut self) -> u64 {
        let seq = self.seq_next;
        self.seq_next += 1;
        seq
    }

    /// Sequence number of the most recently emitted event, if any.
    pub fn last_seq(&self) -> Option<u64> {
        self.seq_next.checked_sub(1)
    }

    /// Build the event describing the job's current state.
    ///
    /// Used both for live publication (with a freshly bumped `seq`) and for
    /// bootstrap snapshots (with [`Job::last_seq`]), so late subscribers and
    /// live subscribers see identical frames.
    pub fn snapshot_event(&self, seq: u64) -> ProgressEvent {
        ProgressEvent {
            job_id: self.id,
            status: self.status,
            seq,
            progress: self.progress.clone(),
            artifact_refs: (self.status == JobStatus::Completed)
                .then(|| self.artifact_refs.clone()),
            error_kind: self.last_error.as_ref().map(|e| e.kind),
        }
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            config_ref: String = "cfg/test.toml",
            submitted_by: String = "test-user",
        }
        set {
            kind: TrainerKind = TrainerKind::Lora,
            priority: Priority = Priority::default(),
            tags: BTreeSet<String> = BTreeSet::new(),
            submitted_at_ms: u64 = 1_000_000,
            status: JobStatus = JobStatus::Queued,
            progress: Progress = Progress::default(),
            artifact_refs: BTreeMap<String, String> = BTreeMap::new(),
            seq_next: u64 = 1,
            cancel_requested: bool = false,
        }
        option {
            dataset_ref: String = Some("data/corpus".to_string()),
            started_at_ms: u64 = None,
            finished_at_ms: u64 = None,
            last_error: JobError = None,
            dataset: DatasetDescriptor = None,
        }
        computed {
            id: JobId = JobId::new(),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
