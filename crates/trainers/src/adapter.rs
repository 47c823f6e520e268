// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The uniform contract every trainer kind implements.

use ft_core::{DatasetDescriptor, ErrorKind, JobError, JobId, ProgressDelta, TrainerKind};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors surfaced by trainer validation or setup.
///
/// Failures during `run` never propagate as `Err`; they fold into
/// [`RunOutcome::Failed`] so the worker always gets a terminal outcome.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("provider failure: {0}")]
    Provider(String),

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
}

impl TrainerError {
    /// Taxonomy tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrainerError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            TrainerError::Provider(_) | TrainerError::Io(_) | TrainerError::Serde(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Fold into the terminal failure detail stored on a job.
    pub fn into_job_error(self) -> JobError {
        JobError::new(self.kind(), self.to_string())
    }
}

/// Everything a trainer needs to know about the job it is executing.
#[derive(Debug, Clone)]
pub struct TrainerRequest {
    pub job_id: JobId,
    pub kind: TrainerKind,
    pub config_ref: String,
    pub dataset_ref: Option<String>,
}

/// How a trainer run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Work finished; named artifacts were written. Dataset-assembly runs
    /// additionally carry their descriptor.
    Completed {
        artifacts: BTreeMap<String, String>,
        dataset: Option<DatasetDescriptor>,
    },
    /// Work failed deterministically.
    Failed { error: JobError },
    /// The cancellation token fired and the trainer unwound.
    Cancelled,
}

impl RunOutcome {
    pub fn completed(artifacts: BTreeMap<String, String>) -> Self {
        RunOutcome::Completed { artifacts, dataset: None }
    }

    pub fn failed(error: JobError) -> Self {
        RunOutcome::Failed { error }
    }
}

/// Destination for progress reports.
///
/// Implemented by the engine with a handle back into the manager; reporting
/// is synchronous and never blocks on I/O.
pub trait ProgressSink: Send + Sync {
    fn report(&self, delta: ProgressDelta);
}

/// Sink that discards everything. Useful for validation paths and tests.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _delta: ProgressDelta) {}
}

/// Rate limiter for mid-epoch reports.
///
/// Boundary reports (epoch/pass/export complete) should bypass the gate;
/// tight step loops call [`ReportGate::permit`] and skip reporting when it
/// returns false, keeping the fan-out at roughly one event per second.
pub struct ReportGate {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl ReportGate {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last: Mutex::new(None) }
    }

    /// One event per second, the recommended pacing.
    pub fn per_second() -> Self {
        Self::new(Duration::from_secs(1))
    }

    pub fn permit(&self) -> bool {
        let mut last = self.last.lock();
        let now = Instant::now();
        match *last {
            Some(prev) if now.duration_since(prev) < self.min_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

/// The contract implemented once per trainer kind.
#[async_trait::async_trait]
pub trait TrainerAdapter: Send + Sync {
    fn kind(&self) -> TrainerKind;

    /// Cheap structural checks on the configuration document. No heavy I/O.
    async fn validate(&self, request: &TrainerRequest) -> Result<(), TrainerError>;

    /// Perform the work, checking `cancel` at safe points (at minimum
    /// between epochs and between output chunks) and reporting progress
    /// through `sink` at natural boundaries.
    async fn run(
        &self,
        cancel: CancellationToken,
        request: &TrainerRequest,
        sink: &dyn ProgressSink,
    ) -> RunOutcome;
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
