// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted trainers for engine and scenario tests.

use crate::adapter::{ProgressSink, RunOutcome, TrainerAdapter, TrainerError, TrainerRequest};
use ft_core::{ErrorKind, JobError, ProgressDelta, TrainerKind};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What a scripted trainer does when invoked.
#[derive(Debug, Clone)]
pub enum Script {
    /// Report `steps` progress ticks of `step_delay` each, then complete
    /// with an `adapter` artifact.
    Complete { steps: u64, step_delay: Duration },
    /// Fail immediately with the given detail.
    Fail { kind: ErrorKind, message: String },
    /// Check the token between ticks and unwind cooperatively.
    CooperativeCancel { step_delay: Duration },
    /// Ignore the token entirely and run for the full duration.
    IgnoreCancel { run_for: Duration },
}

/// A trainer whose behaviour is fixed at construction.
pub struct ScriptedTrainer {
    kind: TrainerKind,
    script: Script,
}

impl ScriptedTrainer {
    pub fn new(kind: TrainerKind, script: Script) -> Self {
        Self { kind, script }
    }

    /// Quick completion with a couple of progress ticks.
    pub fn instant(kind: TrainerKind) -> Self {
        Self::new(kind, Script::Complete { steps: 2, step_delay: Duration::from_millis(1) })
    }

    fn artifacts() -> BTreeMap<String, String> {
        let mut artifacts = BTreeMap::new();
        artifacts.insert("adapter".to_string(), "out://adapter".to_string());
        artifacts
    }
}

#[async_trait::async_trait]
impl TrainerAdapter for ScriptedTrainer {
    fn kind(&self) -> TrainerKind {
        self.kind
    }

    async fn validate(&self, _request: &TrainerRequest) -> Result<(), TrainerError> {
        Ok(())
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        _request: &TrainerRequest,
        sink: &dyn ProgressSink,
    ) -> RunOutcome {
        match &self.script {
            Script::Complete { steps, step_delay } => {
                for done in 1..=*steps {
                    tokio::select! {
                        _ = cancel.cancelled() => return RunOutcome::Cancelled,
                        _ = tokio::time::sleep(*step_delay) => {}
                    }
                    sink.report(
                        ProgressDelta::steps(done, *steps)
                            .metric("loss", 1.0 / done as f64),
                    );
                }
                RunOutcome::completed(Self::artifacts())
            }
            Script::Fail { kind, message } => {
                RunOutcome::failed(JobError::new(*kind, message.clone()))
            }
            Script::CooperativeCancel { step_delay } => {
                let mut done = 0u64;
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => return RunOutcome::Cancelled,
                        _ = tokio::time::sleep(*step_delay) => {}
                    }
                    done += 1;
                    sink.report(ProgressDelta::steps(done, 0));
                }
            }
            Script::IgnoreCancel { run_for } => {
                tokio::time::sleep(*run_for).await;
                RunOutcome::completed(Self::artifacts())
            }
        }
    }
}
