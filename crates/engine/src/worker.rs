// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bounded worker pool.
//!
//! Each worker loops: block on the queue, claim the job, drive the trainer
//! to a terminal outcome, report it back to the manager. A worker never
//! dies — trainer panics, cancellation timeouts, and run timeouts all
//! collapse into terminal transitions and the worker returns to the loop.

use crate::manager::{ClaimedJob, JobManager, TerminalOutcome};
use crate::reporter::ProgressReporter;
use ft_core::{Clock, ErrorKind, JobError};
use ft_trainers::{RunOutcome, TrainerAdapter, TrainerRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info};

/// Handle to the spawned workers.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn the configured number of workers against a manager.
    pub fn spawn<C: Clock>(manager: JobManager<C>) -> Self {
        let count = manager.config().workers.max(1);
        let handles = (0..count)
            .map(|i| {
                let manager = manager.clone();
                let worker_id = format!("worker-{}", i);
                tokio::spawn(async move { worker_loop(manager, worker_id).await })
            })
            .collect();
        Self { handles }
    }

    /// Wait for every worker to drain out (after the queue closes).
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop<C: Clock>(manager: JobManager<C>, worker_id: String) {
    info!(worker = %worker_id, "worker started");
    while let Some(entry) = manager.queue().pop().await {
        let Some(claimed) = manager.claim(&entry.job_id) else {
            // Cancelled (or evicted) between dispatch and claim.
            continue;
        };
        let Some(trainer) = manager.trainer_for(claimed.job.kind) else {
            // Unreachable in practice: submit validated the kind.
            error!(job = %entry.job_id, kind = %claimed.job.kind, "no trainer registered");
            manager.finish(
                &entry.job_id,
                TerminalOutcome::Failed(JobError::new(
                    ErrorKind::UnknownTrainer,
                    format!("no trainer registered for {}", claimed.job.kind),
                )),
            );
            continue;
        };

        debug!(worker = %worker_id, job = %entry.job_id, "running job");
        let outcome = run_one(&manager, trainer, &claimed).await;
        manager.finish(&entry.job_id, outcome);
    }
    info!(worker = %worker_id, "worker stopped");
}

/// Drive one trainer invocation to a terminal outcome.
///
/// The trainer runs in its own task so a non-cooperating one can be
/// abandoned: after the grace window the task is aborted and the worker
/// moves on regardless.
async fn run_one<C: Clock>(
    manager: &JobManager<C>,
    trainer: Arc<dyn TrainerAdapter>,
    claimed: &ClaimedJob,
) -> TerminalOutcome {
    let job = &claimed.job;
    let request = TrainerRequest {
        job_id: job.id,
        kind: job.kind,
        config_ref: job.config_ref.clone(),
        dataset_ref: job.dataset_ref.clone(),
    };
    let token = claimed.token.clone();
    let grace = manager.config().cancel_grace;
    let run_timeout = manager.config().job_run_timeout;

    let mut handle = {
        let token = token.clone();
        let sink = ProgressReporter::new(manager.clone(), job.id);
        tokio::spawn(async move { trainer.run(token, &request, &sink).await })
    };

    tokio::select! {
        result = &mut handle => outcome_from(result),

        () = token.cancelled() => {
            // Give the trainer the grace window to unwind cooperatively.
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(result) => outcome_from(result),
                Err(_) => {
                    handle.abort();
                    TerminalOutcome::Failed(JobError::new(
                        ErrorKind::CancelTimeout,
                        format!("trainer ignored cancellation for {:?}", grace),
                    ))
                }
            }
        }

        () = run_deadline(run_timeout) => {
            token.cancel();
            match tokio::time::timeout(grace, &mut handle).await {
                // Completion that raced the deadline still counts; anything
                // else becomes a timeout failure.
                Ok(result) => match outcome_from(result) {
                    done @ TerminalOutcome::Completed { .. } => done,
                    _ => timeout_failure(run_timeout),
                },
                Err(_) => {
                    handle.abort();
                    timeout_failure(run_timeout)
                }
            }
        }
    }
}

fn timeout_failure(run_timeout: Option<Duration>) -> TerminalOutcome {
    TerminalOutcome::Failed(JobError::new(
        ErrorKind::Timeout,
        match run_timeout {
            Some(limit) => format!("job exceeded run timeout of {:?}", limit),
            None => "job exceeded run timeout".to_string(),
        },
    ))
}

/// Sleep until the optional run deadline; pend forever without one.
async fn run_deadline(timeout: Option<Duration>) {
    match timeout {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}

/// Map the trainer task's result into a terminal outcome, containing
/// panics as internal failures.
fn outcome_from(result: Result<RunOutcome, JoinError>) -> TerminalOutcome {
    match result {
        Ok(RunOutcome::Completed { artifacts, dataset }) => {
            TerminalOutcome::Completed { artifacts, dataset }
        }
        Ok(RunOutcome::Failed { error }) => TerminalOutcome::Failed(error),
        Ok(RunOutcome::Cancelled) => TerminalOutcome::Cancelled,
        Err(join_error) if join_error.is_panic() => {
            error!(error = %join_error, "trainer panicked");
            TerminalOutcome::Failed(JobError::new(
                ErrorKind::Internal,
                format!("trainer panicked: {}", join_error),
            ))
        }
        Err(join_error) => TerminalOutcome::Failed(JobError::new(
            ErrorKind::Internal,
            format!("trainer task aborted: {}", join_error),
        )),
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
