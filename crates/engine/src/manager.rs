// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job manager: single authoritative owner of job state.
//!
//! Every mutation — submit, dispatch claim, progress ingestion, terminal
//! transition — happens under one write lock, and events are published to
//! the hub before the lock is released. That serialisation is what makes
//! the state machine race-free, sequence numbers deterministic, and the
//! subscriber attach boundary loss-free.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::hub::{ObserveFilter, ProgressHub, Subscription};
use crate::queue::PriorityQueue;
use crate::store::{JobFilter, JobStore};
use ft_core::{
    Clock, DatasetDescriptor, Job, JobError, JobId, JobSpec, JobStatus, MetricsSnapshot,
    ProgressDelta, SystemClock,
};
use ft_trainers::{TrainerAdapter, TrainerRegistry, TrainerRequest};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a run ended, as reported by the worker that drove it.
#[derive(Debug)]
pub enum TerminalOutcome {
    Completed {
        artifacts: BTreeMap<String, String>,
        dataset: Option<DatasetDescriptor>,
    },
    Failed(JobError),
    Cancelled,
}

/// A job handed to a worker, with its cancellation token.
pub(crate) struct ClaimedJob {
    pub job: Job,
    pub token: CancellationToken,
}

struct RunningJob {
    token: CancellationToken,
}

struct EngineState {
    store: JobStore,
    running: HashMap<JobId, RunningJob>,
}

struct ManagerInner<C: Clock> {
    clock: C,
    config: EngineConfig,
    registry: Arc<TrainerRegistry>,
    queue: PriorityQueue,
    hub: ProgressHub,
    state: Mutex<EngineState>,
}

/// Handle to the engine. Cheap to clone; all clones share state.
pub struct JobManager<C: Clock = SystemClock> {
    inner: Arc<ManagerInner<C>>,
}

impl<C: Clock> Clone for JobManager<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl JobManager<SystemClock> {
    pub fn new(config: EngineConfig, registry: Arc<TrainerRegistry>) -> Self {
        Self::with_clock(config, registry, SystemClock)
    }
}

impl<C: Clock> JobManager<C> {
    pub fn with_clock(config: EngineConfig, registry: Arc<TrainerRegistry>, clock: C) -> Self {
        let queue = PriorityQueue::new(config.max_queue_depth);
        let hub = ProgressHub::new(config.max_subscribers, config.subscriber_buffer);
        Self {
            inner: Arc::new(ManagerInner {
                clock,
                config,
                registry,
                queue,
                hub,
                state: Mutex::new(EngineState {
                    store: JobStore::new(),
                    running: HashMap::new(),
                }),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub(crate) fn queue(&self) -> &PriorityQueue {
        &self.inner.queue
    }

    pub(crate) fn trainer_for(&self, kind: ft_core::TrainerKind) -> Option<Arc<dyn TrainerAdapter>> {
        self.inner.registry.get(kind)
    }

    /// Trainer kinds this deployment accepts.
    pub fn kinds(&self) -> Vec<ft_core::TrainerKind> {
        self.inner.registry.kinds()
    }

    /// Bump the job's sequence counter and fan its current state out.
    /// Caller must hold the state lock.
    fn publish_locked(&self, job: &mut Job) {
        let seq = job.bump_seq();
        self.inner.hub.publish(&job.snapshot_event(seq));
    }

    /// Accept a job: validate, create the record, enqueue, announce.
    ///
    /// Insert and enqueue are atomic under the state lock; a full queue
    /// leaves no trace of the attempt.
    pub async fn submit(&self, spec: JobSpec) -> Result<JobId, EngineError> {
        let Some(trainer) = self.inner.registry.get(spec.kind) else {
            return Err(EngineError::UnknownTrainer(spec.kind));
        };
        if spec.kind.requires_dataset() && spec.dataset_ref.is_none() {
            return Err(EngineError::InvalidConfig(format!(
                "dataset_ref is required for {} jobs",
                spec.kind
            )));
        }

        let id = JobId::new();
        let request = TrainerRequest {
            job_id: id,
            kind: spec.kind,
            config_ref: spec.config_ref.clone(),
            dataset_ref: spec.dataset_ref.clone(),
        };
        trainer
            .validate(&request)
            .await
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

        let mut state = self.inner.state.lock();
        let mut job = Job::new(id, spec, &self.inner.clock);

        self.inner.queue.push(id, job.priority, job.submitted_at_ms)?;
        job.status = JobStatus::Queued;
        info!(job = %id, kind = %job.kind, priority = %job.priority, "job accepted");
        self.publish_locked(&mut job);

        state.store.insert(job);
        Ok(id)
    }

    /// Pure read of one job.
    pub fn get(&self, id: &JobId) -> Result<Job, EngineError> {
        self.inner
            .state
            .lock()
            .store
            .get(id)
            .cloned()
            .ok_or(EngineError::NotFound(*id))
    }

    /// Snapshot of jobs matching the filter, most recent first.
    pub fn list(&self, filter: &JobFilter) -> Vec<Job> {
        self.inner.state.lock().store.list(filter)
    }

    /// Request cancellation.
    ///
    /// Queued jobs transition immediately; running jobs are signalled and
    /// transition when the worker observes the signal. Repeated cancels of
    /// a running job are no-ops. Cancelling a terminal job is an error.
    pub fn cancel(&self, id: &JobId) -> Result<(), EngineError> {
        let mut state = self.inner.state.lock();
        let Some(job) = state.store.get_mut(id) else {
            return Err(EngineError::NotFound(*id));
        };

        match job.status {
            status if status.is_terminal() => Err(EngineError::Terminal(*id)),
            JobStatus::Queued => {
                job.cancel_requested = true;
                if self.inner.queue.remove(id) {
                    job.status = JobStatus::Cancelled;
                    job.finished_at_ms = Some(self.inner.clock.epoch_ms());
                    info!(job = %id, from = "queued", "job cancelled");
                    self.publish_locked(job);
                }
                // Not in the queue: a worker claim is in flight and will
                // observe cancel_requested before starting the trainer.
                Ok(())
            }
            JobStatus::Running => {
                job.cancel_requested = true;
                if let Some(running) = state.running.get(id) {
                    running.token.cancel();
                }
                debug!(job = %id, "cancellation signalled");
                Ok(())
            }
            // Pending is never observable outside submit.
            _ => {
                job.cancel_requested = true;
                Ok(())
            }
        }
    }

    /// Worker-side: take ownership of a queued job for execution.
    ///
    /// Returns `None` when the job was cancelled (or vanished) between
    /// dispatch and claim; the claiming worker just moves on.
    pub(crate) fn claim(&self, id: &JobId) -> Option<ClaimedJob> {
        let mut state = self.inner.state.lock();
        let job = state.store.get_mut(id)?;
        if job.status != JobStatus::Queued {
            return None;
        }

        if job.cancel_requested {
            job.status = JobStatus::Cancelled;
            job.finished_at_ms = Some(self.inner.clock.epoch_ms());
            info!(job = %id, from = "queued", "job cancelled");
            self.publish_locked(job);
            return None;
        }

        job.status = JobStatus::Running;
        job.started_at_ms = Some(self.inner.clock.epoch_ms());
        let token = CancellationToken::new();
        info!(job = %id, kind = %job.kind, "job dispatched");
        self.publish_locked(job);

        let claimed = ClaimedJob { job: job.clone(), token: token.clone() };
        state.running.insert(*id, RunningJob { token });
        Some(claimed)
    }

    /// Worker-side: drive the terminal transition for a finished run.
    ///
    /// Stale reports (job no longer running, e.g. already forced to a
    /// terminal state) are dropped.
    pub(crate) fn finish(&self, id: &JobId, outcome: TerminalOutcome) {
        let mut state = self.inner.state.lock();
        let Some(job) = state.store.get_mut(id) else {
            warn!(job = %id, "terminal report for unknown job dropped");
            return;
        };
        if job.status != JobStatus::Running {
            debug!(job = %id, status = %job.status, "stale terminal report dropped");
            return;
        }

        match outcome {
            TerminalOutcome::Completed { artifacts, dataset } => {
                job.status = JobStatus::Completed;
                job.artifact_refs = artifacts;
                job.dataset = dataset;
                info!(job = %id, "job completed");
            }
            TerminalOutcome::Failed(error) => {
                job.status = JobStatus::Failed;
                warn!(job = %id, kind = %error.kind, error = %error.message, "job failed");
                job.last_error = Some(error);
            }
            TerminalOutcome::Cancelled => {
                job.status = JobStatus::Cancelled;
                info!(job = %id, from = "running", "job cancelled");
            }
        }
        let now = self.inner.clock.epoch_ms();
        job.finished_at_ms = Some(now.max(job.started_at_ms.unwrap_or(now)));
        self.publish_locked(job);

        state.running.remove(id);
    }

    /// Trainer-side: merge a progress delta and fan it out.
    ///
    /// Reports against non-running jobs are dropped without error — a stale
    /// report from an abandoned trainer is normal, not a fault. Monotonicity
    /// violations are dropped with a warning.
    pub fn report_progress(&self, id: &JobId, delta: &ProgressDelta) {
        let mut state = self.inner.state.lock();
        let Some(job) = state.store.get_mut(id) else {
            return;
        };
        if job.status != JobStatus::Running {
            debug!(job = %id, status = %job.status, "progress for non-running job dropped");
            return;
        }

        if let Err(e) = job.progress.merge(delta, self.inner.clock.epoch_ms()) {
            warn!(job = %id, error = %e, "non-monotonic progress rejected");
            return;
        }
        self.publish_locked(job);
    }

    /// Attach a live-update subscription.
    ///
    /// The bootstrap snapshot and the hub attach happen under the state
    /// lock, so no event published after the snapshot can be missed.
    pub fn observe(&self, filter: ObserveFilter) -> Result<Subscription, EngineError> {
        let state = self.inner.state.lock();
        let bootstrap = match filter {
            ObserveFilter::Job(id) => {
                let job = state.store.get(&id).ok_or(EngineError::NotFound(id))?;
                match job.last_seq() {
                    Some(seq) => vec![job.snapshot_event(seq)],
                    None => Vec::new(),
                }
            }
            ObserveFilter::All => {
                let mut jobs: Vec<&Job> = state.store.iter().collect();
                jobs.sort_by_key(|j| j.submitted_at_ms);
                jobs.iter()
                    .filter_map(|job| job.last_seq().map(|seq| job.snapshot_event(seq)))
                    .collect()
            }
        };
        self.inner.hub.subscribe(filter, bootstrap)
    }

    /// Point-in-time gauges for the metrics surface.
    pub fn metrics(&self) -> MetricsSnapshot {
        let state = self.inner.state.lock();
        let counts = state.store.status_counts();
        MetricsSnapshot {
            jobs_queued: counts.queued,
            jobs_running: counts.running,
            jobs_completed: counts.completed,
            jobs_failed: counts.failed,
            jobs_cancelled: counts.cancelled,
            queue_depth: self.inner.queue.len(),
            workers_total: self.inner.config.workers,
            workers_busy: state.running.len(),
            subscribers: self.inner.hub.subscriber_count(),
            events_published: self.inner.hub.events_published(),
            events_coalesced: self.inner.hub.events_coalesced(),
            subscribers_force_closed: self.inner.hub.force_closed(),
        }
    }

    /// Evict terminal jobs past the retention window.
    pub fn sweep_retention(&self) {
        let retain = self.inner.config.retain_terminal_for.as_millis() as u64;
        let now = self.inner.clock.epoch_ms();
        let evicted = self.inner.state.lock().store.sweep_terminal(now, retain);
        if !evicted.is_empty() {
            info!(count = evicted.len(), "terminal jobs evicted");
        }
    }

    /// Begin shutdown: close the queue, signal every running job, close
    /// every subscription. Workers drain via the queue sentinel.
    pub fn shutdown(&self) {
        self.inner.queue.close();
        {
            let state = self.inner.state.lock();
            for running in state.running.values() {
                running.token.cancel();
            }
        }
        self.inner.hub.close_all();
        info!("engine shutdown initiated");
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
