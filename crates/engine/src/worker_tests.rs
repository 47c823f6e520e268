// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::EngineConfig;
use crate::hub::ObserveFilter;
use crate::manager::JobManager;
use ft_core::{ErrorKind, JobId, JobSpec, JobStatus, SystemClock, TrainerKind};
use ft_trainers::scripted::{Script, ScriptedTrainer};
use ft_trainers::{
    ProgressSink, RunOutcome, TrainerAdapter, TrainerError, TrainerRegistry, TrainerRequest,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trainer that panics mid-run, for containment tests.
struct PanickingTrainer;

#[async_trait::async_trait]
impl TrainerAdapter for PanickingTrainer {
    fn kind(&self) -> TrainerKind {
        TrainerKind::Lora
    }

    async fn validate(&self, _request: &TrainerRequest) -> Result<(), TrainerError> {
        Ok(())
    }

    async fn run(
        &self,
        _cancel: CancellationToken,
        _request: &TrainerRequest,
        _sink: &dyn ProgressSink,
    ) -> RunOutcome {
        panic!("simulated trainer crash");
    }
}

fn manager_with(
    script: Script,
    config: EngineConfig,
) -> JobManager<SystemClock> {
    let mut registry = TrainerRegistry::new();
    registry.register(Arc::new(ScriptedTrainer::new(TrainerKind::Lora, script)));
    JobManager::new(config, Arc::new(registry))
}

fn spec() -> JobSpec {
    JobSpec::new(TrainerKind::Lora, "cfg://a")
        .dataset_ref("ds://a")
        .submitted_by("alice")
}

async fn wait_terminal(
    manager: &JobManager<SystemClock>,
    id: &JobId,
    limit: Duration,
) -> JobStatus {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        let status = manager.get(id).map(|j| j.status).unwrap_or(JobStatus::Failed);
        if status.is_terminal() {
            return status;
        }
        assert!(tokio::time::Instant::now() < deadline, "job never settled");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn happy_path_runs_to_completion() {
    let manager = manager_with(
        Script::Complete { steps: 3, step_delay: Duration::from_millis(2) },
        EngineConfig::default(),
    );
    let pool = WorkerPool::spawn(manager.clone());

    let id = manager.submit(spec()).await.unwrap();
    let status = wait_terminal(&manager, &id, Duration::from_secs(5)).await;
    assert_eq!(status, JobStatus::Completed);

    let job = manager.get(&id).unwrap();
    assert!(job.artifact_refs.contains_key("adapter"));
    assert!(job.progress.steps_done > 0);
    assert!(job.finished_at_ms.unwrap() >= job.started_at_ms.unwrap());

    manager.shutdown();
    pool.join().await;
}

#[tokio::test]
async fn trainer_failure_becomes_failed_terminal() {
    let manager = manager_with(
        Script::Fail { kind: ErrorKind::Internal, message: "weights diverged".to_string() },
        EngineConfig::default(),
    );
    let pool = WorkerPool::spawn(manager.clone());

    let id = manager.submit(spec()).await.unwrap();
    let status = wait_terminal(&manager, &id, Duration::from_secs(5)).await;
    assert_eq!(status, JobStatus::Failed);

    let job = manager.get(&id).unwrap();
    let error = job.last_error.unwrap();
    assert_eq!(error.kind, ErrorKind::Internal);
    assert!(error.message.contains("weights diverged"));

    manager.shutdown();
    pool.join().await;
}

#[tokio::test]
async fn trainer_panic_is_contained_and_worker_survives() {
    let mut registry = TrainerRegistry::new();
    registry.register(Arc::new(PanickingTrainer));
    registry.register(Arc::new(ScriptedTrainer::instant(TrainerKind::DatasetAssembly)));
    let manager = JobManager::new(
        EngineConfig { workers: 1, ..EngineConfig::default() },
        Arc::new(registry),
    );
    let pool = WorkerPool::spawn(manager.clone());

    let crashed = manager.submit(spec()).await.unwrap();
    assert_eq!(
        wait_terminal(&manager, &crashed, Duration::from_secs(5)).await,
        JobStatus::Failed
    );
    assert_eq!(
        manager.get(&crashed).unwrap().last_error.unwrap().kind,
        ErrorKind::Internal
    );

    // The same worker keeps serving jobs afterwards.
    let next = manager
        .submit(JobSpec::new(TrainerKind::DatasetAssembly, "cfg://d").submitted_by("alice"))
        .await
        .unwrap();
    assert_eq!(
        wait_terminal(&manager, &next, Duration::from_secs(5)).await,
        JobStatus::Completed
    );

    manager.shutdown();
    pool.join().await;
}

#[tokio::test]
async fn cooperative_cancel_settles_cancelled() {
    let manager = manager_with(
        Script::CooperativeCancel { step_delay: Duration::from_millis(5) },
        EngineConfig::default(),
    );
    let pool = WorkerPool::spawn(manager.clone());

    let id = manager.submit(spec()).await.unwrap();
    // Wait until the job is actually running before cancelling.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while manager.get(&id).unwrap().status != JobStatus::Running {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    manager.cancel(&id).unwrap();
    let status = wait_terminal(&manager, &id, Duration::from_secs(5)).await;
    assert_eq!(status, JobStatus::Cancelled);
    assert!(manager.get(&id).unwrap().last_error.is_none());

    manager.shutdown();
    pool.join().await;
}

#[tokio::test]
async fn non_cooperative_cancel_fails_after_grace() {
    let manager = manager_with(
        Script::IgnoreCancel { run_for: Duration::from_secs(60) },
        EngineConfig { cancel_grace: Duration::from_millis(50), ..EngineConfig::default() },
    );
    let pool = WorkerPool::spawn(manager.clone());

    let id = manager.submit(spec()).await.unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while manager.get(&id).unwrap().status != JobStatus::Running {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    manager.cancel(&id).unwrap();
    let status = wait_terminal(&manager, &id, Duration::from_secs(5)).await;
    assert_eq!(status, JobStatus::Failed);
    assert_eq!(
        manager.get(&id).unwrap().last_error.unwrap().kind,
        ErrorKind::CancelTimeout
    );

    manager.shutdown();
    pool.join().await;
}

#[tokio::test]
async fn run_timeout_fails_the_job() {
    let manager = manager_with(
        Script::IgnoreCancel { run_for: Duration::from_secs(60) },
        EngineConfig {
            job_run_timeout: Some(Duration::from_millis(30)),
            cancel_grace: Duration::from_millis(30),
            ..EngineConfig::default()
        },
    );
    let pool = WorkerPool::spawn(manager.clone());

    let id = manager.submit(spec()).await.unwrap();
    let status = wait_terminal(&manager, &id, Duration::from_secs(5)).await;
    assert_eq!(status, JobStatus::Failed);
    assert_eq!(manager.get(&id).unwrap().last_error.unwrap().kind, ErrorKind::Timeout);

    manager.shutdown();
    pool.join().await;
}

#[tokio::test]
async fn running_jobs_never_exceed_worker_count() {
    let manager = manager_with(
        Script::Complete { steps: 5, step_delay: Duration::from_millis(10) },
        EngineConfig { workers: 2, ..EngineConfig::default() },
    );
    let pool = WorkerPool::spawn(manager.clone());

    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(manager.submit(spec()).await.unwrap());
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let metrics = manager.metrics();
        assert!(metrics.jobs_running <= 2, "worker bound violated");
        if metrics.jobs_completed == ids.len() {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "jobs never drained");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    manager.shutdown();
    pool.join().await;
}

#[tokio::test]
async fn priority_decides_run_order_with_one_worker() {
    let manager = manager_with(
        Script::Complete { steps: 1, step_delay: Duration::from_millis(5) },
        EngineConfig { workers: 1, ..EngineConfig::default() },
    );

    // Submit before any worker exists so dispatch order is purely the
    // queue's priority order.
    let low = manager
        .submit(spec().priority(ft_core::Priority::new(1).unwrap()))
        .await
        .unwrap();
    let high = manager
        .submit(spec().priority(ft_core::Priority::new(5).unwrap()))
        .await
        .unwrap();
    let mid = manager
        .submit(spec().priority(ft_core::Priority::new(3).unwrap()))
        .await
        .unwrap();

    let mut sub = manager.observe(ObserveFilter::All).unwrap();
    let pool = WorkerPool::spawn(manager.clone());

    // Record the order in which jobs enter the running state.
    let mut running_order = Vec::new();
    while running_order.len() < 3 {
        let event = sub.next().await.unwrap().unwrap();
        if event.status == JobStatus::Running && !running_order.contains(&event.job_id) {
            running_order.push(event.job_id);
        }
    }
    assert_eq!(running_order, vec![high, mid, low]);

    manager.shutdown();
    pool.join().await;
}

#[tokio::test]
async fn workers_drain_out_on_queue_close() {
    let manager = manager_with(
        Script::Complete { steps: 1, step_delay: Duration::from_millis(1) },
        EngineConfig { workers: 3, ..EngineConfig::default() },
    );
    let pool = WorkerPool::spawn(manager.clone());

    manager.shutdown();
    // join() returning proves every worker saw the sentinel.
    pool.join().await;
}
