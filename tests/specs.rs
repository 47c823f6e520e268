// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios against an in-process engine.
//!
//! These exercise the full accept → queue → dispatch → train → fan-out path
//! with real and scripted trainers, checking the externally observable
//! contracts: state-machine legality, event ordering, progress monotonicity,
//! cancellation behaviour, and subscriber isolation.

use ft_core::{
    ErrorKind, JobId, JobSpec, JobStatus, Priority, ProgressEvent, TrainerKind,
};
use ft_engine::{EngineConfig, JobManager, ObserveFilter, Subscription, WorkerPool};
use ft_trainers::scripted::{Script, ScriptedTrainer};
use ft_trainers::{AdapterTrainer, TrainerRegistry};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn scripted_manager(script: Script, config: EngineConfig) -> JobManager {
    let mut registry = TrainerRegistry::new();
    registry.register(Arc::new(ScriptedTrainer::new(TrainerKind::Lora, script)));
    JobManager::new(config, Arc::new(registry))
}

fn lora_spec() -> JobSpec {
    JobSpec::new(TrainerKind::Lora, "cfg://a")
        .dataset_ref("ds://a")
        .submitted_by("alice")
}

fn priority(value: u8) -> Priority {
    Priority::new(value).unwrap()
}

/// Drain a single-job stream to its end, asserting per-event invariants.
async fn collect_stream(sub: &mut Subscription) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = sub.next().await.unwrap() {
        let done = event.is_terminal();
        events.push(event);
        if done {
            break;
        }
    }
    events
}

/// Check that an observed event sequence is a legal state-machine path with
/// ordered seqs and monotonic progress.
fn assert_lifecycle_invariants(events: &[ProgressEvent]) {
    for pair in events.windows(2) {
        assert!(pair[0].seq < pair[1].seq, "seq order violated: {:?}", pair);
        assert!(
            pair[0].progress.steps_done <= pair[1].progress.steps_done,
            "steps regressed"
        );
        assert!(
            pair[0].progress.epochs_done <= pair[1].progress.epochs_done,
            "epochs regressed"
        );
        if pair[0].status != pair[1].status {
            assert!(
                pair[0].status.can_transition(pair[1].status),
                "illegal transition {:?} -> {:?}",
                pair[0].status,
                pair[1].status
            );
        }
    }
    for event in events {
        if event.status == JobStatus::Completed {
            assert!(event.artifact_refs.is_some(), "completed event without artifacts");
            assert!(event.error_kind.is_none());
        }
        if event.status == JobStatus::Failed {
            assert!(event.error_kind.is_some(), "failed event without error kind");
        }
    }
}

// One LoRA job through the real trainer, observed end to end.
#[tokio::test]
async fn single_job_full_lifecycle() {
    let export = tempfile::tempdir().unwrap();
    let mut config_doc = tempfile::NamedTempFile::new().unwrap();
    write!(
        config_doc,
        "base_model = \"base/llama\"\nrank = 8\nepochs = 2\nsteps_per_epoch = 4\nlearning_rate = 3e-4\nstep_duration_ms = 1\n"
    )
    .unwrap();
    config_doc.flush().unwrap();

    let mut registry = TrainerRegistry::new();
    registry.register(Arc::new(AdapterTrainer::lora(export.path())));
    let manager = JobManager::new(EngineConfig::default(), Arc::new(registry));

    let spec = JobSpec::new(TrainerKind::Lora, config_doc.path().display().to_string())
        .dataset_ref("ds://corpus")
        .submitted_by("alice");
    let id = manager.submit(spec).await.unwrap();

    // Attach before workers exist so the whole lifecycle is observed.
    let mut sub = manager.observe(ObserveFilter::Job(id)).unwrap();
    let pool = WorkerPool::spawn(manager.clone());
    let events = collect_stream(&mut sub).await;
    assert_lifecycle_invariants(&events);

    assert_eq!(events[0].status, JobStatus::Queued, "first event is the accept");
    assert!(events.iter().any(|e| e.status == JobStatus::Running));
    let last = events.last().unwrap();
    assert_eq!(last.status, JobStatus::Completed);
    let artifacts = last.artifact_refs.as_ref().unwrap();
    assert!(artifacts.contains_key("adapter"));
    assert!(std::path::Path::new(&artifacts["adapter"]).is_file());

    // The store agrees with the stream's terminal record.
    let job = manager.get(&id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(&job.artifact_refs, artifacts);
    assert_eq!(job.progress.epochs_done, 2);

    // And the wire form of the terminal frame carries the contract fields.
    let frame = ft_wire::StreamFrame::Event(last.into());
    let wire = serde_json::to_string(&frame).unwrap();
    assert!(wire.contains("\"status\":\"completed\""));
    assert!(wire.contains("\"artifact_refs\""));
    assert!(wire.contains(&format!("\"job_id\":\"{}\"", id)));

    manager.shutdown();
    pool.join().await;
}

// With one worker, dispatch follows priority, not submission order.
#[tokio::test]
async fn priority_decides_dispatch_order() {
    let manager = scripted_manager(
        Script::Complete { steps: 1, step_delay: Duration::from_millis(5) },
        EngineConfig { workers: 1, ..EngineConfig::default() },
    );

    // Submit everything before the worker pool exists.
    let j1 = manager.submit(lora_spec().priority(priority(1))).await.unwrap();
    let j2 = manager.submit(lora_spec().priority(priority(5))).await.unwrap();
    let j3 = manager.submit(lora_spec().priority(priority(3))).await.unwrap();

    let mut sub = manager.observe(ObserveFilter::All).unwrap();
    let pool = WorkerPool::spawn(manager.clone());

    let mut running_order: Vec<JobId> = Vec::new();
    while running_order.len() < 3 {
        let event = sub.next().await.unwrap().unwrap();
        if event.status == JobStatus::Running && !running_order.contains(&event.job_id) {
            running_order.push(event.job_id);
        }
    }
    assert_eq!(running_order, vec![j2, j3, j1]);

    manager.shutdown();
    pool.join().await;
}

// Cancelling a queued job never lets it run; its neighbour is unaffected.
#[tokio::test]
async fn cancel_queued_job_before_dispatch() {
    let manager = scripted_manager(
        Script::Complete { steps: 10, step_delay: Duration::from_millis(5) },
        EngineConfig { workers: 1, ..EngineConfig::default() },
    );
    let pool = WorkerPool::spawn(manager.clone());

    let j1 = manager.submit(lora_spec()).await.unwrap();
    let j2 = manager.submit(lora_spec()).await.unwrap();

    // j1 occupies the only worker; j2 is still queued.
    manager.cancel(&j2).unwrap();

    let mut sub = manager.observe(ObserveFilter::Job(j2)).unwrap();
    let events = collect_stream(&mut sub).await;
    let last = events.last().unwrap();
    assert_eq!(last.status, JobStatus::Cancelled);
    assert!(events.iter().all(|e| e.status != JobStatus::Running), "j2 never ran");

    let j2_record = manager.get(&j2).unwrap();
    assert!(j2_record.started_at_ms.is_none());

    // j1 still completes.
    let mut sub = manager.observe(ObserveFilter::Job(j1)).unwrap();
    let events = collect_stream(&mut sub).await;
    assert_eq!(events.last().unwrap().status, JobStatus::Completed);

    manager.shutdown();
    pool.join().await;
}

// A cooperative trainer settles to `cancelled` inside the grace window.
#[tokio::test]
async fn cooperative_cancel_of_running_job() {
    let manager = scripted_manager(
        Script::CooperativeCancel { step_delay: Duration::from_millis(5) },
        EngineConfig { cancel_grace: Duration::from_secs(5), ..EngineConfig::default() },
    );
    let pool = WorkerPool::spawn(manager.clone());

    let id = manager.submit(lora_spec()).await.unwrap();
    let mut sub = manager.observe(ObserveFilter::Job(id)).unwrap();

    // Wait for the running event, then cancel.
    loop {
        let event = sub.next().await.unwrap().unwrap();
        if event.status == JobStatus::Running {
            break;
        }
    }
    manager.cancel(&id).unwrap();
    // Repeat cancels before the worker reacts are fine.
    manager.cancel(&id).unwrap();

    let events = collect_stream(&mut sub).await;
    assert_eq!(events.last().unwrap().status, JobStatus::Cancelled);
    assert!(manager.get(&id).unwrap().last_error.is_none());

    manager.shutdown();
    pool.join().await;
}

// A trainer that ignores the token is abandoned after the grace window
// and the job fails with a cancel-timeout tag.
#[tokio::test]
async fn non_cooperative_cancel_times_out() {
    let manager = scripted_manager(
        Script::IgnoreCancel { run_for: Duration::from_secs(120) },
        EngineConfig { cancel_grace: Duration::from_millis(100), ..EngineConfig::default() },
    );
    let pool = WorkerPool::spawn(manager.clone());

    let id = manager.submit(lora_spec()).await.unwrap();
    let mut sub = manager.observe(ObserveFilter::Job(id)).unwrap();
    loop {
        let event = sub.next().await.unwrap().unwrap();
        if event.status == JobStatus::Running {
            break;
        }
    }

    manager.cancel(&id).unwrap();
    let events = collect_stream(&mut sub).await;
    let last = events.last().unwrap();
    assert_eq!(last.status, JobStatus::Failed);
    assert_eq!(last.error_kind, Some(ErrorKind::CancelTimeout));

    // Exactly one terminal outcome: failed, never also cancelled.
    assert_eq!(
        events.iter().filter(|e| e.is_terminal()).count(),
        1,
        "a single terminal event"
    );

    manager.shutdown();
    pool.join().await;
}

// A subscriber attaching after completion gets the terminal snapshot,
// then a clean close.
#[tokio::test]
async fn late_subscriber_gets_terminal_snapshot() {
    let manager = scripted_manager(
        Script::Complete { steps: 2, step_delay: Duration::from_millis(1) },
        EngineConfig::default(),
    );
    let pool = WorkerPool::spawn(manager.clone());

    let id = manager.submit(lora_spec()).await.unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !manager.get(&id).unwrap().status.is_terminal() {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let mut sub = manager.observe(ObserveFilter::Job(id)).unwrap();
    let bootstrap = sub.next().await.unwrap().unwrap();
    assert_eq!(bootstrap.status, JobStatus::Completed);
    assert_eq!(bootstrap.seq, manager.get(&id).unwrap().seq_next - 1);
    assert!(sub.next().await.unwrap().is_none(), "stream closes after terminal");

    manager.shutdown();
    pool.join().await;
}

// A stalled wildcard subscriber is force-closed; a healthy one still
// sees everything in order, and every job still terminates correctly.
#[tokio::test]
async fn slow_subscriber_is_isolated() {
    let manager = scripted_manager(
        Script::Complete { steps: 1, step_delay: Duration::from_millis(1) },
        EngineConfig {
            workers: 2,
            subscriber_buffer: 4,
            ..EngineConfig::default()
        },
    );

    // The stalled subscriber never consumes; the healthy one consumes live.
    let mut stalled = manager.observe(ObserveFilter::All).unwrap();
    let mut healthy = manager.observe(ObserveFilter::All).unwrap();

    const JOBS: usize = 8;
    let collector = tokio::spawn(async move {
        let mut events = Vec::new();
        let mut terminals = 0;
        while terminals < JOBS {
            match healthy.next().await {
                Ok(Some(event)) => {
                    if event.is_terminal() {
                        terminals += 1;
                    }
                    events.push(event);
                }
                other => panic!("healthy subscriber ended early: {:?}", other),
            }
        }
        events
    });

    let pool = WorkerPool::spawn(manager.clone());
    let mut ids = Vec::new();
    for _ in 0..JOBS {
        ids.push(manager.submit(lora_spec()).await.unwrap());
    }

    // Wait for every job to settle.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    for id in &ids {
        while !manager.get(id).unwrap().status.is_terminal() {
            assert!(tokio::time::Instant::now() < deadline, "jobs never settled");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(manager.get(id).unwrap().status, JobStatus::Completed);
    }

    // Eight jobs at four events each overwhelm a buffer of four: the
    // stalled subscription ends in a slow-consumer error (possibly after a
    // few coalesced frames).
    let stalled_result = loop {
        match stalled.next().await {
            Ok(Some(_)) => continue,
            other => break other,
        }
    };
    assert!(matches!(stalled_result, Err(ft_engine::EngineError::SlowConsumer)));

    // The healthy subscriber observed a per-job ordered stream with every
    // terminal present.
    let events = collector.await.unwrap();
    let mut per_job_seq: std::collections::HashMap<JobId, u64> = Default::default();
    let mut terminals = 0;
    for event in &events {
        if let Some(previous) = per_job_seq.insert(event.job_id, event.seq) {
            assert!(previous < event.seq, "per-job order violated");
        }
        if event.is_terminal() {
            terminals += 1;
        }
    }
    assert_eq!(terminals, ids.len(), "every terminal event delivered");

    manager.shutdown();
    pool.join().await;
}

// Submit-then-list linearisability: anything accepted before a list call
// shows up in it.
#[tokio::test]
async fn submit_is_visible_to_list() {
    let manager = scripted_manager(
        Script::Complete { steps: 1, step_delay: Duration::from_millis(1) },
        EngineConfig::default(),
    );

    let mut submitted = std::collections::BTreeSet::new();
    for _ in 0..10 {
        submitted.insert(manager.submit(lora_spec()).await.unwrap());
    }

    let listed: std::collections::BTreeSet<JobId> = manager
        .list(&ft_engine::JobFilter::default())
        .iter()
        .map(|j| j.id)
        .collect();
    assert!(submitted.is_subset(&listed));
}

// Queue capacity boundary: a full queue rejects, one cancel frees one slot.
#[tokio::test]
async fn capacity_boundary() {
    let manager = scripted_manager(
        Script::Complete { steps: 1, step_delay: Duration::from_millis(1) },
        EngineConfig { max_queue_depth: 2, ..EngineConfig::default() },
    );

    let first = manager.submit(lora_spec()).await.unwrap();
    manager.submit(lora_spec()).await.unwrap();
    let err = manager.submit(lora_spec()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capacity);

    manager.cancel(&first).unwrap();
    assert!(manager.submit(lora_spec()).await.is_ok());
    assert!(matches!(
        manager.submit(lora_spec()).await.unwrap_err().kind(),
        ErrorKind::Capacity
    ));
}
