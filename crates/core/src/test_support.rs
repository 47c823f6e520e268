// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for tests in this crate and downstream crates.

/// Proptest strategies for domain types.
pub mod strategies {
    use crate::job::{JobStatus, Priority, TrainerKind};
    use crate::progress::ProgressDelta;
    use proptest::prelude::*;

    pub fn trainer_kind() -> impl Strategy<Value = TrainerKind> {
        prop::sample::select(TrainerKind::ALL.to_vec())
    }

    pub fn priority() -> impl Strategy<Value = Priority> {
        (1u8..=5).prop_map(|v| match Priority::new(v) {
            Some(p) => p,
            None => Priority::default(),
        })
    }

    pub fn job_status() -> impl Strategy<Value = JobStatus> {
        prop::sample::select(vec![
            JobStatus::Pending,
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ])
    }

    /// Deltas with all counters bounded so sequences of merges stay sane.
    pub fn progress_delta() -> impl Strategy<Value = ProgressDelta> {
        (
            prop::option::of(0u32..100),
            prop::option::of(1u32..100),
            prop::option::of(0u64..10_000),
            prop::option::of(1u64..10_000),
        )
            .prop_map(|(epochs_done, epochs_total, steps_done, steps_total)| ProgressDelta {
                epochs_done,
                epochs_total,
                steps_done,
                steps_total,
                metrics: Default::default(),
            })
    }
}
