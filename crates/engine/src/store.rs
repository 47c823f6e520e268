// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authoritative in-memory job table.
//!
//! Owned by the manager behind its write lock; nothing here synchronises.
//! Nothing persists either: a restart forgets every job, and terminal
//! records are evicted after the retention window.

use ft_core::{Job, JobId, JobStatus, TrainerKind};
use std::collections::{BTreeSet, HashMap};

/// Query shape for [`JobStore::list`].
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub statuses: Option<BTreeSet<JobStatus>>,
    pub kinds: Option<BTreeSet<TrainerKind>>,
    pub submitted_by: Option<String>,
    pub limit: Option<usize>,
}

impl JobFilter {
    fn matches(&self, job: &Job) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&job.status) {
                return false;
            }
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&job.kind) {
                return false;
            }
        }
        if let Some(principal) = &self.submitted_by {
            if job.submitted_by != *principal {
                return false;
            }
        }
        true
    }
}

/// Map of job ID to record.
#[derive(Default)]
pub struct JobStore {
    jobs: HashMap<JobId, Job>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, job: Job) {
        self.jobs.insert(job.id, job);
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn get_mut(&mut self, id: &JobId) -> Option<&mut Job> {
        self.jobs.get_mut(id)
    }

    pub fn remove(&mut self, id: &JobId) -> Option<Job> {
        self.jobs.remove(id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    /// Snapshot matching the filter, most recent submission first.
    pub fn list(&self, filter: &JobFilter) -> Vec<Job> {
        let mut jobs: Vec<Job> =
            self.jobs.values().filter(|j| filter.matches(j)).cloned().collect();
        jobs.sort_by(|a, b| {
            b.submitted_at_ms
                .cmp(&a.submitted_at_ms)
                .then_with(|| b.id.as_str().cmp(a.id.as_str()))
        });
        if let Some(limit) = filter.limit {
            jobs.truncate(limit);
        }
        jobs
    }

    /// Jobs in each non-terminal and terminal status, for metrics.
    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for job in self.jobs.values() {
            match job.status {
                JobStatus::Pending | JobStatus::Queued => counts.queued += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
                JobStatus::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }

    /// Evict terminal jobs whose retention window has lapsed.
    pub fn sweep_terminal(&mut self, now_ms: u64, retain_ms: u64) -> Vec<JobId> {
        let expired: Vec<JobId> = self
            .jobs
            .values()
            .filter(|job| {
                job.is_terminal()
                    && job
                        .finished_at_ms
                        .is_some_and(|finished| now_ms.saturating_sub(finished) >= retain_ms)
            })
            .map(|job| job.id)
            .collect();
        for id in &expired {
            self.jobs.remove(id);
        }
        expired
    }
}

/// Job tallies by status bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
