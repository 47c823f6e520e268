// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded priority queue between acceptance and dispatch.

use crate::error::EngineError;
use ft_core::{JobId, Priority};
use parking_lot::Mutex;
use std::collections::BinaryHeap;
use tokio::sync::Notify;

/// One queued job reference. The queue never owns job records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub job_id: JobId,
    pub priority: Priority,
    pub submitted_at_ms: u64,
    /// Push order, breaking ties between same-millisecond submissions.
    arrival: u64,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap pops the greatest entry: highest priority first, then
        // FIFO within a priority class.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.submitted_at_ms.cmp(&self.submitted_at_ms))
            .then_with(|| other.arrival.cmp(&self.arrival))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

struct QueueInner {
    heap: BinaryHeap<QueueEntry>,
    arrivals: u64,
    closed: bool,
}

/// Thread-safe bounded priority queue.
///
/// The manager pushes, workers block on [`PriorityQueue::pop`]. Shutdown
/// closes the queue and releases every blocked worker with `None`.
pub struct PriorityQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    capacity: usize,
}

impl PriorityQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                heap: BinaryHeap::new(),
                arrivals: 0,
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Enqueue a job reference. Fails when the queue is at capacity or
    /// closed.
    pub fn push(
        &self,
        job_id: JobId,
        priority: Priority,
        submitted_at_ms: u64,
    ) -> Result<(), EngineError> {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(EngineError::ShuttingDown);
            }
            if inner.heap.len() >= self.capacity {
                return Err(EngineError::QueueFull(self.capacity));
            }
            let arrival = inner.arrivals;
            inner.arrivals += 1;
            inner.heap.push(QueueEntry { job_id, priority, submitted_at_ms, arrival });
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Block until an entry is available or the queue shuts down.
    ///
    /// Waking consumers always re-check the heap before sleeping, so a
    /// single stored notify permit is enough to drain bursts.
    pub async fn pop(&self) -> Option<QueueEntry> {
        loop {
            {
                let mut inner = self.inner.lock();
                if let Some(entry) = inner.heap.pop() {
                    return Some(entry);
                }
                if inner.closed {
                    drop(inner);
                    // Chain the wakeup so every blocked consumer drains out.
                    self.notify.notify_one();
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Remove a specific job if it is still queued. O(n), queues are small.
    pub fn remove(&self, job_id: &JobId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.heap.len();
        inner.heap.retain(|e| e.job_id != *job_id);
        inner.heap.len() != before
    }

    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close the queue: rejects further pushes and releases blocked
    /// consumers. Remaining entries are dropped.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.closed = true;
            inner.heap.clear();
        }
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
