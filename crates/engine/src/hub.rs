// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out of progress events to live subscribers.
//!
//! Each subscription owns a bounded buffer. When a subscriber cannot keep
//! up, the oldest non-terminal events are coalesced away; a buffer that
//! fills with only terminal frames closes the subscription instead, because
//! terminal events must never be dropped silently.

use crate::error::EngineError;
use ft_core::{JobId, ProgressEvent};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, warn};

ft_core::define_id! {
    /// Unique identifier for a live-update subscription.
    pub struct SubscriberId("sub-");
}

/// What a subscription wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveFilter {
    /// Every job.
    All,
    /// One job; the subscription ends once its terminal event is delivered.
    Job(JobId),
}

impl ObserveFilter {
    fn matches(&self, event: &ProgressEvent) -> bool {
        match self {
            ObserveFilter::All => true,
            ObserveFilter::Job(id) => *id == event.job_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    SlowConsumer,
    Shutdown,
}

struct SubState {
    filter: ObserveFilter,
    buffer: VecDeque<ProgressEvent>,
    closed: Option<CloseReason>,
    /// Terminal event for a single-job filter has been buffered; the
    /// subscription ends once the buffer drains.
    finished: bool,
}

struct SubShared {
    state: Mutex<SubState>,
    notify: Notify,
}

struct HubInner {
    subs: Mutex<HashMap<SubscriberId, Arc<SubShared>>>,
    buffer_cap: usize,
    max_subscribers: usize,
    events_published: AtomicU64,
    events_coalesced: AtomicU64,
    force_closed: AtomicU64,
}

/// The fan-out. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct ProgressHub {
    inner: Arc<HubInner>,
}

impl ProgressHub {
    pub fn new(max_subscribers: usize, buffer_cap: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subs: Mutex::new(HashMap::new()),
                buffer_cap,
                max_subscribers,
                events_published: AtomicU64::new(0),
                events_coalesced: AtomicU64::new(0),
                force_closed: AtomicU64::new(0),
            }),
        }
    }

    /// Attach a subscription, seeding its buffer with bootstrap snapshots.
    ///
    /// The caller (the manager) serialises this against publication, so a
    /// subscriber never loses an event across the attach boundary.
    pub fn subscribe(
        &self,
        filter: ObserveFilter,
        bootstrap: Vec<ProgressEvent>,
    ) -> Result<Subscription, EngineError> {
        let mut subs = self.inner.subs.lock();
        if subs.len() >= self.inner.max_subscribers {
            return Err(EngineError::SubscriberLimit(self.inner.max_subscribers));
        }

        let finished = matches!(filter, ObserveFilter::Job(_))
            && bootstrap.iter().any(|e| e.is_terminal());
        // The bootstrap may exceed the buffer cap (wildcard over many jobs);
        // coalescing applies only to live publication.
        let shared = Arc::new(SubShared {
            state: Mutex::new(SubState {
                filter,
                buffer: bootstrap.into(),
                closed: None,
                finished,
            }),
            notify: Notify::new(),
        });

        let id = SubscriberId::new();
        subs.insert(id, Arc::clone(&shared));
        debug!(subscriber = %id, ?filter, "subscriber attached");
        Ok(Subscription { id, shared, hub: Arc::downgrade(&self.inner) })
    }

    /// Fan one event out to every matching subscription.
    pub fn publish(&self, event: &ProgressEvent) {
        self.inner.events_published.fetch_add(1, Ordering::Relaxed);

        let subs = self.inner.subs.lock();
        for (id, shared) in subs.iter() {
            let mut state = shared.state.lock();
            if state.closed.is_some() {
                continue;
            }
            if !state.filter.matches(event) {
                continue;
            }

            if state.buffer.len() >= self.inner.buffer_cap {
                match state.buffer.iter().position(|e| !e.is_terminal()) {
                    Some(oldest) => {
                        state.buffer.remove(oldest);
                        self.inner.events_coalesced.fetch_add(1, Ordering::Relaxed);
                    }
                    None => {
                        // Nothing coalescable: the subscriber is too far
                        // behind to ever be consistent.
                        state.closed = Some(CloseReason::SlowConsumer);
                        state.buffer.clear();
                        self.inner.force_closed.fetch_add(1, Ordering::Relaxed);
                        warn!(subscriber = %id, "slow consumer closed");
                        drop(state);
                        shared.notify.notify_one();
                        continue;
                    }
                }
            }

            if event.is_terminal() && matches!(state.filter, ObserveFilter::Job(_)) {
                state.finished = true;
            }
            state.buffer.push_back(event.clone());
            drop(state);
            shared.notify.notify_one();
        }
    }

    /// Close every subscription (engine shutdown).
    pub fn close_all(&self) {
        let subs = self.inner.subs.lock();
        for shared in subs.values() {
            let mut state = shared.state.lock();
            if state.closed.is_none() {
                state.closed = Some(CloseReason::Shutdown);
            }
            drop(state);
            shared.notify.notify_one();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subs.lock().len()
    }

    pub fn events_published(&self) -> u64 {
        self.inner.events_published.load(Ordering::Relaxed)
    }

    pub fn events_coalesced(&self) -> u64 {
        self.inner.events_coalesced.load(Ordering::Relaxed)
    }

    pub fn force_closed(&self) -> u64 {
        self.inner.force_closed.load(Ordering::Relaxed)
    }
}

/// A live-update stream handle.
///
/// Dropping the handle detaches the subscription; a transport disconnect
/// tears the subscription down with it.
pub struct Subscription {
    id: SubscriberId,
    shared: Arc<SubShared>,
    hub: std::sync::Weak<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next event in order.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly: single-job filters
    /// end after their terminal event, and shutdown ends every stream.
    /// Returns `Err(SlowConsumer)` when the hub force-closed this
    /// subscription.
    pub async fn next(&mut self) -> Result<Option<ProgressEvent>, EngineError> {
        loop {
            {
                let mut state = self.shared.state.lock();
                if let Some(event) = state.buffer.pop_front() {
                    return Ok(Some(event));
                }
                match state.closed {
                    Some(CloseReason::SlowConsumer) => return Err(EngineError::SlowConsumer),
                    Some(CloseReason::Shutdown) => return Ok(None),
                    None => {}
                }
                if state.finished {
                    return Ok(None);
                }
            }
            self.shared.notify.notified().await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.subs.lock().remove(&self.id);
            debug!(subscriber = %self.id, "subscriber detached");
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
