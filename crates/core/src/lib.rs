// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core domain types for the Finetuned training control plane.
//!
//! This crate holds the vocabulary shared by every other crate: identifiers,
//! the job record and its state machine, progress events, the error taxonomy,
//! principals and roles, and metrics snapshots. It contains no I/O and no
//! runtime dependencies beyond ID generation.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod dataset;
pub mod error;
pub mod id;
pub mod job;
mod macros;
pub mod metrics;
pub mod principal;
pub mod progress;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use dataset::{DatasetDescriptor, DatasetId, ExportFormat};
pub use error::ErrorKind;
pub use id::short;
pub use job::{Job, JobError, JobId, JobSpec, JobStatus, Priority, TrainerKind};
pub use metrics::MetricsSnapshot;
pub use principal::{Principal, Role, MOCK_PRINCIPAL};
pub use progress::{Progress, ProgressDelta, ProgressError, ProgressEvent};
