// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine operation errors.

use ft_core::{ErrorKind, JobId, TrainerKind};
use thiserror::Error;

/// Errors returned synchronously by manager operations.
///
/// Trainer failures are not here: those surface as `failed` terminal
/// transitions on the job, never as an `Err` to the submitter.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("invalid submission: {0}")]
    InvalidConfig(String),

    #[error("trainer kind not available: {0}")]
    UnknownTrainer(TrainerKind),

    #[error("queue is full ({0} entries)")]
    QueueFull(usize),

    #[error("subscriber limit reached ({0})")]
    SubscriberLimit(usize),

    #[error("job already terminal: {0}")]
    Terminal(JobId),

    #[error("subscriber fell behind and was closed")]
    SlowConsumer,

    #[error("engine is shutting down")]
    ShuttingDown,
}

impl EngineError {
    /// Taxonomy tag surfaced on the wire.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            EngineError::UnknownTrainer(_) => ErrorKind::UnknownTrainer,
            EngineError::QueueFull(_) | EngineError::SubscriberLimit(_) => ErrorKind::Capacity,
            EngineError::Terminal(_) => ErrorKind::Terminal,
            EngineError::SlowConsumer => ErrorKind::SlowConsumer,
            EngineError::ShuttingDown => ErrorKind::Internal,
        }
    }
}
