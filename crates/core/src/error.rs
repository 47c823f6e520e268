// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed error taxonomy surfaced on the wire and on failed jobs.

use serde::{Deserialize, Serialize};

/// Every error the service reports carries exactly one of these tags.
///
/// Wire representation is the snake_case name (also the `Display` form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown or evicted job ID.
    NotFound,
    /// Submission rejected by shape or trainer validation.
    InvalidConfig,
    /// Trainer kind not implemented or not enabled in this deployment.
    UnknownTrainer,
    /// Queue or subscriber limit reached.
    Capacity,
    /// Cancel of a job already in a terminal state.
    Terminal,
    /// Authenticated but lacking the required role.
    AuthInsufficient,
    /// Missing or invalid credential where one is required.
    Unauthenticated,
    /// Trainer ignored cancellation past the grace window.
    CancelTimeout,
    /// Job exceeded its run timeout.
    Timeout,
    /// Subscriber dropped for falling behind.
    SlowConsumer,
    /// Anything unexpected from a trainer or infrastructure call.
    Internal,
}

crate::simple_display! {
    ErrorKind {
        NotFound => "not_found",
        InvalidConfig => "invalid_config",
        UnknownTrainer => "unknown_trainer",
        Capacity => "capacity",
        Terminal => "terminal",
        AuthInsufficient => "auth_insufficient",
        Unauthenticated => "unauthenticated",
        CancelTimeout => "cancel_timeout",
        Timeout => "timeout",
        SlowConsumer => "slow_consumer",
        Internal => "internal",
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
