// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Principals and the role capability model.

use crate::job::TrainerKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Synthetic principal identifier used by the debug auth mode.
pub const MOCK_PRINCIPAL: &str = "mock-principal";

/// Capabilities a principal may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full control over every job.
    Admin,
    /// Submit and cancel training jobs.
    Trainer,
    /// Submit and cancel dataset-assembly jobs; read all jobs.
    Analyst,
    /// Read only.
    Viewer,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "trainer" => Some(Role::Trainer),
            "analyst" => Some(Role::Analyst),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }
}

crate::simple_display! {
    Role {
        Admin => "admin",
        Trainer => "trainer",
        Analyst => "analyst",
        Viewer => "viewer",
    }
}

/// The authenticated identity a request runs as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(id: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self { id: id.into(), roles: roles.into_iter().collect() }
    }

    /// Unauthenticated caller with no capabilities.
    pub fn anonymous() -> Self {
        Self { id: "anonymous".to_string(), roles: BTreeSet::new() }
    }

    /// The debug-mode synthetic principal.
    pub fn mock(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::new(MOCK_PRINCIPAL, roles)
    }

    pub fn has(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether this principal holds the capability tied to a trainer kind:
    /// training kinds need `trainer`, dataset assembly needs `analyst` or
    /// `trainer`. `admin` always qualifies.
    pub fn has_kind_capability(&self, kind: TrainerKind) -> bool {
        if self.has(Role::Admin) {
            return true;
        }
        if kind.is_training() {
            self.has(Role::Trainer)
        } else {
            self.has(Role::Analyst) || self.has(Role::Trainer)
        }
    }

    /// Submit is gated purely on the kind capability.
    pub fn can_submit(&self, kind: TrainerKind) -> bool {
        self.has_kind_capability(kind)
    }

    /// Cancel requires admin, or ownership plus the kind capability.
    pub fn can_cancel(&self, submitted_by: &str, kind: TrainerKind) -> bool {
        if self.has(Role::Admin) {
            return true;
        }
        self.id == submitted_by && self.has_kind_capability(kind)
    }

    /// Get, List, and Observe are open to any role holder.
    pub fn can_read(&self) -> bool {
        !self.roles.is_empty()
    }
}

#[cfg(test)]
#[path = "principal_tests.rs"]
mod tests;
