// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Table of trainer adapters keyed by kind.

use crate::adapter::TrainerAdapter;
use crate::continuous::ContinuousTrainer;
use crate::dataset::DatasetAssemblyTrainer;
use crate::lora::AdapterTrainer;
use crate::providers::{FeedbackProvider, SearchProvider};
use ft_core::TrainerKind;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Registry resolving a [`TrainerKind`] to its adapter.
///
/// A deployment registers only the kinds it serves; submitting a kind with
/// no entry is rejected upstream as an unknown trainer.
#[derive(Default)]
pub struct TrainerRegistry {
    table: HashMap<TrainerKind, Arc<dyn TrainerAdapter>>,
}

impl TrainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own kind, replacing any previous entry.
    pub fn register(&mut self, adapter: Arc<dyn TrainerAdapter>) {
        self.table.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: TrainerKind) -> Option<Arc<dyn TrainerAdapter>> {
        self.table.get(&kind).cloned()
    }

    pub fn contains(&self, kind: TrainerKind) -> bool {
        self.table.contains_key(&kind)
    }

    /// Registered kinds in stable order.
    pub fn kinds(&self) -> Vec<TrainerKind> {
        let mut kinds: Vec<TrainerKind> = self.table.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Build the standard training-service registry.
    pub fn training(
        export_root: impl Into<PathBuf>,
        feedback: Option<Arc<dyn FeedbackProvider>>,
    ) -> Self {
        let export_root = export_root.into();
        let mut registry = Self::new();
        registry.register(Arc::new(AdapterTrainer::lora(export_root.clone())));
        registry.register(Arc::new(AdapterTrainer::qlora(export_root.clone())));
        registry.register(Arc::new(ContinuousTrainer::new(export_root, feedback)));
        registry
    }

    /// Build the standard dataset-service registry.
    pub fn dataset(
        export_root: impl Into<PathBuf>,
        search: Option<Arc<dyn SearchProvider>>,
        document_root: Option<PathBuf>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DatasetAssemblyTrainer::new(
            export_root.into(),
            search,
            document_root,
        )));
        registry
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
