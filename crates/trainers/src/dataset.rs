// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dataset assembly: gather, filter, deduplicate, export.

use crate::adapter::{ProgressSink, RunOutcome, TrainerAdapter, TrainerError, TrainerRequest};
use crate::config::DatasetConfig;
use crate::exports::write_export;
use crate::providers::{Document, FsDocumentSource, SearchProvider};
use ft_core::{DatasetDescriptor, DatasetId, ProgressDelta, TrainerKind};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How many documents are processed between cancellation checks and
/// progress reports.
const CHUNK: usize = 32;

/// Trainer for the dataset-assembly kind.
///
/// With a search provider configured and a `query` in the config document,
/// assembly is retrieval-driven; otherwise it degrades to an ordered scan of
/// the configured document root. Retained documents are deduplicated by
/// content fingerprint, filtered by quality, capped, then written once per
/// requested export format.
pub struct DatasetAssemblyTrainer {
    export_root: PathBuf,
    search: Option<Arc<dyn SearchProvider>>,
    document_root: Option<PathBuf>,
}

impl DatasetAssemblyTrainer {
    pub fn new(
        export_root: impl Into<PathBuf>,
        search: Option<Arc<dyn SearchProvider>>,
        document_root: Option<PathBuf>,
    ) -> Self {
        Self { export_root: export_root.into(), search, document_root }
    }

    async fn gather(
        &self,
        request: &TrainerRequest,
        config: &DatasetConfig,
    ) -> Result<Vec<Document>, TrainerError> {
        if let (Some(search), Some(query)) = (&self.search, &config.query) {
            let hits = search.search(query).await?;
            return Ok(hits.into_iter().map(Document::from).collect());
        }

        // Graceful degradation: ordered read from storage. The dataset_ref,
        // when present, overrides the configured document root.
        let root = request
            .dataset_ref
            .as_ref()
            .map(PathBuf::from)
            .or_else(|| self.document_root.clone())
            .ok_or_else(|| {
                TrainerError::Provider(
                    "no search provider and no document root configured".to_string(),
                )
            })?;
        // Over-collect so quality filtering still has max_documents to pick from.
        FsDocumentSource::new(root).scan(config.max_documents.saturating_mul(2))
    }
}

fn fingerprint(text: &str) -> [u8; 32] {
    Sha256::digest(text.as_bytes()).into()
}

fn token_estimate(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

#[async_trait::async_trait]
impl TrainerAdapter for DatasetAssemblyTrainer {
    fn kind(&self) -> TrainerKind {
        TrainerKind::DatasetAssembly
    }

    async fn validate(&self, request: &TrainerRequest) -> Result<(), TrainerError> {
        DatasetConfig::load(&request.config_ref).map(|_| ())
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        request: &TrainerRequest,
        sink: &dyn ProgressSink,
    ) -> RunOutcome {
        let config = match DatasetConfig::load(&request.config_ref) {
            Ok(c) => c,
            Err(e) => return RunOutcome::failed(e.into_job_error()),
        };

        let candidates = match self.gather(request, &config).await {
            Ok(docs) => docs,
            Err(e) => return RunOutcome::failed(e.into_job_error()),
        };

        let total = candidates.len() as u64;
        sink.report(ProgressDelta::steps(0, total));

        let mut seen = BTreeSet::new();
        let mut retained: Vec<Document> = Vec::new();
        let mut processed = 0u64;

        for chunk in candidates.chunks(CHUNK) {
            if cancel.is_cancelled() {
                return RunOutcome::Cancelled;
            }

            for doc in chunk {
                processed += 1;
                if retained.len() >= config.max_documents {
                    continue;
                }
                if doc.quality < config.min_quality {
                    continue;
                }
                if !seen.insert(fingerprint(&doc.text)) {
                    continue;
                }
                retained.push(doc.clone());
            }

            sink.report(
                ProgressDelta::steps(processed, total)
                    .metric("retained", retained.len() as f64),
            );
            // Chunk boundaries double as scheduling points for long scans.
            tokio::task::yield_now().await;
        }

        let dataset_id = DatasetId::new();
        let dir = self.export_root.join("datasets").join(dataset_id.as_str());
        if let Err(e) = std::fs::create_dir_all(&dir) {
            return RunOutcome::failed(TrainerError::from(e).into_job_error());
        }

        let mut exports = BTreeMap::new();
        let mut artifacts = BTreeMap::new();
        for format in &config.formats {
            if cancel.is_cancelled() {
                return RunOutcome::Cancelled;
            }
            let path = dir.join(format!("{}.{}", config.name, format.extension()));
            if let Err(e) = write_export(*format, &path, &retained) {
                return RunOutcome::failed(TrainerError::from(e).into_job_error());
            }
            let location = path.to_string_lossy().into_owned();
            exports.insert(*format, location.clone());
            artifacts.insert(format.to_string(), location);
            debug!(job = %request.job_id, %format, "export written");
        }

        let quality_score_mean = if retained.is_empty() {
            0.0
        } else {
            retained.iter().map(|d| d.quality).sum::<f64>() / retained.len() as f64
        };
        let descriptor = DatasetDescriptor {
            dataset_id,
            name: config.name.clone(),
            document_count: retained.len() as u64,
            total_tokens: retained.iter().map(|d| token_estimate(&d.text)).sum(),
            quality_score_mean,
            exports,
        };

        let descriptor_path = dir.join("descriptor.json");
        let body = match serde_json::to_vec_pretty(&descriptor) {
            Ok(b) => b,
            Err(e) => return RunOutcome::failed(TrainerError::from(e).into_job_error()),
        };
        if let Err(e) = std::fs::write(&descriptor_path, body) {
            return RunOutcome::failed(TrainerError::from(e).into_job_error());
        }
        artifacts
            .insert("descriptor".to_string(), descriptor_path.to_string_lossy().into_owned());

        info!(
            job = %request.job_id,
            dataset = %descriptor.dataset_id,
            documents = descriptor.document_count,
            "dataset assembled"
        );

        RunOutcome::Completed { artifacts, dataset: Some(descriptor) }
    }
}

#[cfg(test)]
#[path = "dataset_tests.rs"]
mod tests;
