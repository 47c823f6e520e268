// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Continuous learning over a live feedback buffer.

use crate::adapter::{ProgressSink, RunOutcome, TrainerAdapter, TrainerError, TrainerRequest};
use crate::config::ContinuousConfig;
use crate::providers::FeedbackProvider;
use ft_core::{ProgressDelta, TrainerKind};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Trainer for the continuous-learning kind.
///
/// Drains the feedback provider in passes of up to `drain_limit` items,
/// stopping early when the buffer runs dry. A deployment without a feedback
/// provider completes immediately with zero items consumed; an empty buffer
/// is normal operation, not an error.
pub struct ContinuousTrainer {
    export_root: PathBuf,
    feedback: Option<Arc<dyn FeedbackProvider>>,
}

impl ContinuousTrainer {
    pub fn new(
        export_root: impl Into<PathBuf>,
        feedback: Option<Arc<dyn FeedbackProvider>>,
    ) -> Self {
        Self { export_root: export_root.into(), feedback }
    }

    fn write_manifest(
        &self,
        request: &TrainerRequest,
        config: &ContinuousConfig,
        consumed: u64,
        score_mean: f64,
    ) -> Result<String, TrainerError> {
        let dir = self.export_root.join("adapters").join(request.job_id.as_str());
        std::fs::create_dir_all(&dir)?;

        let manifest = json!({
            "job_id": request.job_id,
            "kind": TrainerKind::Continuous,
            "base_adapter": config.base_adapter,
            "dataset_ref": request.dataset_ref,
            "feedback_consumed": consumed,
            "feedback_score_mean": score_mean,
            "batch_size": config.batch_size,
        });

        let path = dir.join("adapter.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&manifest)?)?;
        Ok(path.to_string_lossy().into_owned())
    }
}

#[async_trait::async_trait]
impl TrainerAdapter for ContinuousTrainer {
    fn kind(&self) -> TrainerKind {
        TrainerKind::Continuous
    }

    async fn validate(&self, request: &TrainerRequest) -> Result<(), TrainerError> {
        ContinuousConfig::load(&request.config_ref).map(|_| ())
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        request: &TrainerRequest,
        sink: &dyn ProgressSink,
    ) -> RunOutcome {
        let config = match ContinuousConfig::load(&request.config_ref) {
            Ok(c) => c,
            Err(e) => return RunOutcome::failed(e.into_job_error()),
        };

        // Upper bound on work; the buffer usually dries up earlier.
        let budget = (config.drain_limit as u64).saturating_mul(config.passes as u64);
        sink.report(ProgressDelta::epochs(0, config.passes).with_steps(0, budget));

        let mut consumed = 0u64;
        let mut score_sum = 0.0f64;

        for pass in 0..config.passes {
            if cancel.is_cancelled() {
                return RunOutcome::Cancelled;
            }

            let items = match &self.feedback {
                Some(provider) => match provider.drain(config.drain_limit).await {
                    Ok(items) => items,
                    Err(e) => return RunOutcome::failed(e.into_job_error()),
                },
                None => Vec::new(),
            };

            if items.is_empty() {
                debug!(job = %request.job_id, pass, "feedback buffer empty, finishing early");
                break;
            }

            for batch in items.chunks(config.batch_size as usize) {
                if config.step_duration_ms > 0 {
                    tokio::select! {
                        _ = cancel.cancelled() => return RunOutcome::Cancelled,
                        _ = tokio::time::sleep(Duration::from_millis(config.step_duration_ms)) => {}
                    }
                } else if cancel.is_cancelled() {
                    return RunOutcome::Cancelled;
                }

                consumed += batch.len() as u64;
                score_sum += batch.iter().map(|i| i.score).sum::<f64>();
            }

            let score_mean = if consumed > 0 { score_sum / consumed as f64 } else { 0.0 };
            sink.report(
                ProgressDelta::epochs(pass + 1, config.passes)
                    .with_steps(consumed, budget)
                    .metric("feedback_score_mean", score_mean),
            );
        }

        let score_mean = if consumed > 0 { score_sum / consumed as f64 } else { 0.0 };
        match self.write_manifest(request, &config, consumed, score_mean) {
            Ok(path) => {
                let mut artifacts = BTreeMap::new();
                artifacts.insert("adapter".to_string(), path);
                RunOutcome::completed(artifacts)
            }
            Err(e) => RunOutcome::failed(e.into_job_error()),
        }
    }
}

#[cfg(test)]
#[path = "continuous_tests.rs"]
mod tests;
