// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Epoch-structured adapter training (LoRA and QLoRA kinds).

use crate::adapter::{
    ProgressSink, ReportGate, RunOutcome, TrainerAdapter, TrainerError, TrainerRequest,
};
use crate::config::AdapterTrainConfig;
use ft_core::{ProgressDelta, TrainerKind};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Trainer for the LoRA and QLoRA kinds.
///
/// The two kinds share the epoch/step structure; QLoRA additionally
/// requires quantization settings in its config document. Work is simulated
/// and paced by `step_duration_ms`, producing the same observable lifecycle
/// a real training backend would: epoch-boundary progress, a decreasing
/// loss metric, and an adapter manifest artifact on success.
pub struct AdapterTrainer {
    kind: TrainerKind,
    export_root: PathBuf,
}

impl AdapterTrainer {
    pub fn lora(export_root: impl Into<PathBuf>) -> Self {
        Self { kind: TrainerKind::Lora, export_root: export_root.into() }
    }

    pub fn qlora(export_root: impl Into<PathBuf>) -> Self {
        Self { kind: TrainerKind::Qlora, export_root: export_root.into() }
    }

    fn quantized(&self) -> bool {
        self.kind == TrainerKind::Qlora
    }

    /// Simulated loss curve: smooth decay toward a floor.
    fn loss_at(fraction: f64) -> f64 {
        (2.5 * (-1.7 * fraction).exp()).max(0.05)
    }

    fn write_manifest(
        &self,
        request: &TrainerRequest,
        config: &AdapterTrainConfig,
        final_loss: f64,
    ) -> Result<String, TrainerError> {
        let dir = self.export_root.join("adapters").join(request.job_id.as_str());
        std::fs::create_dir_all(&dir)?;

        let manifest = json!({
            "job_id": request.job_id,
            "kind": self.kind,
            "base_model": config.base_model,
            "dataset_ref": request.dataset_ref,
            "rank": config.rank,
            "alpha": config.alpha,
            "quant_bits": config.quant_bits,
            "epochs": config.epochs,
            "steps": config.total_steps(),
            "learning_rate": config.learning_rate,
            "final_loss": final_loss,
        });

        let path = dir.join("adapter.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&manifest)?)?;
        Ok(path.to_string_lossy().into_owned())
    }
}

#[async_trait::async_trait]
impl TrainerAdapter for AdapterTrainer {
    fn kind(&self) -> TrainerKind {
        self.kind
    }

    async fn validate(&self, request: &TrainerRequest) -> Result<(), TrainerError> {
        AdapterTrainConfig::load(&request.config_ref, self.quantized()).map(|_| ())
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        request: &TrainerRequest,
        sink: &dyn ProgressSink,
    ) -> RunOutcome {
        let config = match AdapterTrainConfig::load(&request.config_ref, self.quantized()) {
            Ok(c) => c,
            Err(e) => return RunOutcome::failed(e.into_job_error()),
        };

        let total_steps = config.total_steps();
        sink.report(ProgressDelta::epochs(0, config.epochs).with_steps(0, total_steps));

        let gate = ReportGate::per_second();
        let mut done_steps = 0u64;
        let mut loss = Self::loss_at(0.0);

        for epoch in 0..config.epochs {
            if cancel.is_cancelled() {
                return RunOutcome::Cancelled;
            }

            for _ in 0..config.steps_per_epoch {
                if config.step_duration_ms > 0 {
                    tokio::select! {
                        _ = cancel.cancelled() => return RunOutcome::Cancelled,
                        _ = tokio::time::sleep(Duration::from_millis(config.step_duration_ms)) => {}
                    }
                } else if cancel.is_cancelled() {
                    return RunOutcome::Cancelled;
                }

                done_steps += 1;
                loss = Self::loss_at(done_steps as f64 / total_steps as f64);

                if gate.permit() {
                    sink.report(
                        ProgressDelta::steps(done_steps, total_steps).metric("loss", loss),
                    );
                }
            }

            // Epoch boundaries always report, bypassing the gate.
            sink.report(
                ProgressDelta::epochs(epoch + 1, config.epochs)
                    .with_steps(done_steps, total_steps)
                    .metric("loss", loss)
                    .metric("learning_rate", config.learning_rate),
            );
            debug!(job = %request.job_id, epoch = epoch + 1, loss, "epoch finished");
        }

        match self.write_manifest(request, &config, loss) {
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
#[path = "lora_tests.rs"]
mod tests;
