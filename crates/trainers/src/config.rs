// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trainer configuration documents.
//!
//! A `config_ref` resolves to a TOML document on local disk. Loading parses
//! and range-checks the shape; interpretation of the values stays inside the
//! owning trainer.

use crate::adapter::TrainerError;
use ft_core::ExportFormat;
use serde::Deserialize;
use std::path::PathBuf;

/// Resolve a config reference to a filesystem path.
///
/// Accepts bare paths and `file:` prefixed refs; other schemes are rejected
/// at validation time by the read failing.
pub fn resolve_ref(config_ref: &str) -> PathBuf {
    PathBuf::from(config_ref.strip_prefix("file:").unwrap_or(config_ref))
}

fn read_document(config_ref: &str) -> Result<String, TrainerError> {
    let path = resolve_ref(config_ref);
    std::fs::read_to_string(&path).map_err(|e| {
        TrainerError::InvalidConfig(format!("config ref '{}' unreadable: {}", config_ref, e))
    })
}

fn parse<T: serde::de::DeserializeOwned>(config_ref: &str) -> Result<T, TrainerError> {
    let raw = read_document(config_ref)?;
    toml::from_str(&raw)
        .map_err(|e| TrainerError::InvalidConfig(format!("config ref '{}': {}", config_ref, e)))
}

fn require(cond: bool, message: &str) -> Result<(), TrainerError> {
    if cond {
        Ok(())
    } else {
        Err(TrainerError::InvalidConfig(message.to_string()))
    }
}

/// Document for the LoRA and QLoRA kinds.
#[derive(Debug, Clone, Deserialize)]
pub struct AdapterTrainConfig {
    pub base_model: String,
    pub rank: u32,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    pub epochs: u32,
    pub steps_per_epoch: u64,
    pub learning_rate: f64,
    /// Pacing knob for the simulated step loop; zero means no pacing.
    #[serde(default)]
    pub step_duration_ms: u64,
    /// Required for QLoRA, rejected for plain LoRA.
    #[serde(default)]
    pub quant_bits: Option<u8>,
}

fn default_alpha() -> f64 {
    16.0
}

impl AdapterTrainConfig {
    pub fn load(config_ref: &str, quantized: bool) -> Result<Self, TrainerError> {
        let cfg: AdapterTrainConfig = parse(config_ref)?;
        cfg.check(quantized)?;
        Ok(cfg)
    }

    fn check(&self, quantized: bool) -> Result<(), TrainerError> {
        require(!self.base_model.is_empty(), "base_model must be set")?;
        require((1..=256).contains(&self.rank), "rank must be in 1..=256")?;
        require(self.epochs >= 1, "epochs must be at least 1")?;
        require(self.steps_per_epoch >= 1, "steps_per_epoch must be at least 1")?;
        require(self.learning_rate > 0.0, "learning_rate must be positive")?;
        match (quantized, self.quant_bits) {
            (true, Some(4 | 8)) => Ok(()),
            (true, Some(bits)) => Err(TrainerError::InvalidConfig(format!(
                "quant_bits must be 4 or 8, got {}",
                bits
            ))),
            (true, None) => Err(TrainerError::InvalidConfig("quant_bits required".to_string())),
            (false, Some(_)) => {
                Err(TrainerError::InvalidConfig("quant_bits is a qlora setting".to_string()))
            }
            (false, None) => Ok(()),
        }
    }

    pub fn total_steps(&self) -> u64 {
        self.steps_per_epoch.saturating_mul(self.epochs as u64)
    }
}

/// Document for the continuous-learning kind.
#[derive(Debug, Clone, Deserialize)]
pub struct ContinuousConfig {
    pub base_adapter: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_drain_limit")]
    pub drain_limit: usize,
    #[serde(default = "default_passes")]
    pub passes: u32,
    #[serde(default)]
    pub step_duration_ms: u64,
}

fn default_batch_size() -> u32 {
    16
}

fn default_drain_limit() -> usize {
    256
}

fn default_passes() -> u32 {
    1
}

impl ContinuousConfig {
    pub fn load(config_ref: &str) -> Result<Self, TrainerError> {
        let cfg: ContinuousConfig = parse(config_ref)?;
        require(!cfg.base_adapter.is_empty(), "base_adapter must be set")?;
        require(cfg.batch_size >= 1, "batch_size must be at least 1")?;
        require(cfg.drain_limit >= 1, "drain_limit must be at least 1")?;
        require(cfg.passes >= 1, "passes must be at least 1")?;
        Ok(cfg)
    }
}

/// Document for the dataset-assembly kind.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    /// Search query; required only when assembly goes through a search
    /// provider.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_min_quality")]
    pub min_quality: f64,
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
    #[serde(default = "default_formats", deserialize_with = "formats_from_strings")]
    pub formats: Vec<ExportFormat>,
}

fn default_min_quality() -> f64 {
    0.5
}

fn default_max_documents() -> usize {
    10_000
}

fn default_formats() -> Vec<ExportFormat> {
    vec![ExportFormat::Jsonl]
}

fn formats_from_strings<'de, D>(deserializer: D) -> Result<Vec<ExportFormat>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let names: Vec<String> = Vec::deserialize(deserializer)?;
    names
        .iter()
        .map(|name| {
            ExportFormat::parse(name)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown format '{}'", name)))
        })
        .collect()
}

impl DatasetConfig {
    pub fn load(config_ref: &str) -> Result<Self, TrainerError> {
        let cfg: DatasetConfig = parse(config_ref)?;
        require(!cfg.name.is_empty(), "name must be set")?;
        require(
            (0.0..=1.0).contains(&cfg.min_quality),
            "min_quality must be in 0.0..=1.0",
        )?;
        require(cfg.max_documents >= 1, "max_documents must be at least 1")?;
        require(!cfg.formats.is_empty(), "formats must not be empty")?;
        Ok(cfg)
    }
}

/// Existence probe used by submit-time validation paths that do not need the
/// parsed document.
pub fn ref_exists(config_ref: &str) -> bool {
    resolve_ref(config_ref).is_file()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
