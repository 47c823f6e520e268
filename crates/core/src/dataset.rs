// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dataset-assembly output types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

crate::define_id! {
    /// Unique identifier for an assembled dataset.
    pub struct DatasetId("dst-");
}

/// Export encodings a dataset-assembly job can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// One UTF-8 JSON object per line, LF-terminated.
    Jsonl,
    /// Column-major chunks for analytical readers.
    Columnar,
    /// Comma-separated values with a header row.
    Csv,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] =
        [ExportFormat::Jsonl, ExportFormat::Columnar, ExportFormat::Csv];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::Columnar => "columns.json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn parse(s: &str) -> Option<ExportFormat> {
        match s {
            "jsonl" => Some(ExportFormat::Jsonl),
            "columnar" => Some(ExportFormat::Columnar),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }
}

crate::simple_display! {
    ExportFormat {
        Jsonl => "jsonl",
        Columnar => "columnar",
        Csv => "csv",
    }
}

/// Summary of a completed dataset-assembly run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub dataset_id: DatasetId,
    pub name: String,
    pub document_count: u64,
    /// Whitespace-token estimate across all retained documents.
    pub total_tokens: u64,
    pub quality_score_mean: f64,
    /// Artifact location per produced export format.
    pub exports: BTreeMap<ExportFormat, String>,
}

#[cfg(test)]
#[path = "dataset_tests.rs"]
mod tests;
