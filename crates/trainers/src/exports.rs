// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dataset export writers.
//!
//! One writer per [`ExportFormat`]. All writers take the same retained
//! document slice so every export of a dataset describes the same rows.

use crate::providers::Document;
use ft_core::ExportFormat;
use serde_json::json;
use std::io::Write;
use std::path::Path;

/// Write one export file; returns nothing, errors bubble as io errors.
pub fn write_export(
    format: ExportFormat,
    path: &Path,
    documents: &[Document],
) -> std::io::Result<()> {
    match format {
        ExportFormat::Jsonl => write_jsonl(path, documents),
        ExportFormat::Csv => write_csv(path, documents),
        ExportFormat::Columnar => write_columnar(path, documents),
    }
}

/// One UTF-8 JSON object per line, LF-terminated: `{id, text, meta}`.
fn write_jsonl(path: &Path, documents: &[Document]) -> std::io::Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for doc in documents {
        let line = json!({
            "id": doc.id,
            "text": doc.text,
            "meta": doc.meta,
        });
        file.write_all(line.to_string().as_bytes())?;
        file.write_all(b"\n")?;
    }
    file.flush()
}

/// Header row then one record per document, RFC-4180 style quoting.
fn write_csv(path: &Path, documents: &[Document]) -> std::io::Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    file.write_all(b"id,text,quality\n")?;
    for doc in documents {
        writeln!(
            file,
            "{},{},{:.4}",
            csv_field(&doc.id),
            csv_field(&doc.text),
            doc.quality
        )?;
    }
    file.flush()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Column-major JSON: `{rows, columns: {id: [...], text: [...], quality: [...]}}`.
fn write_columnar(path: &Path, documents: &[Document]) -> std::io::Result<()> {
    let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
    let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
    let quality: Vec<f64> = documents.iter().map(|d| d.quality).collect();

    let body = json!({
        "rows": documents.len(),
        "columns": {
            "id": ids,
            "text": texts,
            "quality": quality,
        },
    });
    std::fs::write(path, serde_json::to_vec_pretty(&body)?)
}

#[cfg(test)]
#[path = "exports_tests.rs"]
mod tests;
