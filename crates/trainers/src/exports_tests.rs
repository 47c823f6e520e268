// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::providers::Document;
use ft_core::ExportFormat;
use std::collections::BTreeMap;

fn docs() -> Vec<Document> {
    vec![
        Document {
            id: "d1".to_string(),
            text: "hello world".to_string(),
            quality: 0.9,
            meta: BTreeMap::from([("source".to_string(), "test".to_string())]),
        },
        Document {
            id: "d2".to_string(),
            text: "quoted \"text\", with commas\nand a newline".to_string(),
            quality: 0.6,
            meta: BTreeMap::new(),
        },
    ]
}

#[test]
fn jsonl_writes_one_object_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.jsonl");
    write_export(ExportFormat::Jsonl, &path, &docs()).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.ends_with('\n'));
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["id"], "d1");
    assert_eq!(first["text"], "hello world");
    assert_eq!(first["meta"]["source"], "test");

    // The multi-line document still occupies exactly one line.
    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["id"], "d2");
}

#[test]
fn csv_quotes_awkward_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    write_export(ExportFormat::Csv, &path, &docs()).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.starts_with("id,text,quality\n"));
    assert!(raw.contains("\"quoted \"\"text\"\", with commas\nand a newline\""));
}

#[test]
fn columnar_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.columns.json");
    write_export(ExportFormat::Columnar, &path, &docs()).unwrap();

    let body: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(body["rows"], 2);
    assert_eq!(body["columns"]["id"][1], "d2");
    assert_eq!(body["columns"]["quality"][0], 0.9);
}

#[test]
fn empty_document_set_is_valid() {
    let dir = tempfile::tempdir().unwrap();
    for format in ExportFormat::ALL {
        let path = dir.path().join(format!("empty.{}", format.extension()));
        write_export(format, &path, &[]).unwrap();
        assert!(path.is_file());
    }
}
