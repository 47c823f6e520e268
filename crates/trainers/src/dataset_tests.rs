// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapter::{NullSink, RunOutcome, TrainerAdapter, TrainerRequest};
use crate::providers::fake::StaticSearchProvider;
use crate::providers::SearchHit;
use ft_core::{ExportFormat, JobId};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn config_doc(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn request(config_ref: String, dataset_ref: Option<String>) -> TrainerRequest {
    TrainerRequest {
        job_id: JobId::new(),
        kind: ft_core::TrainerKind::DatasetAssembly,
        config_ref,
        dataset_ref,
    }
}

fn hit(id: &str, content: &str, quality: f64) -> SearchHit {
    SearchHit {
        document_id: id.to_string(),
        content: content.to_string(),
        quality_score: quality,
        relevance_score: 0.9,
        metadata: Default::default(),
    }
}

#[tokio::test]
async fn assembles_from_search_provider() {
    let export = tempfile::tempdir().unwrap();
    let search = Arc::new(StaticSearchProvider::new(vec![
        hit("d1", "good document one", 0.9),
        hit("d2", "good document two", 0.8),
        hit("d3", "poor document", 0.2),
    ]));
    let trainer = DatasetAssemblyTrainer::new(export.path(), Some(search), None);
    let doc = config_doc(
        "name = \"support\"\nquery = \"q\"\nmin_quality = 0.5\nformats = [\"jsonl\", \"csv\"]\n",
    );
    let req = request(doc.path().display().to_string(), None);

    let outcome = trainer.run(CancellationToken::new(), &req, &NullSink).await;
    let RunOutcome::Completed { artifacts, dataset } = outcome else {
        panic!("expected completion");
    };
    let descriptor = dataset.unwrap();

    // Quality filter removed d3.
    assert_eq!(descriptor.document_count, 2);
    assert_eq!(descriptor.name, "support");
    assert!(descriptor.quality_score_mean > 0.8);
    assert_eq!(descriptor.exports.len(), 2);
    assert!(artifacts.contains_key("descriptor"));
    assert!(artifacts.contains_key("jsonl"));
    assert!(artifacts.contains_key("csv"));

    // The jsonl export matches the line-delimited contract.
    let jsonl = std::fs::read_to_string(descriptor.exports.get(&ExportFormat::Jsonl).unwrap())
        .unwrap();
    assert_eq!(jsonl.lines().count(), 2);
}

#[tokio::test]
async fn duplicate_content_is_dropped() {
    let export = tempfile::tempdir().unwrap();
    let search = Arc::new(StaticSearchProvider::new(vec![
        hit("d1", "same text", 0.9),
        hit("d2", "same text", 0.9),
        hit("d3", "different text", 0.9),
    ]));
    let trainer = DatasetAssemblyTrainer::new(export.path(), Some(search), None);
    let doc = config_doc("name = \"dedup\"\nquery = \"q\"\n");
    let req = request(doc.path().display().to_string(), None);

    let outcome = trainer.run(CancellationToken::new(), &req, &NullSink).await;
    let RunOutcome::Completed { dataset, .. } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(dataset.unwrap().document_count, 2);
}

#[tokio::test]
async fn max_documents_caps_retention() {
    let export = tempfile::tempdir().unwrap();
    let hits: Vec<SearchHit> =
        (0..20).map(|i| hit(&format!("d{}", i), &format!("text {}", i), 0.9)).collect();
    let trainer =
        DatasetAssemblyTrainer::new(export.path(), Some(Arc::new(StaticSearchProvider::new(hits))), None);
    let doc = config_doc("name = \"capped\"\nquery = \"q\"\nmax_documents = 5\n");
    let req = request(doc.path().display().to_string(), None);

    let outcome = trainer.run(CancellationToken::new(), &req, &NullSink).await;
    let RunOutcome::Completed { dataset, .. } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(dataset.unwrap().document_count, 5);
}

#[tokio::test]
async fn falls_back_to_filesystem_scan() {
    let export = tempfile::tempdir().unwrap();
    let corpus = tempfile::tempdir().unwrap();
    std::fs::write(corpus.path().join("a.txt"), "first document body").unwrap();
    std::fs::write(corpus.path().join("b.md"), "second document body").unwrap();

    let trainer = DatasetAssemblyTrainer::new(export.path(), None, None);
    // Scan quality is 0.5, so min_quality must admit it.
    let doc = config_doc("name = \"scan\"\nmin_quality = 0.3\n");
    let req = request(
        doc.path().display().to_string(),
        Some(corpus.path().display().to_string()),
    );

    let outcome = trainer.run(CancellationToken::new(), &req, &NullSink).await;
    let RunOutcome::Completed { dataset, .. } = outcome else {
        panic!("expected completion");
    };
    let descriptor = dataset.unwrap();
    assert_eq!(descriptor.document_count, 2);
    assert_eq!(descriptor.total_tokens, 6);
}

#[tokio::test]
async fn no_source_at_all_fails() {
    let export = tempfile::tempdir().unwrap();
    let trainer = DatasetAssemblyTrainer::new(export.path(), None, None);
    let doc = config_doc("name = \"nowhere\"\n");
    let req = request(doc.path().display().to_string(), None);

    let outcome = trainer.run(CancellationToken::new(), &req, &NullSink).await;
    assert!(matches!(outcome, RunOutcome::Failed { .. }));
}

#[tokio::test]
async fn descriptor_file_round_trips() {
    let export = tempfile::tempdir().unwrap();
    let search = Arc::new(StaticSearchProvider::new(vec![hit("d1", "doc", 0.9)]));
    let trainer = DatasetAssemblyTrainer::new(export.path(), Some(search), None);
    let doc = config_doc("name = \"rt\"\nquery = \"q\"\nformats = [\"columnar\"]\n");
    let req = request(doc.path().display().to_string(), None);

    let outcome = trainer.run(CancellationToken::new(), &req, &NullSink).await;
    let RunOutcome::Completed { artifacts, dataset } = outcome else {
        panic!("expected completion");
    };
    let on_disk: ft_core::DatasetDescriptor = serde_json::from_str(
        &std::fs::read_to_string(artifacts.get("descriptor").unwrap()).unwrap(),
    )
    .unwrap();
    assert_eq!(on_disk, dataset.unwrap());
}
