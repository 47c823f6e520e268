// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External collaborator interfaces: search and feedback providers.
//!
//! Both are optional. Dataset assembly degrades to a linear filesystem scan
//! when no search provider is configured; continuous learning treats a
//! missing feedback provider as an empty buffer.

use crate::adapter::TrainerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A retrieved document with retrieval scores attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub document_id: String,
    pub content: String,
    pub quality_score: f64,
    pub relevance_score: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Content-based retrieval, consumed by dataset assembly.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, TrainerError>;
}

/// One piece of user feedback for continuous learning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub text: String,
    pub score: f64,
    pub timestamp_ms: u64,
}

/// Live feedback buffer, consumed by the continuous trainer.
///
/// `drain` removes and returns up to `limit` items; repeated drains walk
/// the buffer down to empty.
#[async_trait::async_trait]
pub trait FeedbackProvider: Send + Sync {
    async fn drain(&self, limit: usize) -> Result<Vec<FeedbackItem>, TrainerError>;
}

/// A document as the assembly pipeline sees it, whatever its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub quality: f64,
    pub meta: BTreeMap<String, String>,
}

impl From<SearchHit> for Document {
    fn from(hit: SearchHit) -> Self {
        let mut meta = hit.metadata;
        meta.insert("relevance".to_string(), format!("{:.4}", hit.relevance_score));
        Document { id: hit.document_id, text: hit.content, quality: hit.quality_score, meta }
    }
}

/// Quality assigned to documents read off disk, where no scorer ran.
pub const SCAN_QUALITY: f64 = 0.5;

/// Fallback document source: ordered scan of a directory tree.
///
/// Only `.txt` and `.md` files are considered; traversal order is sorted
/// by file name so repeated assemblies are deterministic.
pub struct FsDocumentSource {
    root: PathBuf,
}

impl FsDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn scan(&self, limit: usize) -> Result<Vec<Document>, TrainerError> {
        let mut files = Vec::new();
        collect_files(&self.root, &mut files)?;
        files.sort();

        let mut documents = Vec::new();
        for path in files.into_iter().take(limit) {
            let text = std::fs::read_to_string(&path)?;
            let id = path
                .strip_prefix(&self.root)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            let mut meta = BTreeMap::new();
            meta.insert("source".to_string(), "fs".to_string());
            documents.push(Document { id, text, quality: SCAN_QUALITY, meta });
        }
        Ok(documents)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), TrainerError> {
    if !dir.is_dir() {
        return Err(TrainerError::Provider(format!(
            "document root '{}' is not a directory",
            dir.display()
        )));
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("txt") | Some("md")
        ) {
            out.push(path);
        }
    }
    Ok(())
}

/// Search provider backed by a local JSON-lines index file.
///
/// Each line is a serialised [`SearchHit`]. Queries are term-matched against
/// content; relevance is the fraction of query terms present. This is the
/// provider a self-contained deployment configures; networked providers
/// implement the same trait out of tree.
pub struct JsonlIndexSearch {
    path: PathBuf,
}

impl JsonlIndexSearch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl SearchProvider for JsonlIndexSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, TrainerError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            TrainerError::Provider(format!(
                "search index '{}' unreadable: {}",
                self.path.display(),
                e
            ))
        })?;

        let terms: Vec<String> =
            query.split_whitespace().map(|t| t.to_lowercase()).collect();
        let mut hits = Vec::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            let mut hit: SearchHit = serde_json::from_str(line).map_err(|e| {
                TrainerError::Provider(format!("bad search index line: {}", e))
            })?;
            let content = hit.content.to_lowercase();
            let matched = terms.iter().filter(|t| content.contains(t.as_str())).count();
            if terms.is_empty() || matched > 0 {
                hit.relevance_score = if terms.is_empty() {
                    1.0
                } else {
                    matched as f64 / terms.len() as f64
                };
                hits.push(hit);
            }
        }
        hits.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(hits)
    }
}

/// Feedback buffer backed by a JSON-lines file.
///
/// Draining consumes from the front and rewrites the remainder, so repeated
/// drains walk the file down to empty even across restarts.
pub struct JsonlFeedbackQueue {
    path: PathBuf,
    lock: parking_lot::Mutex<()>,
}

impl JsonlFeedbackQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: parking_lot::Mutex::new(()) }
    }
}

#[async_trait::async_trait]
impl FeedbackProvider for JsonlFeedbackQueue {
    async fn drain(&self, limit: usize) -> Result<Vec<FeedbackItem>, TrainerError> {
        let _guard = self.lock.lock();
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            // A missing file is an empty buffer.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut items = Vec::new();
        let mut rest = String::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            if items.len() < limit {
                let item: FeedbackItem = serde_json::from_str(line).map_err(|e| {
                    TrainerError::Provider(format!("bad feedback line: {}", e))
                })?;
                items.push(item);
            } else {
                rest.push_str(line);
                rest.push('\n');
            }
        }
        std::fs::write(&self.path, rest)?;
        Ok(items)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    //! In-memory providers for scenario tests.

    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Search provider returning a fixed hit list regardless of query.
    pub struct StaticSearchProvider {
        hits: Vec<SearchHit>,
    }

    impl StaticSearchProvider {
        pub fn new(hits: Vec<SearchHit>) -> Self {
            Self { hits }
        }
    }

    #[async_trait::async_trait]
    impl SearchProvider for StaticSearchProvider {
        async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, TrainerError> {
            Ok(self.hits.clone())
        }
    }

    /// Feedback buffer backed by a queue that tests can push into.
    #[derive(Default)]
    pub struct BufferedFeedback {
        items: Mutex<VecDeque<FeedbackItem>>,
    }

    impl BufferedFeedback {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, item: FeedbackItem) {
            self.items.lock().push_back(item);
        }

        pub fn remaining(&self) -> usize {
            self.items.lock().len()
        }
    }

    #[async_trait::async_trait]
    impl FeedbackProvider for BufferedFeedback {
        async fn drain(&self, limit: usize) -> Result<Vec<FeedbackItem>, TrainerError> {
            let mut items = self.items.lock();
            let take = limit.min(items.len());
            Ok(items.drain(..take).collect())
        }
    }
}

#[cfg(test)]
#[path = "providers_tests.rs"]
mod tests;
