// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trainer adapters for the Finetuned engine.
//!
//! Each recognised trainer kind is an independent implementation of the
//! [`TrainerAdapter`] contract, registered in a [`TrainerRegistry`] keyed by
//! kind. Adapters validate their configuration documents cheaply, run the
//! work cooperatively against a cancellation token, report progress through
//! a [`ProgressSink`], and emit artifacts under an export root.
//!
//! The engine holds no assumptions about what an adapter does internally;
//! swapping the simulated epoch loop here for real numerics is invisible to
//! the rest of the system.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod adapter;
pub mod config;
mod continuous;
mod dataset;
pub mod exports;
mod lora;
pub mod providers;
mod registry;

#[cfg(any(test, feature = "test-support"))]
pub mod scripted;

pub use adapter::{
    NullSink, ProgressSink, ReportGate, RunOutcome, TrainerAdapter, TrainerError, TrainerRequest,
};
pub use continuous::ContinuousTrainer;
pub use dataset::DatasetAssemblyTrainer;
pub use lora::AdapterTrainer;
pub use providers::{
    Document, FeedbackItem, FeedbackProvider, FsDocumentSource, JsonlFeedbackQueue,
    JsonlIndexSearch, SearchHit, SearchProvider,
};
pub use registry::TrainerRegistry;
