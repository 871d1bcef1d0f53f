//! Studio crunch scoring library
//!
//! This crate provides the core functionality for:
//! - Curve fitting and closed-form integration
//! - Per-studio feature scores (release cadence, genre risk, review sentiment)
//! - Logistic regression training, diagnostics and evaluation
//! - Cache, training-set and model persistence
//! - Batch orchestration and observability

pub mod config;
pub mod curve;
pub mod error;
pub mod models;
pub mod names;
pub mod observability;
pub mod pipeline;
pub mod regression;
pub mod scoring;
pub mod sources;
pub mod store;

pub use config::ScorerConfig;
pub use error::{Result, ScorerError};
pub use models::*;
pub use observability::{ScorerMetrics, StructuredLogger};
pub use pipeline::{BatchReport, Pipeline, Sources, StudioSet, StudioTarget};
