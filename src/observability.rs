//! Observability module for logging setup and metrics recording.
//!
//! This module provides:
//! - Structured logging with configurable level and format
//! - Tracing spans for page and cell processing
//! - Segmentation and recognition metrics through the `metrics` facade

mod metrics;
mod tracing_mod;

pub use metrics::{
    record_page_failure, record_page_metrics, record_recognition_metrics, record_stamp_metrics,
};
pub use tracing_mod::{cell_span, init_tracing, page_span};
