//! Tracing and logging setup module.
//!
//! This module provides:
//! - Structured logging configuration
//! - Span creation utilities for page and cell processing

use anyhow::Result;
use tracing_subscriber::prelude::*;

use crate::config::LoggingConfig;

/// Initialize structured logging with tracing and configuration
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    // Create the filter based on configuration
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("table_segmentation={}", config.level).parse()?)
        .add_directive("leptess=warn".parse()?);

    if config.format == "json" {
        // JSON formatting for log collection
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    } else {
        // Pretty formatting for development
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    }

    tracing::info!(
        log_level = %config.level,
        log_format = %config.format,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Create a span for the processing of one page
pub fn page_span(page: &str, page_index: usize) -> tracing::Span {
    tracing::info_span!(
        "page_segmentation",
        page = page,
        page_index = page_index,
        component = "segmentation"
    )
}

/// Create a span for recognition of one cell
pub fn cell_span(row: usize, column: usize) -> tracing::Span {
    tracing::debug_span!(
        "cell_recognition",
        row = row,
        column = column,
        component = "recognition"
    )
}
