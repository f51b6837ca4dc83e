//! # Segmentation Error Types
//!
//! This module defines the error taxonomy used throughout the table segmentation
//! pipeline. Structurally invalid input aborts the current page with a typed
//! error; "nothing found" conditions are not errors and are modelled with
//! `Option` or outcome enums by the individual stages.

use std::fmt;

/// Errors that can occur while segmenting a page into table cells.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentationError {
    /// Wrong channel layout, empty or zero-size image
    InvalidImage { message: String },
    /// Degenerate or zero-area geometry where a non-zero area is required
    Geometry { message: String },
    /// Collaborator-level I/O failure (loading pages, writing tables)
    Io { message: String },
    /// Invalid or unreadable configuration
    Config { message: String },
    /// The recognition collaborator failed on a cell
    Recognition { message: String },
}

impl SegmentationError {
    pub fn invalid_image(message: impl Into<String>) -> Self {
        SegmentationError::InvalidImage {
            message: message.into(),
        }
    }

    pub fn geometry(message: impl Into<String>) -> Self {
        SegmentationError::Geometry {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        SegmentationError::Config {
            message: message.into(),
        }
    }

    pub fn recognition(message: impl Into<String>) -> Self {
        SegmentationError::Recognition {
            message: message.into(),
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            SegmentationError::InvalidImage { .. } => "invalid_image",
            SegmentationError::Geometry { .. } => "geometry",
            SegmentationError::Io { .. } => "io",
            SegmentationError::Config { .. } => "config",
            SegmentationError::Recognition { .. } => "recognition",
        }
    }
}

impl fmt::Display for SegmentationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentationError::InvalidImage { message } => {
                write!(f, "[INVALID_IMAGE] {}", message)
            }
            SegmentationError::Geometry { message } => write!(f, "[GEOMETRY] {}", message),
            SegmentationError::Io { message } => write!(f, "[IO] {}", message),
            SegmentationError::Config { message } => write!(f, "[CONFIG] {}", message),
            SegmentationError::Recognition { message } => {
                write!(f, "[RECOGNITION] {}", message)
            }
        }
    }
}

impl std::error::Error for SegmentationError {}

impl From<std::io::Error> for SegmentationError {
    fn from(err: std::io::Error) -> Self {
        SegmentationError::Io {
            message: err.to_string(),
        }
    }
}

impl From<image::ImageError> for SegmentationError {
    fn from(err: image::ImageError) -> Self {
        SegmentationError::Io {
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for SegmentationError {
    fn from(err: csv::Error) -> Self {
        SegmentationError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SegmentationError {
    fn from(err: serde_json::Error) -> Self {
        SegmentationError::Config {
            message: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type SegmentationResult<T> = Result<T, SegmentationError>;

/// Standardized error logging utilities for consistent error reporting across the pipeline
pub mod error_logging {
    use tracing::error;

    /// Log a page that was aborted by a structural error
    pub fn log_page_error(
        error: &impl std::fmt::Display,
        page: &str,
        page_index: usize,
        processing_duration: Option<std::time::Duration>,
    ) {
        error!(
            error = %error,
            page = %page,
            page_index = page_index,
            processing_duration_ms = ?processing_duration.map(|d| d.as_millis()),
            "Page segmentation failed"
        );
    }

    /// Log a cell the recognition collaborator could not read
    pub fn log_recognition_error(
        error: &impl std::fmt::Display,
        row: usize,
        column: usize,
        cell_size: (u32, u32),
    ) {
        error!(
            error = %error,
            row = row,
            column = column,
            cell_width = cell_size.0,
            cell_height = cell_size.1,
            "Cell recognition failed"
        );
    }

    /// Log configuration errors during startup
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}
