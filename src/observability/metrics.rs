//! Metrics recording functions.
//!
//! Values go through the `metrics` facade; installing a recorder or exporter
//! is left to the embedding application.

use std::time::Duration;

use crate::stamp::StampOutcome;

/// Record per-page segmentation metrics
pub fn record_page_metrics(cells: usize, bands: usize, skew_degrees: f32, duration: Duration) {
    metrics::counter!("segmentation_pages_total", "result" => "success").increment(1);
    metrics::histogram!("segmentation_duration_seconds").record(duration.as_secs_f64());
    metrics::histogram!("segmentation_cells_per_page").record(cells as f64);
    metrics::histogram!("segmentation_bands_per_page").record(bands as f64);
    metrics::histogram!("segmentation_skew_degrees").record(skew_degrees.abs() as f64);

    if cells == 0 {
        metrics::counter!("segmentation_empty_pages_total").increment(1);
    }
}

/// Record a page that could not be segmented
pub fn record_page_failure(error_kind: &'static str) {
    metrics::counter!("segmentation_pages_total", "result" => "failure").increment(1);
    metrics::counter!("segmentation_errors_total", "kind" => error_kind).increment(1);
}

/// Record the outcome of stamp suppression
pub fn record_stamp_metrics(outcome: &StampOutcome) {
    let label = match outcome {
        StampOutcome::NoColoredPixels => "none",
        StampOutcome::BelowThreshold { .. } => "below_threshold",
        StampOutcome::Suppressed { .. } => "suppressed",
    };
    metrics::counter!("stamp_detections_total", "outcome" => label).increment(1);

    if let StampOutcome::Suppressed { area } | StampOutcome::BelowThreshold { area } = outcome {
        metrics::histogram!("stamp_area_pixels").record(*area as f64);
    }
}

/// Record recognition counts for one page
pub fn record_recognition_metrics(
    recognized: usize,
    blank: usize,
    failed: usize,
    duration: Duration,
) {
    metrics::counter!("recognition_cells_total", "result" => "recognized")
        .increment(recognized as u64);
    metrics::counter!("recognition_cells_total", "result" => "blank").increment(blank as u64);
    metrics::counter!("recognition_cells_total", "result" => "failed").increment(failed as u64);
    metrics::histogram!("recognition_duration_seconds").record(duration.as_secs_f64());
}
