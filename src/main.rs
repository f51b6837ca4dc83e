use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use table_segmentation::config::{AppConfig, LoggingConfig};
use table_segmentation::errors::error_logging;
use table_segmentation::observability::{self, page_span, record_page_failure};
use table_segmentation::{
    recognize_grid, segment_source, FileImageSource, SegmentationConfig, SegmentationError,
    SegmentationResult, SparseTable, TextRecognizer,
};
use tokio::sync::Semaphore;
use tracing::{info, warn};

const PAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tif", "tiff"];

/// List page images of the input directory in name order
fn list_pages(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();
    for entry in std::fs::read_dir(input_dir).map_err(|e| {
        anyhow::anyhow!("Cannot read input directory '{}': {}", input_dir.display(), e)
    })? {
        let path = entry?.path();
        let is_page = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| PAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_page {
            pages.push(path);
        }
    }
    pages.sort();
    Ok(pages)
}

#[cfg(feature = "tesseract")]
fn build_recognizer(config: &SegmentationConfig) -> SegmentationResult<Box<dyn TextRecognizer>> {
    let recognizer =
        table_segmentation::recognition::TesseractRecognizer::new(&config.recognition.language)?;
    Ok(Box::new(recognizer))
}

#[cfg(not(feature = "tesseract"))]
fn build_recognizer(_config: &SegmentationConfig) -> SegmentationResult<Box<dyn TextRecognizer>> {
    Ok(Box::new(
        |_: &image::RgbImage| -> SegmentationResult<String> { Ok(String::new()) },
    ))
}

/// Segment, recognize and dump one page; returns the written table path
fn process_page(
    path: &Path,
    page_index: usize,
    output_dir: &Path,
    config: &SegmentationConfig,
) -> SegmentationResult<PathBuf> {
    let source = FileImageSource::new(path);
    let page = segment_source(&source, config)?;

    let mut recognizer = build_recognizer(config)?;
    let mut table = SparseTable::new();
    let summary = recognize_grid(&page, recognizer.as_mut(), &mut table, &config.recognition)?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SegmentationError::config(format!("invalid page name '{}'", path.display())))?;
    let out_path = output_dir.join(format!("{}_{}.csv", stem, page_index));
    table.dump(&out_path)?;

    info!(
        page = %path.display(),
        rows = page.grid.len(),
        cells = page.grid.cell_count(),
        recognized = summary.recognized,
        table = %out_path.display(),
        "Page written"
    );
    Ok(out_path)
}

/// Loads the configuration and installs the subscriber. A configuration error
/// is logged through the default subscriber before it is returned.
fn load_app_config(args: &[String]) -> Result<AppConfig> {
    match AppConfig::from_env_and_args(args) {
        Ok(app_config) => {
            observability::init_tracing(&app_config.logging)?;
            Ok(app_config)
        }
        Err(e) => {
            observability::init_tracing(&LoggingConfig::default())?;
            error_logging::log_config_error(&e, "TABLE_*", "load");
            Err(anyhow::anyhow!(
                "Configuration failed: {}. Usage: table-segmentation <input_dir> <output_dir> [lang]",
                e
            ))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    let app_config = load_app_config(&args)?;

    if cfg!(not(feature = "tesseract")) {
        warn!("Built without the `tesseract` feature, tables will only contain layout");
    }

    let pages = list_pages(&app_config.input_dir)?;
    std::fs::create_dir_all(&app_config.output_dir)?;
    info!(
        pages = pages.len(),
        input_dir = %app_config.input_dir.display(),
        output_dir = %app_config.output_dir.display(),
        workers = app_config.workers,
        "Starting table segmentation"
    );

    let config = Arc::new(app_config.segmentation.clone());
    let output_dir = Arc::new(app_config.output_dir.clone());
    let semaphore = Arc::new(Semaphore::new(app_config.workers));
    let mut handles = Vec::with_capacity(pages.len());

    for (page_index, path) in pages.into_iter().enumerate() {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let config = Arc::clone(&config);
        let output_dir = Arc::clone(&output_dir);

        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let page_name = path.display().to_string();
            let _span = page_span(&page_name, page_index).entered();
            let start_time = Instant::now();

            match process_page(&path, page_index, &output_dir, &config) {
                Ok(_) => true,
                Err(e) => {
                    error_logging::log_page_error(
                        &e,
                        &page_name,
                        page_index,
                        Some(start_time.elapsed()),
                    );
                    record_page_failure(e.kind());
                    false
                }
            }
        }));
    }

    let total = handles.len();
    let mut failed = 0usize;
    for handle in handles {
        match handle.await {
            Ok(true) => {}
            Ok(false) => failed += 1,
            Err(e) => {
                warn!(error = %e, "Page worker panicked");
                failed += 1;
            }
        }
    }

    info!(pages = total, failed = failed, "Table segmentation finished");
    Ok(())
}
