//! # Projection Profile Analysis
//!
//! Sums a binary mask along one axis, thresholds the resulting 1-D profile and
//! reduces every run of above-threshold entries to its midpoint. Row profiles
//! locate horizontal ruling lines; column profiles, computed per band, locate
//! column separators.
//!
//! The two axes use different threshold policies:
//!
//! - rows: anything above 10% of the profile maximum counts
//! - columns: only when some column is filled over more than 80% of the band
//!   height, and then anything above 20% of the maximum. A band without such a
//!   column has no separators at all.

use image::GrayImage;
use tracing;

use crate::config::ProjectionConfig;

/// Direction of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// One sum per row, used to find horizontal lines
    Rows,
    /// One sum per column, used to find vertical lines
    Columns,
}

/// Per-row or per-column sums of a mask's pixel intensities.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionProfile {
    axis: Axis,
    sums: Vec<u64>,
    /// Number of pixels summed into each entry
    depth: u32,
}

impl ProjectionProfile {
    pub fn compute(mask: &GrayImage, axis: Axis) -> Self {
        let (width, height) = mask.dimensions();
        let (len, depth) = match axis {
            Axis::Rows => (height, width),
            Axis::Columns => (width, height),
        };
        let mut sums = vec![0u64; len as usize];
        for (x, y, px) in mask.enumerate_pixels() {
            let index = match axis {
                Axis::Rows => y,
                Axis::Columns => x,
            };
            sums[index as usize] += px[0] as u64;
        }
        Self { axis, sums, depth }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn values(&self) -> &[u64] {
        &self.sums
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    pub fn min(&self) -> u64 {
        self.sums.iter().copied().min().unwrap_or(0)
    }

    pub fn max(&self) -> u64 {
        self.sums.iter().copied().max().unwrap_or(0)
    }

    /// Sum of an entry whose pixels are all fully set.
    pub fn theoretical_max(&self) -> u64 {
        self.depth as u64 * 255
    }

    /// Entries strictly above `threshold`.
    pub fn above(&self, threshold: f64) -> Vec<bool> {
        self.sums.iter().map(|&s| s as f64 > threshold).collect()
    }
}

/// Threshold applied to a profile according to its axis.
pub fn threshold_for(profile: &ProjectionProfile, config: &ProjectionConfig) -> f64 {
    let max = profile.max() as f64;
    match profile.axis() {
        Axis::Rows => max * config.row_threshold_ratio,
        Axis::Columns => {
            let full = profile.theoretical_max() as f64;
            if full > 0.0 && max / full > config.column_fill_ratio {
                max * config.column_threshold_ratio
            } else {
                // Nothing can exceed the maximum itself.
                max
            }
        }
    }
}

/// Midpoint of every run of `true` entries.
///
/// A run of length `k` starting at `i` yields `i + (k - 1) / 2`. A run that
/// reaches the last entry is reported like any other.
pub fn collapse_runs(flags: &[bool]) -> Vec<i32> {
    let mut positions = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, &set) in flags.iter().enumerate() {
        match (set, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                positions.push(run_midpoint(start, i));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        positions.push(run_midpoint(start, flags.len()));
    }
    positions
}

fn run_midpoint(start: usize, end: usize) -> i32 {
    (start + (end - start - 1) / 2) as i32
}

/// Line positions along `axis`, in increasing order.
pub fn find_line_positions(mask: &GrayImage, axis: Axis, config: &ProjectionConfig) -> Vec<i32> {
    let profile = ProjectionProfile::compute(mask, axis);
    let threshold = threshold_for(&profile, config);
    let positions = collapse_runs(&profile.above(threshold));

    tracing::trace!(
        target: "table_segmentation",
        "Projection over {:?}: len={}, min={}, max={}, threshold={:.1}, positions={}",
        axis,
        profile.len(),
        profile.min(),
        profile.max(),
        threshold,
        positions.len()
    );

    positions
}
