//! Coverage per (category, threshold)
//!
//! A [`CoverageSource`] answers `coverage_for(category, threshold)` with the
//! union of every point's coverage shape. Two sources exist:
//! - [`BufferCoverage`]: a disk of radius `threshold` around each point
//! - [`IsochroneCoverage`]: externally supplied travel-time polygons

pub mod aggregator;
pub mod buffer;
pub mod isochrone;

pub use aggregator::aggregate;
pub use buffer::BufferCoverage;
pub use isochrone::{IsochroneCoverage, IsochroneRecord};

use geo::MultiPolygon;

use crate::domain::{Category, Diagnostic};

/// Coverage region, or the explicit marker for "nothing contributes here".
/// The marker is never represented as an empty or degenerate polygon.
#[derive(Debug, Clone, PartialEq)]
pub enum Coverage {
    Empty,
    Region(MultiPolygon<f64>),
}

impl Coverage {
    pub fn is_empty(&self) -> bool {
        matches!(self, Coverage::Empty)
    }

    pub fn region(&self) -> Option<&MultiPolygon<f64>> {
        match self {
            Coverage::Empty => None,
            Coverage::Region(region) => Some(region),
        }
    }
}

/// Coverage together with everything dropped while building it.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub coverage: Coverage,
    pub diagnostics: Vec<Diagnostic>,
}

/// Where coverage shapes come from. Implementations are pure and shared
/// read-only across category workers.
pub trait CoverageSource: Sync {
    /// Short name used in logs and output file names.
    fn mode(&self) -> &'static str;

    fn coverage_for(&self, category: &Category, threshold: f64) -> Aggregate;
}
