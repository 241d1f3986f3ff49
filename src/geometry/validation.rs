//! Partition validation for a category's bands
//!
//! Checks the property every band set must have:
//! - The union of all bands equals `land \ water`
//! - No two bands overlap by more than the tolerance

use geo::{Area, MultiPolygon};

use super::ops;
use crate::domain::{Band, BandIndex, Boundary};
use crate::error::GeometryRepairError;

/// Result of partition validation
#[derive(Debug, Default)]
pub struct PartitionReport {
    /// Area of `land \ water`
    pub expected_area: f64,
    /// Sum of all band areas
    pub band_area: f64,
    /// Dry land not covered by any band
    pub missing_area: f64,
    /// Band area lying outside dry land
    pub excess_area: f64,
    /// Pairs of bands whose overlap exceeds the tolerance
    pub overlaps: Vec<(BandIndex, BandIndex, f64)>,
    /// Absolute area tolerance the checks used
    pub tolerance: f64,
    /// Warning messages for issues found
    pub warnings: Vec<String>,
}

impl PartitionReport {
    pub fn is_valid(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_valid() {
            format!(
                "Partition valid: {:.1} of {:.1} covered",
                self.band_area, self.expected_area
            )
        } else {
            self.warnings.join("; ")
        }
    }
}

/// Area of `land \ water`.
pub fn dry_land(boundary: &Boundary) -> Result<MultiPolygon<f64>, GeometryRepairError> {
    ops::difference(boundary.land(), boundary.water())
}

/// Check that `bands` partition `dry` within `tolerance` (an absolute area).
pub fn validate_partition(
    bands: &[Band],
    dry: &MultiPolygon<f64>,
    tolerance: f64,
) -> Result<PartitionReport, GeometryRepairError> {
    let mut report = PartitionReport {
        expected_area: dry.unsigned_area(),
        band_area: bands.iter().map(Band::area).sum(),
        tolerance,
        ..Default::default()
    };

    for (i, a) in bands.iter().enumerate() {
        for b in &bands[i + 1..] {
            let shared = ops::intersection(&a.geometry, &b.geometry)?.unsigned_area();
            if shared > tolerance {
                report.overlaps.push((a.index, b.index, shared));
                report.warnings.push(format!(
                    "bands {} and {} overlap by {:.3}",
                    a.index, b.index, shared
                ));
            }
        }
    }

    let geometries: Vec<MultiPolygon<f64>> = bands.iter().map(|b| b.geometry.clone()).collect();
    let covered = ops::union_all(&geometries)?;
    report.missing_area = ops::difference(dry, &covered)?.unsigned_area();
    report.excess_area = ops::difference(&covered, dry)?.unsigned_area();

    if report.missing_area > tolerance {
        report.warnings.push(format!(
            "{:.3} of dry land is not covered by any band",
            report.missing_area
        ));
    }
    if report.excess_area > tolerance {
        report.warnings.push(format!(
            "{:.3} of band area lies outside dry land",
            report.excess_area
        ));
    }

    Ok(report)
}
