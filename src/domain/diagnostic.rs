use serde::Serialize;
use std::fmt;

use super::{BandIndex, Category};

/// What kind of non-fatal condition a diagnostic records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Geocoding failed upstream; the point was excluded.
    MissingCoordinates,
    /// A requested category has no located points.
    NoPoints,
    /// No coverage for a (category, threshold); the threshold is skipped.
    EmptyCoverage,
    /// A point's coverage shape could not be repaired and was left out.
    PointDropped,
    /// No isochrone was supplied for a (point, threshold).
    MissingIsochrone,
    /// A band could not be computed and was emitted empty.
    GeometryRepair,
    /// The bands of a category did not partition the land within tolerance.
    PartitionTolerance,
}

/// Machine-readable record of something skipped or flagged during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<BandIndex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_id: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            category: None,
            threshold: None,
            band: None,
            point_id: None,
            message: message.into(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_band(mut self, band: BandIndex) -> Self {
        self.band = Some(band);
        self
    }

    pub fn with_point(mut self, point_id: impl Into<String>) -> Self {
        self.point_id = Some(point_id.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(category) = &self.category {
            write!(f, " [{}", category)?;
            if let Some(band) = self.band {
                write!(f, " band {}", band)?;
            }
            if let Some(threshold) = self.threshold {
                write!(f, " @{}", threshold)?;
            }
            f.write_str("]")?;
        }
        if let Some(point) = &self.point_id {
            write!(f, " point {}", point)?;
        }
        write!(f, ": {}", self.message)
    }
}
