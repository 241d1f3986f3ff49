use thiserror::Error;

use crate::geometry::Crs;

/// Malformed input. Fatal for the whole run: the partition cannot be
/// guaranteed once any of these is present.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputDataError {
    #[error("no thresholds given")]
    NoThresholds,

    #[error("threshold {0} must be a positive, finite number")]
    InvalidThreshold(f64),

    #[error("threshold {0} appears more than once")]
    DuplicateThreshold(f64),

    #[error("category name must not be empty")]
    EmptyCategory,

    #[error("no categories to process")]
    NoCategories,

    #[error("point {id} has invalid coordinates ({x}, {y})")]
    InvalidCoordinate { id: String, x: f64, y: f64 },

    #[error("unrecognized coordinate reference system: {0:?}")]
    UnknownCrs(String),

    #[error("{input} is in {found}, which cannot be brought into {target}")]
    CrsMismatch {
        input: &'static str,
        found: Crs,
        target: Crs,
    },

    #[error("boundary contains no land area")]
    EmptyLand,

    #[error("boundary geometry is invalid: {0}")]
    InvalidBoundary(String),

    #[error("circles need at least {min} segments, got {got}")]
    TooFewSegments { min: usize, got: usize },
}

/// A polygon that could not be made valid, even after a second repair pass.
/// Fatal only for the band it touches.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{operation} failed: {reason}")]
pub struct GeometryRepairError {
    pub operation: &'static str,
    pub reason: String,
}

impl GeometryRepairError {
    pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}
