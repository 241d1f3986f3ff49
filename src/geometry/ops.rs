//! Guarded polygon overlay operations
//!
//! Every boolean operation goes through [`overlay`], which:
//! - Catches panics and non-finite output from the overlay backend
//! - Retries once after an extra repair pass of both operands
//! - Reports a [`GeometryRepairError`] if the retry fails too
//!
//! No operation mutates its operands; each returns a new geometry.

use geo::{BooleanOps, CoordsIter, MultiPolygon};
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

use super::repair;
use crate::error::GeometryRepairError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Union,
    Intersection,
    Difference,
}

impl Overlay {
    pub fn name(self) -> &'static str {
        match self {
            Overlay::Union => "union",
            Overlay::Intersection => "intersection",
            Overlay::Difference => "difference",
        }
    }

    fn apply(self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        match self {
            Overlay::Union => a.union(b),
            Overlay::Intersection => a.intersection(b),
            Overlay::Difference => a.difference(b),
        }
    }

    /// Result when one side is empty, without calling the backend.
    fn shortcut(self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
        match (self, a.0.is_empty(), b.0.is_empty()) {
            (Overlay::Union, true, _) => Some(b.clone()),
            (Overlay::Union, _, true) => Some(a.clone()),
            (Overlay::Intersection, true, _) | (Overlay::Intersection, _, true) => Some(empty()),
            (Overlay::Difference, true, _) => Some(empty()),
            (Overlay::Difference, _, true) => Some(a.clone()),
            _ => None,
        }
    }
}

pub fn empty() -> MultiPolygon<f64> {
    MultiPolygon::new(Vec::new())
}

pub fn overlay(
    op: Overlay,
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>, GeometryRepairError> {
    if let Some(result) = op.shortcut(a, b) {
        return Ok(result);
    }

    match guarded(op.name(), || op.apply(a, b)) {
        Ok(result) => Ok(result),
        Err(first) => {
            warn!(operation = op.name(), error = %first, "retrying after an extra repair pass");
            let a = repair(a)?;
            let b = repair(b)?;
            guarded(op.name(), || op.apply(&a, &b))
        }
    }
}

pub fn union(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>, GeometryRepairError> {
    overlay(Overlay::Union, a, b)
}

pub fn intersection(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>, GeometryRepairError> {
    overlay(Overlay::Intersection, a, b)
}

pub fn difference(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>, GeometryRepairError> {
    overlay(Overlay::Difference, a, b)
}

/// Union many parts by merging neighbours pairwise, level by level, which
/// keeps intermediate geometries small compared to a left fold.
pub fn union_all(parts: &[MultiPolygon<f64>]) -> Result<MultiPolygon<f64>, GeometryRepairError> {
    cascade(parts.iter().cloned(), union)
}

pub(crate) fn cascade<F>(
    parts: impl IntoIterator<Item = MultiPolygon<f64>>,
    combine: F,
) -> Result<MultiPolygon<f64>, GeometryRepairError>
where
    F: Fn(&MultiPolygon<f64>, &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, GeometryRepairError>,
{
    let mut level: Vec<MultiPolygon<f64>> =
        parts.into_iter().filter(|p| !p.0.is_empty()).collect();

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut iter = level.into_iter();
        while let Some(a) = iter.next() {
            match iter.next() {
                Some(b) => next.push(combine(&a, &b)?),
                None => next.push(a),
            }
        }
        level = next;
    }

    Ok(level.pop().unwrap_or_else(empty))
}

/// Run one backend call, turning a panic or a non-finite result into an error.
pub(crate) fn guarded(
    operation: &'static str,
    f: impl FnOnce() -> MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>, GeometryRepairError> {
    let result = panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "overlay backend panicked".to_string());
        GeometryRepairError::new(operation, reason)
    })?;

    if !all_finite(&result) {
        return Err(GeometryRepairError::new(
            operation,
            "result has non-finite coordinates",
        ));
    }
    Ok(result)
}

pub(crate) fn all_finite(geometry: &MultiPolygon<f64>) -> bool {
    geometry
        .coords_iter()
        .all(|c| c.x.is_finite() && c.y.is_finite())
}
