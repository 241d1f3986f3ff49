//! Band decomposition for one category
//!
//! Turns per-threshold coverage into ordered, pairwise-disjoint bands whose
//! union is `land \ water`:
//!
//! 1. Clip each coverage region to land
//! 2. Cumulative union: `cum_i = clipped_1 ∪ … ∪ clipped_i`, so a region
//!    reached at a lower threshold is never reported in a higher band
//! 3. `ring_1 = cum_1 \ water`, `ring_i = (cum_i \ cum_{i-1}) \ water`
//! 4. `outside = (land \ cum_k) \ water`
//!
//! Thresholds with empty coverage are skipped for this category and the
//! remaining rings are numbered contiguously.

use geo::MultiPolygon;
use tracing::{debug, warn};

use crate::coverage::Coverage;
use crate::domain::threshold::sorted_unique;
use crate::domain::{Band, BandIndex, Boundary, Category, Diagnostic, DiagnosticKind};
use crate::error::{GeometryRepairError, InputDataError};
use crate::geometry::ops;

/// Ordered bands of one category, plus everything skipped or flagged.
#[derive(Debug, Clone, Default)]
pub struct Decomposition {
    pub bands: Vec<Band>,
    pub diagnostics: Vec<Diagnostic>,
}

type Step = Result<MultiPolygon<f64>, GeometryRepairError>;

/// Decompose one category's coverage into bands.
///
/// `coverage_by_threshold` may come in any order; it is processed ascending.
/// Repeated or invalid thresholds are an input error. A geometric failure
/// only empties the bands it affects, each carrying a diagnostic.
pub fn decompose(
    category: &Category,
    coverage_by_threshold: Vec<(f64, Coverage)>,
    boundary: &Boundary,
) -> Result<Decomposition, InputDataError> {
    sorted_unique(coverage_by_threshold.iter().map(|(t, _)| *t).collect())?;
    let mut coverage_by_threshold = coverage_by_threshold;
    coverage_by_threshold.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut result = Decomposition::default();

    let mut levels: Vec<(f64, MultiPolygon<f64>)> = Vec::new();
    for (threshold, coverage) in coverage_by_threshold {
        match coverage {
            Coverage::Region(region) => levels.push((threshold, region)),
            Coverage::Empty => {
                debug!(%category, threshold, "no coverage, threshold skipped");
                result.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::EmptyCoverage,
                        "threshold skipped for this category",
                    )
                    .with_category(category.clone())
                    .with_threshold(threshold),
                );
            }
        }
    }

    let clipped: Vec<Step> = levels
        .iter()
        .map(|(_, region)| ops::intersection(region, boundary.land()))
        .collect();
    let cumulative = cumulative_unions(&clipped);

    let mut lower = None;
    for (i, (threshold, _)) in levels.iter().enumerate() {
        let index = BandIndex::Ring(i + 1);
        let ring = match i {
            0 => cumulative[0].clone(),
            _ => match (&cumulative[i], &cumulative[i - 1]) {
                (Ok(current), Ok(previous)) => ops::difference(current, previous),
                (Err(e), _) | (_, Err(e)) => Err(e.clone()),
            },
        };
        let ring = ring.and_then(|ring| ops::difference(&ring, boundary.water()));
        result.push(category, index, lower, Some(*threshold), ring);
        lower = Some(*threshold);
    }

    let outside = match cumulative.last() {
        Some(Ok(reached)) => ops::difference(boundary.land(), reached),
        Some(Err(e)) => Err(e.clone()),
        None => Ok(boundary.land().clone()),
    };
    let outside = outside.and_then(|rest| ops::difference(&rest, boundary.water()));
    result.push(category, BandIndex::Outside, lower, None, outside);

    Ok(result)
}

impl Decomposition {
    fn push(
        &mut self,
        category: &Category,
        index: BandIndex,
        lower: Option<f64>,
        upper: Option<f64>,
        geometry: Step,
    ) {
        let (geometry, diagnostic) = match geometry {
            Ok(geometry) => (geometry, None),
            Err(e) => {
                warn!(%category, band = %index, error = %e, "band emitted empty");
                let mut diagnostic = Diagnostic::new(DiagnosticKind::GeometryRepair, e.to_string())
                    .with_category(category.clone())
                    .with_band(index);
                if let Some(threshold) = upper {
                    diagnostic = diagnostic.with_threshold(threshold);
                }
                self.diagnostics.push(diagnostic.clone());
                (ops::empty(), Some(diagnostic))
            }
        };

        self.bands.push(Band {
            category: category.clone(),
            index,
            lower,
            upper,
            geometry,
            diagnostic,
        });
    }
}

/// `cum_i` for every level. When `cum_{i-1}` failed, `cum_i` is rebuilt from
/// the clipped levels directly; a failed clip poisons every later level.
fn cumulative_unions(clipped: &[Step]) -> Vec<Step> {
    let mut cumulative: Vec<Step> = Vec::with_capacity(clipped.len());
    for (i, level) in clipped.iter().enumerate() {
        let step = match (level, cumulative.last()) {
            (Err(e), _) => Err(e.clone()),
            (Ok(level), None) => Ok(level.clone()),
            (Ok(level), Some(Ok(previous))) => ops::union(previous, level),
            (Ok(_), Some(Err(e))) => {
                match clipped[..=i].iter().cloned().collect::<Result<Vec<_>, _>>() {
                    Ok(levels) => ops::union_all(&levels),
                    Err(_) => Err(e.clone()),
                }
            }
        };
        cumulative.push(step);
    }
    cumulative
}
