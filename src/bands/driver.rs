use geo::{Area, MultiPolygon};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::decompose;
use crate::coverage::CoverageSource;
use crate::domain::{Band, Boundary, Category, Diagnostic, DiagnosticKind, PointTable, Thresholds};
use crate::error::InputDataError;
use crate::geometry::{dry_land, validate_partition};

/// Partition tolerance as a fraction of the dry land area
pub const DEFAULT_AREA_TOLERANCE: f64 = 1e-6;

/// Categories to decompose, in output order, and the thresholds they share.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub categories: Vec<Category>,
    pub thresholds: Thresholds,
    /// Allowed partition error as a fraction of the dry land area
    pub area_tolerance: f64,
}

impl RunRequest {
    pub fn new(categories: Vec<Category>, thresholds: Thresholds) -> Self {
        Self {
            categories,
            thresholds,
            area_tolerance: DEFAULT_AREA_TOLERANCE,
        }
    }
}

/// Bands of one category, innermost ring first and `outside` last.
#[derive(Debug, Clone)]
pub struct CategoryBands {
    pub category: Category,
    pub bands: Vec<Band>,
}

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub categories: Vec<CategoryBands>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn bands_for(&self, category: &Category) -> Option<&[Band]> {
        self.categories
            .iter()
            .find(|c| &c.category == category)
            .map(|c| c.bands.as_slice())
    }

    pub fn band_count(&self) -> usize {
        self.categories.iter().map(|c| c.bands.len()).sum()
    }

    pub fn flagged_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| &c.bands)
            .filter(|b| b.is_flagged())
            .count()
    }
}

struct DryLand {
    geometry: MultiPolygon<f64>,
    tolerance: f64,
}

/// Decompose every requested category.
///
/// Categories are independent: they run in parallel on the rayon pool against
/// the shared, read-only points, coverage source and boundary. A category
/// without points yields no bands and a `NoPoints` diagnostic. Only input
/// errors abort the run.
pub fn run(
    request: &RunRequest,
    points: &PointTable,
    source: &dyn CoverageSource,
    boundary: &Boundary,
) -> Result<RunReport, InputDataError> {
    if request.categories.is_empty() {
        return Err(InputDataError::NoCategories);
    }
    if points.crs() != boundary.crs() {
        return Err(InputDataError::CrsMismatch {
            input: "point table",
            found: points.crs().clone(),
            target: boundary.crs().clone(),
        });
    }

    let mut categories: Vec<&Category> = Vec::with_capacity(request.categories.len());
    for category in &request.categories {
        if !categories.contains(&category) {
            categories.push(category);
        }
    }

    let mut report = RunReport::default();
    let dry = match dry_land(boundary) {
        Ok(geometry) => {
            let tolerance = request.area_tolerance * geometry.unsigned_area();
            Some(DryLand {
                geometry,
                tolerance,
            })
        }
        Err(e) => {
            warn!(error = %e, "cannot compute dry land, partitions will not be validated");
            report.diagnostics.push(Diagnostic::new(
                DiagnosticKind::PartitionTolerance,
                format!("partition not validated: {}", e),
            ));
            None
        }
    };
    let dry = dry.as_ref();

    info!(
        categories = categories.len(),
        thresholds = request.thresholds.len(),
        mode = source.mode(),
        "decomposing categories"
    );

    let outcomes = categories
        .par_iter()
        .map(|&category| run_category(category, &request.thresholds, points, source, boundary, dry))
        .collect::<Result<Vec<_>, _>>()?;

    for (bands, diagnostics) in outcomes {
        report.categories.push(bands);
        report.diagnostics.extend(diagnostics);
    }
    Ok(report)
}

fn run_category(
    category: &Category,
    thresholds: &Thresholds,
    points: &PointTable,
    source: &dyn CoverageSource,
    boundary: &Boundary,
    dry: Option<&DryLand>,
) -> Result<(CategoryBands, Vec<Diagnostic>), InputDataError> {
    let point_count = points.count_for(category);
    if point_count == 0 {
        warn!(%category, "no located points, category skipped");
        let diagnostic = Diagnostic::new(DiagnosticKind::NoPoints, "category has no located points")
            .with_category(category.clone());
        return Ok((
            CategoryBands {
                category: category.clone(),
                bands: Vec::new(),
            },
            vec![diagnostic],
        ));
    }

    let mut diagnostics = Vec::new();
    let coverage = thresholds
        .iter()
        .map(|threshold| {
            let aggregate = source.coverage_for(category, threshold);
            diagnostics.extend(aggregate.diagnostics);
            (threshold, aggregate.coverage)
        })
        .collect();

    let decomposition = decompose(category, coverage, boundary)?;

    // The aggregator already explains why a threshold came back empty
    let skipped: Vec<Diagnostic> = decomposition
        .diagnostics
        .into_iter()
        .filter(|d| {
            d.kind != DiagnosticKind::EmptyCoverage
                || !diagnostics
                    .iter()
                    .any(|e| e.kind == DiagnosticKind::EmptyCoverage && e.threshold == d.threshold)
        })
        .collect();
    diagnostics.extend(skipped);

    let bands = decomposition.bands;
    let flagged = bands.iter().any(Band::is_flagged);
    if let (Some(dry), false) = (dry, flagged) {
        match validate_partition(&bands, &dry.geometry, dry.tolerance) {
            Ok(report) if report.is_valid() => debug!(%category, "{}", report.summary()),
            Ok(report) => {
                warn!(%category, "{}", report.summary());
                diagnostics.push(
                    Diagnostic::new(DiagnosticKind::PartitionTolerance, report.summary())
                        .with_category(category.clone()),
                );
            }
            Err(e) => {
                warn!(%category, error = %e, "partition could not be validated");
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::PartitionTolerance,
                        format!("partition not validated: {}", e),
                    )
                    .with_category(category.clone()),
                );
            }
        }
    }

    info!(
        %category,
        points = point_count,
        bands = bands.len(),
        "category decomposed"
    );
    Ok((
        CategoryBands {
            category: category.clone(),
            bands,
        },
        diagnostics,
    ))
}
