use geo::{Area, MultiPolygon};
use tracing::{debug, warn};

use super::{Aggregate, Coverage};
use crate::domain::{Category, Diagnostic, DiagnosticKind, Site};
use crate::geometry::{ops, repair};

/// Union the coverage shapes of `sites` at `threshold`.
///
/// `shape_fn` yields a site's shape, or `None` when no shape exists for it
/// (only possible for externally supplied isochrones). Each shape is repaired
/// before the union; shapes that cannot be repaired are dropped with a
/// diagnostic. No sites, no usable shapes, or a zero-area union all give
/// [`Coverage::Empty`].
pub fn aggregate<'a, I, F>(
    category: &Category,
    threshold: f64,
    sites: I,
    shape_fn: F,
) -> Aggregate
where
    I: IntoIterator<Item = &'a Site>,
    F: Fn(&Site, f64) -> Option<MultiPolygon<f64>>,
{
    let mut diagnostics = Vec::new();
    let mut shapes = Vec::new();
    let mut site_count = 0;

    for site in sites {
        site_count += 1;
        let Some(shape) = shape_fn(site, threshold) else {
            diagnostics.push(
                Diagnostic::new(DiagnosticKind::MissingIsochrone, "no coverage shape supplied")
                    .with_category(category.clone())
                    .with_threshold(threshold)
                    .with_point(site.id.clone()),
            );
            continue;
        };

        match repair(&shape) {
            Ok(repaired) => shapes.push(repaired),
            Err(e) => {
                warn!(point = %site.id, %category, threshold, error = %e, "dropping point");
                diagnostics.push(
                    Diagnostic::new(DiagnosticKind::PointDropped, e.to_string())
                        .with_category(category.clone())
                        .with_threshold(threshold)
                        .with_point(site.id.clone()),
                );
            }
        }
    }

    let empty = |reason: String, mut diagnostics: Vec<Diagnostic>| {
        diagnostics.push(
            Diagnostic::new(DiagnosticKind::EmptyCoverage, reason)
                .with_category(category.clone())
                .with_threshold(threshold),
        );
        Aggregate {
            coverage: Coverage::Empty,
            diagnostics,
        }
    };

    if site_count == 0 {
        return empty("no points for this category".to_string(), diagnostics);
    }

    let region = match ops::union_all(&shapes) {
        Ok(region) => region,
        Err(e) => {
            warn!(%category, threshold, error = %e, "coverage union failed");
            return empty(format!("coverage union failed: {}", e), diagnostics);
        }
    };

    if region.unsigned_area() <= 0.0 {
        return empty("no point contributed any area".to_string(), diagnostics);
    }

    debug!(
        %category,
        threshold,
        points = shapes.len(),
        parts = region.0.len(),
        "aggregated coverage"
    );
    Aggregate {
        coverage: Coverage::Region(region),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Point, Rect, coord};

    fn site(id: &str, x: f64, y: f64) -> Site {
        Site::new(id, Category::new("wo").unwrap(), Point::new(x, y))
    }

    fn unit_square_at(site: &Site, size: f64) -> MultiPolygon<f64> {
        let (x, y) = (site.position.x(), site.position.y());
        Rect::new(coord! { x: x, y: y }, coord! { x: x + size, y: y + size })
            .to_polygon()
            .into()
    }

    #[test]
    fn test_overlapping_shapes_unioned() {
        let category = Category::new("wo").unwrap();
        let sites = vec![site("a", 0.0, 0.0), site("b", 1.0, 0.0)];

        let result = aggregate(&category, 2.0, &sites, |s, t| Some(unit_square_at(s, t)));

        let region = result.coverage.region().unwrap();
        assert!((region.unsigned_area() - 6.0).abs() < 1e-6);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_no_sites_gives_empty_marker() {
        let category = Category::new("hbo").unwrap();
        let sites: Vec<Site> = Vec::new();
        let result = aggregate(&category, 1.0, &sites, |s, t| Some(unit_square_at(s, t)));

        assert_eq!(result.coverage, Coverage::Empty);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::EmptyCoverage);
    }

    #[test]
    fn test_unrepairable_shape_dropped() {
        let category = Category::new("wo").unwrap();
        let sites = vec![site("good", 0.0, 0.0), site("bad", f64::NAN, 0.0)];

        let result = aggregate(&category, 1.0, &sites, |s, t| Some(unit_square_at(s, t)));

        assert!((result.coverage.region().unwrap().unsigned_area() - 1.0).abs() < 1e-6);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::PointDropped);
        assert_eq!(result.diagnostics[0].point_id.as_deref(), Some("bad"));
    }

    #[test]
    fn test_missing_shapes_only() {
        let category = Category::new("wo").unwrap();
        let sites = vec![site("a", 0.0, 0.0)];

        let result = aggregate(&category, 1.0, &sites, |_, _| None);

        assert!(result.coverage.is_empty());
        let kinds: Vec<_> = result.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![DiagnosticKind::MissingIsochrone, DiagnosticKind::EmptyCoverage]
        );
    }
}
