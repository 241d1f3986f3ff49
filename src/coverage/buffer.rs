use geo::MultiPolygon;

use super::{Aggregate, CoverageSource, aggregate};
use crate::domain::{Category, PointTable};
use crate::error::InputDataError;
use crate::geometry::{Crs, MIN_SEGMENTS, circle};

/// Disk of radius `threshold` around every point. Needs a planar,
/// meter-based point table.
#[derive(Debug, Clone)]
pub struct BufferCoverage<'a> {
    points: &'a PointTable,
    segments: usize,
}

impl<'a> BufferCoverage<'a> {
    pub fn new(points: &'a PointTable, segments: usize) -> Result<Self, InputDataError> {
        if points.crs().is_geographic() {
            return Err(InputDataError::CrsMismatch {
                input: "buffered points",
                found: Crs::Geographic,
                target: Crs::Planar("a projected CRS".to_string()),
            });
        }
        if segments < MIN_SEGMENTS {
            return Err(InputDataError::TooFewSegments {
                min: MIN_SEGMENTS,
                got: segments,
            });
        }
        Ok(Self { points, segments })
    }
}

impl CoverageSource for BufferCoverage<'_> {
    fn mode(&self) -> &'static str {
        "buffer"
    }

    fn coverage_for(&self, category: &Category, threshold: f64) -> Aggregate {
        aggregate(
            category,
            threshold,
            self.points.of_category(category),
            |site, radius| Some(MultiPolygon::from(circle(site.position, radius, self.segments))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Site;
    use crate::geometry::DEFAULT_SEGMENTS;
    use geo::{Area, Point};
    use std::f64::consts::PI;

    fn planar() -> Crs {
        Crs::Planar("EPSG:28992".to_string())
    }

    #[test]
    fn test_buffer_coverage_per_category() {
        let wo = Category::new("wo").unwrap();
        let hbo = Category::new("hbo").unwrap();
        let points = PointTable::new(
            vec![
                Site::new("1", wo.clone(), Point::new(0.0, 0.0)),
                Site::new("2", hbo.clone(), Point::new(50_000.0, 0.0)),
            ],
            planar(),
        );
        let source = BufferCoverage::new(&points, DEFAULT_SEGMENTS).unwrap();

        let aggregate = source.coverage_for(&wo, 1000.0);
        let area = aggregate.coverage.region().unwrap().unsigned_area();
        assert!((area - PI * 1e6).abs() / (PI * 1e6) < 0.01);

        let unknown = Category::new("mbo").unwrap();
        assert!(source.coverage_for(&unknown, 1000.0).coverage.is_empty());
    }

    #[test]
    fn test_buffer_requires_planar_points() {
        let points = PointTable::new(Vec::new(), Crs::Geographic);
        assert!(matches!(
            BufferCoverage::new(&points, DEFAULT_SEGMENTS),
            Err(InputDataError::CrsMismatch { .. })
        ));

        let points = PointTable::new(Vec::new(), planar());
        assert!(matches!(
            BufferCoverage::new(&points, 4),
            Err(InputDataError::TooFewSegments { .. })
        ));
    }
}
