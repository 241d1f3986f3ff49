use geo::MultiPolygon;
use std::collections::HashMap;
use tracing::debug;

use super::{Aggregate, CoverageSource, aggregate};
use crate::domain::threshold::threshold_key;
use crate::domain::{Category, PointTable};

/// One row of the isochrone table: the area reachable from `point_id`
/// within `threshold` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneRecord {
    pub point_id: String,
    pub category: Category,
    pub threshold: f64,
    pub geometry: MultiPolygon<f64>,
}

/// Looks up the supplied isochrone for each (point, threshold). Records
/// must already be in the point table's CRS.
#[derive(Debug, Clone)]
pub struct IsochroneCoverage<'a> {
    points: &'a PointTable,
    shapes: HashMap<(String, u64), MultiPolygon<f64>>,
}

impl<'a> IsochroneCoverage<'a> {
    pub fn new(points: &'a PointTable, records: Vec<IsochroneRecord>) -> Self {
        let mut shapes: HashMap<(String, u64), MultiPolygon<f64>> = HashMap::new();
        for record in records {
            // Several rows for one (point, threshold) are parts of one shape;
            // overlaps between them are resolved by the aggregator's repair.
            shapes
                .entry((record.point_id, threshold_key(record.threshold)))
                .or_insert_with(|| MultiPolygon::new(Vec::new()))
                .0
                .extend(record.geometry);
        }
        debug!(shapes = shapes.len(), "indexed isochrones");
        Self { points, shapes }
    }
}

impl CoverageSource for IsochroneCoverage<'_> {
    fn mode(&self) -> &'static str {
        "isochrone"
    }

    fn coverage_for(&self, category: &Category, threshold: f64) -> Aggregate {
        aggregate(
            category,
            threshold,
            self.points.of_category(category),
            |site, t| {
                self.shapes
                    .get(&(site.id.clone(), threshold_key(t)))
                    .cloned()
            },
        )
    }
}
