use geo::{Coord, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Category, Diagnostic, DiagnosticKind};
use crate::error::InputDataError;
use crate::geometry::Crs;

/// One row of the geocoded point table. Coordinates are `None` when
/// geocoding failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A located point. `position` is `x = lon, y = lat` for geographic tables
/// and projected meters otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub id: String,
    pub category: Category,
    pub position: Point<f64>,
}

impl Site {
    pub fn new(id: impl Into<String>, category: Category, position: Point<f64>) -> Self {
        Self {
            id: id.into(),
            category,
            position,
        }
    }
}

/// Located points of one run, all in the same CRS.
#[derive(Debug, Clone)]
pub struct PointTable {
    sites: Vec<Site>,
    crs: Crs,
}

impl PointTable {
    pub fn new(sites: Vec<Site>, crs: Crs) -> Self {
        Self { sites, crs }
    }

    /// Build a table from raw records.
    ///
    /// Rows without coordinates are excluded and reported as
    /// `MissingCoordinates`; they never count as zero coverage. A blank
    /// category or an out-of-range coordinate is an input error.
    pub fn from_records(
        records: Vec<PointRecord>,
        crs: Crs,
    ) -> Result<(Self, Vec<Diagnostic>), InputDataError> {
        let mut sites = Vec::with_capacity(records.len());
        let mut diagnostics = Vec::new();

        for record in records {
            let category = Category::new(record.category)?;
            let (lat, lon) = match (record.latitude, record.longitude) {
                (Some(lat), Some(lon)) => (lat, lon),
                _ => {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::MissingCoordinates,
                            "point has no coordinates and is excluded",
                        )
                        .with_category(category)
                        .with_point(record.id),
                    );
                    continue;
                }
            };

            let in_range = lat.is_finite()
                && lon.is_finite()
                && (!crs.is_geographic() || (lat.abs() <= 90.0 && lon.abs() <= 180.0));
            if !in_range {
                return Err(InputDataError::InvalidCoordinate {
                    id: record.id,
                    x: lon,
                    y: lat,
                });
            }

            sites.push(Site::new(record.id, category, Point::new(lon, lat)));
        }

        Ok((Self { sites, crs }, diagnostics))
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn of_category<'a>(&'a self, category: &'a Category) -> impl Iterator<Item = &'a Site> {
        self.sites.iter().filter(move |s| &s.category == category)
    }

    pub fn count_for(&self, category: &Category) -> usize {
        self.of_category(category).count()
    }

    /// Distinct categories, sorted by name.
    pub fn categories(&self) -> BTreeSet<Category> {
        self.sites.iter().map(|s| s.category.clone()).collect()
    }

    /// New table with every position mapped through `f`.
    pub fn transformed(&self, crs: Crs, f: impl Fn(Coord<f64>) -> Coord<f64>) -> Self {
        let sites = self
            .sites
            .iter()
            .map(|s| Site {
                position: Point::from(f(s.position.0)),
                ..s.clone()
            })
            .collect();
        Self { sites, crs }
    }
}
