use geo::{BoundingRect, MapCoords, MultiPolygon};
use tracing::info;

use super::{Crs, Projector};
use crate::domain::{Boundary, PointTable};
use crate::error::InputDataError;

/// How every input is brought into the one planar CRS a run works in.
/// Decided once per run from the boundary; applying it produces new values.
#[derive(Debug, Clone, PartialEq)]
pub enum Reprojection {
    /// The boundary is already planar; inputs must share its CRS.
    Identity(Crs),
    /// The boundary is geographic; everything geographic is projected to
    /// local meters around the boundary's center.
    Local(Projector),
}

impl Reprojection {
    pub fn plan(boundary: &Boundary) -> Self {
        match boundary.crs() {
            Crs::Planar(_) => Reprojection::Identity(boundary.crs().clone()),
            Crs::Geographic => {
                let center = boundary
                    .land()
                    .bounding_rect()
                    .map(|rect| rect.center())
                    .unwrap_or_default();
                info!(lat = center.y, lon = center.x, "projecting geographic inputs to local meters");
                Reprojection::Local(Projector::new((center.y, center.x)))
            }
        }
    }

    /// CRS of everything after reprojection.
    pub fn target(&self) -> Crs {
        match self {
            Reprojection::Identity(crs) => crs.clone(),
            Reprojection::Local(projector) => {
                let (lat, lon) = projector.center();
                Crs::Planar(format!("LOCAL:{:.6},{:.6}", lat, lon))
            }
        }
    }

    /// CRS results are written back in.
    pub fn output_crs(&self) -> Crs {
        match self {
            Reprojection::Identity(crs) => crs.clone(),
            Reprojection::Local(_) => Crs::Geographic,
        }
    }

    fn check(&self, input: &'static str, found: &Crs) -> Result<(), InputDataError> {
        let accepted = match self {
            Reprojection::Identity(crs) => found == crs,
            Reprojection::Local(_) => found.is_geographic(),
        };
        if accepted {
            Ok(())
        } else {
            Err(InputDataError::CrsMismatch {
                input,
                found: found.clone(),
                target: self.output_crs(),
            })
        }
    }

    pub fn boundary(&self, boundary: &Boundary) -> Result<Boundary, InputDataError> {
        self.check("boundary", boundary.crs())?;
        Ok(match self {
            Reprojection::Identity(_) => boundary.clone(),
            Reprojection::Local(projector) => {
                boundary.transformed(self.target(), |c| projector.project_coord(c))
            }
        })
    }

    pub fn points(&self, points: &PointTable) -> Result<PointTable, InputDataError> {
        self.check("point table", points.crs())?;
        Ok(match self {
            Reprojection::Identity(_) => points.clone(),
            Reprojection::Local(projector) => {
                points.transformed(self.target(), |c| projector.project_coord(c))
            }
        })
    }

    pub fn geometry(
        &self,
        input: &'static str,
        geometry: &MultiPolygon<f64>,
        crs: &Crs,
    ) -> Result<MultiPolygon<f64>, InputDataError> {
        self.check(input, crs)?;
        Ok(match self {
            Reprojection::Identity(_) => geometry.clone(),
            Reprojection::Local(projector) => geometry.map_coords(|c| projector.project_coord(c)),
        })
    }

    /// Bring a result geometry back into [`Reprojection::output_crs`].
    pub fn restore(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        match self {
            Reprojection::Identity(_) => geometry.clone(),
            Reprojection::Local(projector) => geometry.map_coords(|c| projector.unproject_coord(c)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Site};
    use geo::{Area, Point, Rect, coord};

    fn geographic_boundary() -> Boundary {
        let land = Rect::new(coord! { x: 4.0, y: 52.0 }, coord! { x: 5.0, y: 53.0 }).to_polygon();
        Boundary::new(land.into(), MultiPolygon::new(vec![]), Crs::Geographic).unwrap()
    }

    #[test]
    fn test_geographic_boundary_projected_once() {
        let boundary = geographic_boundary();
        let plan = Reprojection::plan(&boundary);
        let projected = plan.boundary(&boundary).unwrap();

        assert!(!projected.crs().is_geographic());
        // One degree of latitude by one degree of longitude at 52.5N
        let expected = 111320.0 * 111320.0 * 52.5_f64.to_radians().cos();
        let error = (projected.land().unsigned_area() - expected).abs() / expected;
        assert!(error < 0.01);

        let restored = plan.restore(projected.land());
        assert!((restored.unsigned_area() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_points_follow_boundary() {
        let boundary = geographic_boundary();
        let plan = Reprojection::plan(&boundary);
        let points = PointTable::new(
            vec![Site::new("1", Category::new("wo").unwrap(), Point::new(4.5, 52.5))],
            Crs::Geographic,
        );

        let projected = plan.points(&points).unwrap();
        let position = projected.sites()[0].position;
        assert!(position.x().abs() < 1e-6);
        assert!(position.y().abs() < 1e-6);
        assert_eq!(projected.crs(), &plan.target());
    }

    #[test]
    fn test_planar_mismatch_rejected() {
        let land = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 10.0 }).to_polygon();
        let boundary = Boundary::new(
            land.into(),
            MultiPolygon::new(vec![]),
            Crs::Planar("EPSG:28992".into()),
        )
        .unwrap();
        let plan = Reprojection::plan(&boundary);
        let points = PointTable::new(Vec::new(), Crs::Geographic);

        assert!(matches!(
            plan.points(&points),
            Err(InputDataError::CrsMismatch { .. })
        ));
    }
}
