use geo::{Area, Coord, MapCoords, MultiPolygon};
use tracing::debug;

use crate::error::InputDataError;
use crate::geometry::{Crs, ops, repair};

/// Which side of the land/water split a boundary feature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaType {
    Land,
    Water,
}

/// One polygon of the boundary source.
#[derive(Debug, Clone)]
pub struct BoundaryFeature {
    pub geometry: MultiPolygon<f64>,
    pub area_type: AreaType,
}

/// Land/water reference boundary, each side dissolved into one
/// multipolygon. Read-only for the whole run.
#[derive(Debug, Clone)]
pub struct Boundary {
    land: MultiPolygon<f64>,
    water: MultiPolygon<f64>,
    crs: Crs,
}

impl Boundary {
    /// Repair and dissolve already separated land and water geometry.
    pub fn new(
        land: MultiPolygon<f64>,
        water: MultiPolygon<f64>,
        crs: Crs,
    ) -> Result<Self, InputDataError> {
        let land = repair(&land).map_err(|e| InputDataError::InvalidBoundary(e.to_string()))?;
        let water = repair(&water).map_err(|e| InputDataError::InvalidBoundary(e.to_string()))?;
        if land.unsigned_area() <= 0.0 {
            return Err(InputDataError::EmptyLand);
        }
        Ok(Self { land, water, crs })
    }

    /// Dissolve a feature table into land and water.
    pub fn from_features(
        features: Vec<BoundaryFeature>,
        crs: Crs,
    ) -> Result<Self, InputDataError> {
        let mut land_parts = Vec::new();
        let mut water_parts = Vec::new();
        for feature in features {
            let repaired = repair(&feature.geometry)
                .map_err(|e| InputDataError::InvalidBoundary(e.to_string()))?;
            match feature.area_type {
                AreaType::Land => land_parts.push(repaired),
                AreaType::Water => water_parts.push(repaired),
            }
        }
        debug!(
            land = land_parts.len(),
            water = water_parts.len(),
            "dissolving boundary features"
        );

        let land = ops::union_all(&land_parts)
            .map_err(|e| InputDataError::InvalidBoundary(e.to_string()))?;
        let water = ops::union_all(&water_parts)
            .map_err(|e| InputDataError::InvalidBoundary(e.to_string()))?;
        if land.unsigned_area() <= 0.0 {
            return Err(InputDataError::EmptyLand);
        }
        Ok(Self { land, water, crs })
    }

    pub fn land(&self) -> &MultiPolygon<f64> {
        &self.land
    }

    pub fn water(&self) -> &MultiPolygon<f64> {
        &self.water
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// New boundary with every coordinate mapped through `f`.
    pub fn transformed(&self, crs: Crs, f: impl Fn(Coord<f64>) -> Coord<f64> + Copy) -> Self {
        Self {
            land: self.land.map_coords(f),
            water: self.water.map_coords(f),
            crs,
        }
    }
}
