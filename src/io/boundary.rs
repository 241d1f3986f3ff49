use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use super::features::{self, parse_collection};
use crate::config::BoundarySourceConfig;
use crate::domain::{AreaType, Boundary, BoundaryFeature};
use crate::geometry::Crs;

pub fn read_boundary(
    path: &Path,
    source: &BoundarySourceConfig,
    crs_override: Option<&str>,
) -> Result<Boundary> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read boundary: {:?}", path))?;
    parse_boundary(&contents, source, crs_override)
        .with_context(|| format!("Failed to load boundary: {:?}", path))
}

/// Parse a land/water boundary. A feature is water when its area type
/// property matches one of `source.water_values` (case-insensitive), land
/// otherwise. The CRS is taken from the override, the file's `crs` member,
/// the config, then EPSG:4326, in that order.
pub fn parse_boundary(
    contents: &str,
    source: &BoundarySourceConfig,
    crs_override: Option<&str>,
) -> Result<Boundary> {
    let collection = parse_collection(contents)?;

    let crs_id = crs_override
        .or(features::declared_crs(&collection))
        .or(source.crs.as_deref())
        .unwrap_or("EPSG:4326");
    let crs = Crs::parse(crs_id)?;

    let mut parts = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.iter().enumerate() {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let geometry = match features::to_multipolygon(geometry) {
            Ok(geometry) => geometry,
            Err(e) => {
                warn!(feature = i, error = %e, "skipping boundary feature");
                continue;
            }
        };
        let is_water = features::property_string(feature, &source.area_type_field)
            .is_some_and(|value| {
                source
                    .water_values
                    .iter()
                    .any(|w| w.eq_ignore_ascii_case(value.trim()))
            });
        parts.push(BoundaryFeature {
            geometry,
            area_type: if is_water {
                AreaType::Water
            } else {
                AreaType::Land
            },
        });
    }

    info!(features = parts.len(), %crs, "loaded boundary");
    Ok(Boundary::from_features(parts, crs)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    const BOUNDARY: &str = r#"{"type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "EPSG:28992"}},
        "features": [
            {"type": "Feature", "properties": {"area_type": "land"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
            {"type": "Feature", "properties": {"area_type": "Water body"},
             "geometry": {"type": "Polygon", "coordinates": [[[2,2],[4,2],[4,4],[2,4],[2,2]]]}},
            {"type": "Feature", "properties": {"area_type": "WATER"},
             "geometry": {"type": "Polygon", "coordinates": [[[6,6],[7,6],[7,7],[6,7],[6,6]]]}},
            {"type": "Feature", "properties": {}, "geometry": null}
        ]}"#;

    #[test]
    fn test_land_and_water_split() {
        let boundary = parse_boundary(BOUNDARY, &BoundarySourceConfig::default(), None).unwrap();

        assert_eq!(boundary.crs(), &Crs::Planar("EPSG:28992".into()));
        assert!((boundary.land().unsigned_area() - 100.0).abs() < 1e-6);
        assert!((boundary.water().unsigned_area() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_crs_override_wins() {
        let boundary =
            parse_boundary(BOUNDARY, &BoundarySourceConfig::default(), Some("EPSG:3035")).unwrap();
        assert_eq!(boundary.crs(), &Crs::Planar("EPSG:3035".into()));
    }

    #[test]
    fn test_custom_area_type_field() {
        let source = BoundarySourceConfig {
            area_type_field: "kind".to_string(),
            ..Default::default()
        };
        // No feature has `kind`, so everything is land
        let boundary = parse_boundary(BOUNDARY, &source, None).unwrap();
        assert!(boundary.water().0.is_empty());
    }

    #[test]
    fn test_water_only_boundary_rejected() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"area_type": "water"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}
        ]}"#;
        assert!(parse_boundary(json, &BoundarySourceConfig::default(), None).is_err());
    }
}
