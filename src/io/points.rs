use anyhow::{Context, Result, bail};
use geojson::feature::Id;
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::features::{self, collection_from_value};
use crate::domain::PointRecord;

/// Point records plus the CRS the file declares, if any
#[derive(Debug)]
pub struct PointInput {
    pub records: Vec<PointRecord>,
    pub declared_crs: Option<String>,
}

pub fn read_point_records(path: &Path) -> Result<PointInput> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read point table: {:?}", path))?;
    parse_point_records(&contents)
        .with_context(|| format!("Failed to parse point table: {:?}", path))
}

/// Parse a point table: either a JSON array of
/// `{id, category, latitude, longitude}` rows or a GeoJSON FeatureCollection
/// of Point features with `id` and `category` properties. A null geometry or
/// null coordinate means geocoding failed.
pub fn parse_point_records(contents: &str) -> Result<PointInput> {
    let value: Value = serde_json::from_str(contents).context("Invalid JSON")?;

    if value.is_array() {
        let records: Vec<PointRecord> =
            serde_json::from_value(value).context("Invalid point record")?;
        return Ok(PointInput {
            records,
            declared_crs: None,
        });
    }

    let collection =
        collection_from_value(value).context("Expected a JSON array or a FeatureCollection")?;

    let mut records = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.iter().enumerate() {
        let Some(category) = features::property_string(feature, "category") else {
            bail!("feature {} has no category property", i);
        };
        let id = features::property_string(feature, "id")
            .or_else(|| {
                feature.id.as_ref().map(|id| match id {
                    Id::String(s) => s.clone(),
                    Id::Number(n) => n.to_string(),
                })
            })
            .unwrap_or_else(|| i.to_string());
        let (longitude, latitude) = match &feature.geometry {
            Some(geometry) => {
                let (x, y) = features::point(geometry)
                    .with_context(|| format!("feature {} ({})", i, id))?;
                (Some(x), Some(y))
            }
            None => (None, None),
        };
        records.push(PointRecord {
            id,
            category,
            latitude,
            longitude,
        });
    }

    Ok(PointInput {
        records,
        declared_crs: features::declared_crs(&collection).map(str::to_string),
    })
}

pub fn write_point_records(path: &Path, records: &[PointRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("Failed to serialize point table")?;
    fs::write(path, json).with_context(|| format!("Failed to write point table: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record_array() {
        let json = r#"[
            {"id": "1", "category": "wo", "latitude": 52.09, "longitude": 5.12},
            {"id": "2", "category": "hbo", "latitude": null, "longitude": null},
            {"id": "3", "category": "hbo"}
        ]"#;
        let input = parse_point_records(json).unwrap();

        assert_eq!(input.records.len(), 3);
        assert_eq!(input.records[0].latitude, Some(52.09));
        assert_eq!(input.records[1].latitude, None);
        assert_eq!(input.records[2].longitude, None);
        assert!(input.declared_crs.is_none());
    }

    #[test]
    fn test_parse_point_features() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"id": 1, "category": "wo"},
             "geometry": {"type": "Point", "coordinates": [5.12, 52.09]}},
            {"type": "Feature", "properties": {"category": "hbo"}, "geometry": null}
        ]}"#;
        let input = parse_point_records(json).unwrap();

        assert_eq!(input.records[0].id, "1");
        assert_eq!(input.records[0].longitude, Some(5.12));
        assert_eq!(input.records[0].latitude, Some(52.09));
        assert_eq!(input.records[1].id, "1");
        assert_eq!(input.records[1].latitude, None);
    }

    #[test]
    fn test_feature_member_id_used_when_property_missing() {
        let json = r#"{"type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:28992"}},
            "features": [
                {"type": "Feature", "id": "ho-12", "properties": {"category": "wo"},
                 "geometry": {"type": "Point", "coordinates": [136000.0, 455000.0, 3.0]}},
                {"type": "Feature", "id": 40, "properties": {"id": "x", "category": "wo"},
                 "geometry": null}
            ]}"#;
        let input = parse_point_records(json).unwrap();

        assert_eq!(input.records[0].id, "ho-12");
        assert_eq!(input.records[0].longitude, Some(136000.0));
        assert_eq!(input.records[1].id, "x");
        assert_eq!(input.declared_crs.as_deref(), Some("EPSG:28992"));
    }

    #[test]
    fn test_feature_without_category_rejected() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"id": 1},
             "geometry": {"type": "Point", "coordinates": [5.12, 52.09]}}
        ]}"#;
        assert!(parse_point_records(json).is_err());
    }

    #[test]
    fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.json");
        let records = vec![PointRecord {
            id: "a".to_string(),
            category: "wo".to_string(),
            latitude: None,
            longitude: None,
        }];

        write_point_records(&path, &records).unwrap();
        let input = read_point_records(&path).unwrap();
        assert_eq!(input.records, records);
    }
}
