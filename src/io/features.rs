//! Helpers over the `geojson` crate: feature collections of points and
//! (multi)polygons, plus the legacy named `crs` member

use anyhow::{Context, Result, bail};
use geo::{MultiPolygon, Point};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};
use serde_json::json;

use crate::geometry::Crs;

/// Parse GeoJSON text into a feature collection; a lone feature is wrapped
pub fn parse_collection(contents: &str) -> Result<FeatureCollection> {
    let value: JsonValue = serde_json::from_str(contents).context("Invalid JSON")?;
    collection_from_value(value)
}

pub fn collection_from_value(value: JsonValue) -> Result<FeatureCollection> {
    match GeoJson::from_json_value(value).context("Invalid GeoJSON")? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(feature) => Ok(FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }),
        GeoJson::Geometry(_) => bail!("expected a FeatureCollection, got a bare geometry"),
    }
}

/// Collection with `{"crs": {"type": "name", "properties": {"name": ...}}}`
/// as a foreign member when a CRS is given
pub fn collection(features: Vec<Feature>, crs: Option<&Crs>) -> FeatureCollection {
    let foreign_members = crs.map(|crs| {
        let mut members = JsonObject::new();
        members.insert(
            "crs".to_string(),
            json!({"type": "name", "properties": {"name": crs.to_string()}}),
        );
        members
    });
    FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    }
}

pub fn declared_crs(collection: &FeatureCollection) -> Option<&str> {
    collection
        .foreign_members
        .as_ref()?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
}

pub fn feature(geometry: Option<Geometry>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn multipolygon_geometry(geometry: &MultiPolygon<f64>) -> Geometry {
    Geometry::new(Value::from(geometry))
}

/// String form of a property; numbers are accepted too (`"id": 12`)
pub fn property_string(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn property_f64(feature: &Feature, key: &str) -> Option<f64> {
    match feature.property(key)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn to_multipolygon(geometry: &Geometry) -> Result<MultiPolygon<f64>> {
    match &geometry.value {
        Value::Polygon(rings) => {
            if rings.is_empty() {
                bail!("polygon has no rings");
            }
        }
        Value::MultiPolygon(polygons) => {
            if polygons.iter().any(|rings| rings.is_empty()) {
                bail!("polygon has no rings");
            }
        }
        _ => bail!("expected a Polygon or MultiPolygon geometry"),
    }
    check_positions(&geometry.value)?;
    match geo::Geometry::<f64>::try_from(geometry.value.clone())? {
        geo::Geometry::Polygon(polygon) => Ok(MultiPolygon::new(vec![polygon])),
        geo::Geometry::MultiPolygon(multi) => Ok(multi),
        _ => bail!("expected a Polygon or MultiPolygon geometry"),
    }
}

/// `(x, y)` of a Point geometry
pub fn point(geometry: &Geometry) -> Result<(f64, f64)> {
    if !matches!(geometry.value, Value::Point(_)) {
        bail!("expected a Point geometry");
    }
    check_positions(&geometry.value)?;
    let point = Point::<f64>::try_from(geometry.value.clone())?;
    Ok((point.x(), point.y()))
}

/// Positions need an x and a y; a third (altitude) value is ignored
fn check_positions(value: &Value) -> Result<()> {
    let short = match value {
        Value::Point(position) => Some(position.len()).filter(|&n| n < 2),
        Value::Polygon(rings) => rings.iter().flatten().map(Vec::len).find(|&n| n < 2),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .flatten()
            .map(Vec::len)
            .find(|&n| n < 2),
        _ => None,
    };
    match short {
        Some(n) => bail!("position needs at least two values, got {}", n),
        None => Ok(()),
    }
}
