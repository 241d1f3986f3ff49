use anyhow::{Context, Result};
use geojson::JsonObject;
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::warn;

use super::features::{self, parse_collection};
use crate::coverage::IsochroneRecord;
use crate::domain::Category;
use crate::geometry::Crs;

pub fn read_isochrones(path: &Path) -> Result<(Vec<IsochroneRecord>, Crs)> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read isochrone table: {:?}", path))?;
    parse_isochrones(&contents)
        .with_context(|| format!("Failed to parse isochrone table: {:?}", path))
}

/// Parse an isochrone table: Polygon/MultiPolygon features with `point_id`,
/// `category` and `range` properties (`id`/`value` are accepted as well).
/// Features without a usable geometry are skipped.
pub fn parse_isochrones(contents: &str) -> Result<(Vec<IsochroneRecord>, Crs)> {
    let collection = parse_collection(contents)?;
    let crs = match features::declared_crs(&collection) {
        Some(id) => Crs::parse(id)?,
        None => Crs::Geographic,
    };

    let mut records = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.iter().enumerate() {
        let point_id = features::property_string(feature, "point_id")
            .or_else(|| features::property_string(feature, "id"))
            .with_context(|| format!("feature {} has no point_id", i))?;
        let category = features::property_string(feature, "category")
            .with_context(|| format!("feature {} has no category", i))?;
        let threshold = features::property_f64(feature, "range")
            .or_else(|| features::property_f64(feature, "value"))
            .with_context(|| format!("feature {} has no range", i))?;

        let geometry = match feature.geometry.as_ref().map(features::to_multipolygon) {
            Some(Ok(geometry)) => geometry,
            Some(Err(e)) => {
                warn!(feature = i, point = %point_id, error = %e, "skipping isochrone");
                continue;
            }
            None => {
                warn!(feature = i, point = %point_id, "skipping isochrone without geometry");
                continue;
            }
        };

        records.push(IsochroneRecord {
            point_id,
            category: Category::new(category)?,
            threshold,
            geometry,
        });
    }

    Ok((records, crs))
}

pub fn write_isochrones(path: &Path, records: &[IsochroneRecord], crs: &Crs) -> Result<()> {
    let rows = records
        .iter()
        .map(|record| {
            let mut properties = JsonObject::new();
            properties.insert("point_id".to_string(), json!(record.point_id));
            properties.insert("category".to_string(), json!(record.category));
            properties.insert("range".to_string(), json!(record.threshold));
            features::feature(
                Some(features::multipolygon_geometry(&record.geometry)),
                properties,
            )
        })
        .collect();

    let collection = features::collection(rows, Some(crs));
    let json = serde_json::to_string(&collection).context("Failed to serialize isochrones")?;
    fs::write(path, json).with_context(|| format!("Failed to write isochrone table: {:?}", path))
}
