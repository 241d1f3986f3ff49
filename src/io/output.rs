use anyhow::{Context, Result};
use geojson::{FeatureCollection, JsonObject};
use serde_json::json;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use super::features;
use crate::bands::RunReport;
use crate::config::{CoverageMode, LocaleStrings};
use crate::domain::{Band, Diagnostic};
use crate::geometry::Reprojection;

/// What the writers need besides the results themselves.
#[derive(Debug, Clone, Copy)]
pub struct OutputContext<'a> {
    pub mode: CoverageMode,
    pub strings: LocaleStrings,
    pub reprojection: &'a Reprojection,
}

fn band_properties(band: &Band, ctx: &OutputContext) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("category".to_string(), json!(band.category));
    properties.insert(
        "legend".to_string(),
        json!(ctx.strings.legend_name(&band.category)),
    );
    properties.insert("band".to_string(), json!(band.index));
    properties.insert("lower".to_string(), json!(band.lower));
    properties.insert("upper".to_string(), json!(band.upper));
    properties.insert(
        "label".to_string(),
        json!(ctx.strings.band_label(ctx.mode, band.lower, band.upper)),
    );
    // Area in square meters of the working CRS
    properties.insert("area".to_string(), json!(band.area()));
    properties.insert(
        "diagnostic".to_string(),
        json!(band.diagnostic.as_ref().map(|d| d.to_string())),
    );
    properties
}

/// Every band of every category as one feature collection in the output CRS.
pub fn band_features(report: &RunReport, ctx: &OutputContext) -> FeatureCollection {
    let bands = report
        .categories
        .iter()
        .flat_map(|c| &c.bands)
        .map(|band| {
            let geometry = ctx.reprojection.restore(&band.geometry);
            features::feature(
                Some(features::multipolygon_geometry(&geometry)),
                band_properties(band, ctx),
            )
        })
        .collect();

    features::collection(bands, Some(&ctx.reprojection.output_crs()))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("Failed to write {:?}", path))
}

pub fn write_bands(dir: &Path, report: &RunReport, ctx: &OutputContext) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {:?}", dir))?;
    let path = dir.join(ctx.strings.output_file(ctx.mode));
    let collection = band_features(report, ctx);
    write_json(&path, &collection)?;
    info!(
        path = %path.display(),
        features = collection.features.len(),
        "wrote bands"
    );
    Ok(path)
}

pub fn write_diagnostics(
    dir: &Path,
    diagnostics: &[Diagnostic],
    ctx: &OutputContext,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {:?}", dir))?;
    let path = dir.join(ctx.strings.diagnostics_file(ctx.mode));
    write_json(&path, &diagnostics)?;
    info!(path = %path.display(), count = diagnostics.len(), "wrote diagnostics");
    Ok(path)
}
