use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon};

use super::ops::{all_finite, cascade, empty, guarded};
use crate::error::GeometryRepairError;

/// Make a multipolygon valid before it takes part in any overlay.
///
/// Drops rings with fewer than three distinct vertices and runs each
/// remaining polygon through the overlay engine on its own (the equivalent of
/// a zero-width buffer), which splits self-intersections. The overlay engine
/// uses the even-odd rule within one operand, so overlapping parts are merged
/// by a separate pairwise union. Zero-area leftovers are removed.
pub fn repair(geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, GeometryRepairError> {
    if !all_finite(geometry) {
        return Err(GeometryRepairError::new(
            "repair",
            "geometry has non-finite coordinates",
        ));
    }

    let mut parts = Vec::with_capacity(geometry.0.len());
    for polygon in geometry.iter().filter_map(clean_polygon) {
        let resolved = guarded("repair", || MultiPolygon::new(vec![polygon]).union(&empty()))?;
        parts.push(without_slivers(resolved));
    }

    let merged = cascade(parts, |a, b| guarded("repair", || a.union(b)))?;
    Ok(without_slivers(merged))
}

fn without_slivers(geometry: MultiPolygon<f64>) -> MultiPolygon<f64> {
    geometry
        .into_iter()
        .filter(|p| p.unsigned_area() > 0.0)
        .collect()
}

fn clean_polygon(polygon: &Polygon<f64>) -> Option<Polygon<f64>> {
    let exterior = clean_ring(polygon.exterior());
    if exterior.0.len() < 4 {
        return None;
    }
    let interiors = polygon
        .interiors()
        .iter()
        .map(clean_ring)
        .filter(|ring| ring.0.len() >= 4)
        .collect();
    Some(Polygon::new(exterior, interiors))
}

fn clean_ring(ring: &LineString<f64>) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = ring.0.clone();
    coords.dedup();
    let mut ring = LineString::new(coords);
    ring.close();
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Rect, coord, polygon};

    #[test]
    fn test_repair_bowtie() {
        // Self-intersecting ring whose signed area cancels to zero
        let bowtie: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
        ];
        assert!(bowtie.signed_area().abs() < 1e-12);

        let repaired = repair(&bowtie.into()).unwrap();
        assert!((repaired.unsigned_area() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_repair_merges_overlapping_parts() {
        let a = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 2.0 }).to_polygon();
        let b = Rect::new(coord! { x: 1.0, y: 0.0 }, coord! { x: 3.0, y: 2.0 }).to_polygon();
        let repaired = repair(&MultiPolygon::new(vec![a, b])).unwrap();
        assert!((repaired.unsigned_area() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_repair_drops_degenerate_rings() {
        let sliver = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 1.0, y: 1.0)];
        let repaired = repair(&sliver.into()).unwrap();
        assert!(repaired.0.is_empty());
    }

    #[test]
    fn test_repair_rejects_nan() {
        let broken = polygon![(x: 0.0, y: 0.0), (x: f64::NAN, y: 1.0), (x: 1.0, y: 0.0)];
        assert!(repair(&broken.into()).is_err());
    }
}
