use geo::{LineString, Point, Polygon};
use std::f64::consts::PI;

/// Segments used to approximate a circle when nothing else is configured
pub const DEFAULT_SEGMENTS: usize = 64;

/// Fewest segments accepted for a circle
pub const MIN_SEGMENTS: usize = 8;

/// Create a circular buffer around a point.
///
/// The vertices lie on the circle, so the polygon is slightly smaller than
/// the true disk. Planar distances only: `center` and `radius` must be in the
/// same projected, meter-based system.
pub fn circle(center: Point<f64>, radius: f64, segments: usize) -> Polygon<f64> {
    let n = segments.max(MIN_SEGMENTS);
    let r = radius.abs();

    let mut coords = Vec::with_capacity(n + 1);
    for i in 0..n {
        let angle = 2.0 * PI * i as f64 / n as f64;
        coords.push((center.x() + r * angle.cos(), center.y() + r * angle.sin()));
    }
    // Close the ring
    coords.push(coords[0]);

    Polygon::new(LineString::from(coords), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    #[test]
    fn test_circle_area() {
        let polygon = circle(Point::new(0.0, 0.0), 1000.0, DEFAULT_SEGMENTS);

        let expected = PI * 1000.0 * 1000.0;
        let error = (polygon.unsigned_area() - expected).abs() / expected;
        assert!(error < 0.01, "circle area error {:.3}%", error * 100.0);
    }

    #[test]
    fn test_circle_vertex_count() {
        let polygon = circle(Point::new(5.0, 5.0), 1.0, 32);
        assert_eq!(polygon.exterior().0.len(), 33);

        // Below the minimum the segment count is raised
        let coarse = circle(Point::new(5.0, 5.0), 1.0, 3);
        assert_eq!(coarse.exterior().0.len(), MIN_SEGMENTS + 1);
    }
}
