use geo::{Area, MultiPolygon, Point, Rect, coord};

use reachbands::bands::{RunReport, RunRequest, run};
use reachbands::coverage::{BufferCoverage, IsochroneCoverage, IsochroneRecord};
use reachbands::domain::{Band, BandIndex, Boundary, Category, DiagnosticKind, PointTable, Site, Thresholds};
use reachbands::geometry::{Crs, DEFAULT_SEGMENTS, circle, ops};

fn planar() -> Crs {
    Crs::Planar("EPSG:28992".into())
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 })
        .to_polygon()
        .into()
}

fn boundary(water: MultiPolygon<f64>) -> Boundary {
    Boundary::new(rect(0.0, 0.0, 10_000.0, 10_000.0), water, planar()).unwrap()
}

fn wo() -> Category {
    Category::new("wo").unwrap()
}

fn disk_area(radius: f64) -> f64 {
    circle(Point::new(0.0, 0.0), radius, DEFAULT_SEGMENTS).unsigned_area()
}

fn run_buffers(points: &PointTable, thresholds: &[f64], boundary: &Boundary) -> RunReport {
    let source = BufferCoverage::new(points, DEFAULT_SEGMENTS).unwrap();
    let request = RunRequest::new(
        points.categories().into_iter().collect(),
        Thresholds::new(thresholds.iter().copied()).unwrap(),
    );
    run(&request, points, &source, boundary).unwrap()
}

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} got {} (tolerance {})",
        expected,
        actual,
        tolerance
    );
}

/// Bands are pairwise disjoint and add up to `land \ water`.
fn assert_partition(bands: &[Band], boundary: &Boundary) {
    let dry = ops::difference(boundary.land(), boundary.water()).unwrap();
    let tolerance = dry.unsigned_area() * 1e-6;

    let total: f64 = bands.iter().map(Band::area).sum();
    assert_close(total, dry.unsigned_area(), tolerance);

    for (i, a) in bands.iter().enumerate() {
        for b in &bands[i + 1..] {
            let shared = ops::intersection(&a.geometry, &b.geometry)
                .unwrap()
                .unsigned_area();
            assert!(
                shared <= tolerance,
                "bands {} and {} overlap by {}",
                a.index,
                b.index,
                shared
            );
        }
    }
}

#[test]
fn test_single_point_rings_are_annuli() {
    let points = PointTable::new(
        vec![Site::new("1", wo(), Point::new(5000.0, 5000.0))],
        planar(),
    );
    let boundary = boundary(ops::empty());
    let report = run_buffers(&points, &[1000.0, 2000.0, 3000.0], &boundary);
    let bands = report.bands_for(&wo()).unwrap();

    assert_eq!(bands.len(), 4);
    assert_close(bands[0].area(), disk_area(1000.0), 1.0);
    assert_close(bands[1].area(), disk_area(2000.0) - disk_area(1000.0), 1.0);
    assert_close(bands[2].area(), disk_area(3000.0) - disk_area(2000.0), 1.0);
    assert_close(bands[3].area(), 1e8 - disk_area(3000.0), 1.0);
    assert_partition(bands, &boundary);
    assert!(report.diagnostics.is_empty());
}

#[test]
fn test_threshold_order_does_not_matter() {
    let points = PointTable::new(
        vec![
            Site::new("1", wo(), Point::new(3000.0, 3000.0)),
            Site::new("2", wo(), Point::new(6500.0, 7000.0)),
        ],
        planar(),
    );
    let boundary = boundary(ops::empty());

    let shuffled = run_buffers(&points, &[1200.0, 600.0, 900.0], &boundary);
    let sorted = run_buffers(&points, &[600.0, 900.0, 1200.0], &boundary);

    let a = shuffled.bands_for(&wo()).unwrap();
    let b = sorted.bands_for(&wo()).unwrap();
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert_eq!(x.index, y.index);
        assert_eq!(x.lower, y.lower);
        assert_eq!(x.upper, y.upper);
        assert_close(x.area(), y.area(), 1e-6);
    }
    assert_eq!(a[0].upper, Some(600.0));
    assert_eq!(a[3].index, BandIndex::Outside);
}

#[test]
fn test_water_removed_from_every_band() {
    let water = rect(6300.0, 4800.0, 6700.0, 5200.0);
    let boundary = boundary(water.clone());
    let points = PointTable::new(
        vec![Site::new("1", wo(), Point::new(5000.0, 5000.0))],
        planar(),
    );
    let report = run_buffers(&points, &[1000.0, 2000.0, 3000.0], &boundary);
    let bands = report.bands_for(&wo()).unwrap();

    for band in bands {
        let wet = ops::intersection(&band.geometry, &water)
            .unwrap()
            .unsigned_area();
        assert!(wet < 1e-3, "band {} covers {} of water", band.index, wet);
    }
    // The lake lies entirely between 1 and 2 km from the point
    assert_close(
        bands[1].area(),
        disk_area(2000.0) - disk_area(1000.0) - 160_000.0,
        1.0,
    );
    assert_close(bands[0].area(), disk_area(1000.0), 1.0);
    assert_partition(bands, &boundary);
}

#[test]
fn test_two_points_cover_land_exactly_once() {
    let points = PointTable::new(
        vec![
            Site::new("center", wo(), Point::new(5000.0, 5000.0)),
            Site::new("corner", wo(), Point::new(500.0, 500.0)),
        ],
        planar(),
    );
    let boundary = boundary(ops::empty());
    let report = run_buffers(&points, &[1000.0, 2000.0], &boundary);
    let bands = report.bands_for(&wo()).unwrap();

    assert_eq!(bands.len(), 3);
    assert_partition(bands, &boundary);

    // The corner disk is clipped by the land edge
    let inner: Vec<MultiPolygon<f64>> = [(5000.0, 5000.0), (500.0, 500.0)]
        .iter()
        .map(|&(x, y)| MultiPolygon::from(circle(Point::new(x, y), 1000.0, DEFAULT_SEGMENTS)))
        .collect();
    let reached = ops::intersection(&ops::union_all(&inner).unwrap(), boundary.land()).unwrap();
    assert_close(bands[0].area(), reached.unsigned_area(), 1.0);
    assert!(bands[0].area() < 2.0 * disk_area(1000.0));
    assert_eq!(report.flagged_count(), 0);
}

#[test]
fn test_category_without_points_leaves_others_intact() {
    let hbo = Category::new("hbo").unwrap();
    let points = PointTable::new(
        vec![Site::new("1", wo(), Point::new(5000.0, 5000.0))],
        planar(),
    );
    let boundary = boundary(ops::empty());
    let source = BufferCoverage::new(&points, DEFAULT_SEGMENTS).unwrap();
    let request = RunRequest::new(
        vec![hbo.clone(), wo()],
        Thresholds::new([1000.0, 2000.0]).unwrap(),
    );

    let report = run(&request, &points, &source, &boundary).unwrap();

    assert!(report.bands_for(&hbo).unwrap().is_empty());
    assert_partition(report.bands_for(&wo()).unwrap(), &boundary);
    assert!(
        report
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::NoPoints && d.category.as_ref() == Some(&hbo))
    );
}

#[test]
fn test_missing_isochrones_skip_thresholds() {
    let points = PointTable::new(
        vec![
            Site::new("a", wo(), Point::new(2000.0, 2000.0)),
            Site::new("b", wo(), Point::new(8000.0, 8000.0)),
        ],
        planar(),
    );
    // Only the 900 s isochrone of point `a` exists
    let records = vec![IsochroneRecord {
        point_id: "a".into(),
        category: wo(),
        threshold: 900.0,
        geometry: rect(1000.0, 1000.0, 3000.0, 3000.0),
    }];
    let source = IsochroneCoverage::new(&points, records);
    let boundary = boundary(ops::empty());
    let request = RunRequest::new(vec![wo()], Thresholds::new([600.0, 900.0]).unwrap());

    let report = run(&request, &points, &source, &boundary).unwrap();
    let bands = report.bands_for(&wo()).unwrap();

    assert_eq!(bands.len(), 2);
    assert_eq!(bands[0].index, BandIndex::Ring(1));
    assert_eq!(bands[0].upper, Some(900.0));
    assert_close(bands[0].area(), 4_000_000.0, 1e-6);
    assert_partition(bands, &boundary);

    let missing = report
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::MissingIsochrone)
        .count();
    assert_eq!(missing, 3);
    let skipped: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::EmptyCoverage)
        .collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].threshold, Some(600.0));
}
