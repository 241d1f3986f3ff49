use geo::Coord;
use std::fmt;

use crate::error::InputDataError;

/// Coordinate reference system of an input or of the run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Longitude/latitude degrees (WGS84 or a compatible datum).
    Geographic,
    /// A planar, meter-based system, identified by `AUTHORITY:CODE`.
    Planar(String),
}

const GEOGRAPHIC_IDS: &[&str] = &["EPSG:4326", "EPSG:4258", "EPSG:4979", "OGC:CRS84"];

impl Crs {
    /// Parse `EPSG:28992`, `urn:ogc:def:crs:EPSG::4326`, `OGC:CRS84` and
    /// similar identifiers.
    pub fn parse(id: &str) -> Result<Self, InputDataError> {
        let upper = id.trim().to_ascii_uppercase();
        let short = match upper.strip_prefix("URN:OGC:DEF:CRS:") {
            Some(rest) => {
                let parts: Vec<&str> = rest.split(':').filter(|p| !p.is_empty()).collect();
                match parts.as_slice() {
                    [authority, .., code] => format!("{}:{}", authority, code),
                    _ => return Err(InputDataError::UnknownCrs(id.to_string())),
                }
            }
            None => upper,
        };

        let valid = short
            .split_once(':')
            .is_some_and(|(authority, code)| !authority.is_empty() && !code.is_empty());
        if !valid {
            return Err(InputDataError::UnknownCrs(id.to_string()));
        }

        if GEOGRAPHIC_IDS.contains(&short.as_str()) {
            Ok(Crs::Geographic)
        } else {
            Ok(Crs::Planar(short))
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Geographic => f.write_str("EPSG:4326"),
            Crs::Planar(code) => f.write_str(code),
        }
    }
}

// Meters per degree at equator
const METERS_PER_DEGREE: f64 = 111320.0;

/// Sinusoidal projection from WGS84 degrees to local meters:
/// - x = (lon - center_lon) * cos(lat) * 111320
/// - y = (lat - center_lat) * 111320
///
/// Equal-area, and distances are close to true near the central meridian,
/// which is enough for buffering and area checks at the scale of a small
/// country without pulling in a full projection library.
#[derive(Debug, Clone, PartialEq)]
pub struct Projector {
    center_lat: f64,
    center_lon: f64,
}

impl Projector {
    /// Create a new projector centered at the given coordinates
    ///
    /// # Arguments
    /// * `center` - (lat, lon) center point in WGS84
    pub fn new(center: (f64, f64)) -> Self {
        let (lat, lon) = center;
        Self {
            center_lat: lat,
            center_lon: lon,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_lat, self.center_lon)
    }

    /// Project a lat/lon point to local meters
    ///
    /// # Returns
    /// * (x, y) in meters, centered at the projection center
    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        let x = (lon - self.center_lon) * lat.to_radians().cos() * METERS_PER_DEGREE;
        let y = (lat - self.center_lat) * METERS_PER_DEGREE;
        (x, y)
    }

    /// Inverse of [`Projector::project`]
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let lat = y / METERS_PER_DEGREE + self.center_lat;
        let cos_lat = lat.to_radians().cos();
        let lon = if cos_lat.abs() < 1e-12 {
            self.center_lon
        } else {
            x / (cos_lat * METERS_PER_DEGREE) + self.center_lon
        };
        (lat, lon)
    }

    /// Project a geo coordinate (`x = lon, y = lat`)
    pub fn project_coord(&self, c: Coord<f64>) -> Coord<f64> {
        let (x, y) = self.project(c.y, c.x);
        Coord { x, y }
    }

    pub fn unproject_coord(&self, c: Coord<f64>) -> Coord<f64> {
        let (lat, lon) = self.unproject(c.x, c.y);
        Coord { x: lon, y: lat }
    }
}
