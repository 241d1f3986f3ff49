use geo::{Area, MultiPolygon};
use serde::{Serialize, Serializer};
use std::fmt;

use super::{Category, Diagnostic};

/// Position of a band in its category's partition.
///
/// Ring indices are 1-based and category-relative: a threshold with no
/// coverage for a category is skipped for that category only, and the
/// remaining rings are numbered contiguously. Use [`Band::upper`] to map a
/// ring back to the threshold it represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BandIndex {
    Ring(usize),
    Outside,
}

impl Serialize for BandIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BandIndex::Ring(i) => serializer.serialize_u64(*i as u64),
            BandIndex::Outside => serializer.serialize_str("outside"),
        }
    }
}

impl fmt::Display for BandIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandIndex::Ring(i) => write!(f, "{}", i),
            BandIndex::Outside => f.write_str("outside"),
        }
    }
}

/// One region of a category's partition of `land \ water`.
#[derive(Debug, Clone)]
pub struct Band {
    pub category: Category,
    pub index: BandIndex,
    /// Threshold the band starts at; `None` for the innermost ring.
    pub lower: Option<f64>,
    /// Threshold the band ends at; `None` for the outside band.
    pub upper: Option<f64>,
    pub geometry: MultiPolygon<f64>,
    /// Set when the band could not be computed and is reported empty.
    pub diagnostic: Option<Diagnostic>,
}

impl Band {
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }

    pub fn is_flagged(&self) -> bool {
        self.diagnostic.is_some()
    }
}
