pub mod buffer;
pub mod ops;
pub mod projection;
pub mod repair;
pub mod reproject;
pub mod validation;

pub use buffer::{DEFAULT_SEGMENTS, MIN_SEGMENTS, circle};
pub use projection::{Crs, Projector};
pub use repair::repair;
pub use reproject::Reprojection;
pub use validation::{PartitionReport, dry_land, validate_partition};
