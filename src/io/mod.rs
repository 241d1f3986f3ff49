pub mod boundary;
pub mod features;
pub mod isochrones;
pub mod output;
pub mod points;

pub use boundary::read_boundary;
pub use isochrones::{read_isochrones, write_isochrones};
pub use output::{OutputContext, write_bands, write_diagnostics};
pub use points::{PointInput, read_point_records, write_point_records};
