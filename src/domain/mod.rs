pub mod band;
pub mod boundary;
pub mod category;
pub mod diagnostic;
pub mod point;
pub mod threshold;

pub use band::{Band, BandIndex};
pub use boundary::{AreaType, Boundary, BoundaryFeature};
pub use category::Category;
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use point::{PointRecord, PointTable, Site};
pub use threshold::Thresholds;
