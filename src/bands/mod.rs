pub mod decomposer;
pub mod driver;

pub use decomposer::{Decomposition, decompose};
pub use driver::{CategoryBands, DEFAULT_AREA_TOLERANCE, RunReport, RunRequest, run};
