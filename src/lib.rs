//! reachbands - Partition land into nested distance or travel-time bands
//! around categorized points

pub mod api;
pub mod bands;
pub mod config;
pub mod coverage;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod io;
