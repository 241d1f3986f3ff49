pub mod locale;

pub use locale::{Locale, LocaleStrings};

use clap::ValueEnum;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

use crate::bands::DEFAULT_AREA_TOLERANCE;
use crate::geometry::DEFAULT_SEGMENTS;

/// Where coverage shapes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CoverageMode {
    /// Disks of radius `threshold` meters around each point
    #[default]
    Buffer,
    /// Travel-time isochrones of `threshold` seconds
    Isochrone,
}

impl CoverageMode {
    pub fn name(self) -> &'static str {
        match self {
            CoverageMode::Buffer => "buffer",
            CoverageMode::Isochrone => "isochrone",
        }
    }

    /// Thresholds used when none are configured
    pub fn default_thresholds(self) -> Vec<f64> {
        match self {
            CoverageMode::Buffer => vec![10_000.0, 15_000.0, 20_000.0],
            CoverageMode::Isochrone => vec![600.0, 900.0, 1200.0, 1500.0, 1800.0, 2700.0],
        }
    }
}

fn default_segments() -> usize {
    DEFAULT_SEGMENTS
}
fn default_area_tolerance() -> f64 {
    DEFAULT_AREA_TOLERANCE
}

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub mode: Option<CoverageMode>,
    #[serde(default)]
    pub thresholds: Option<Vec<f64>>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub points: Option<PathBuf>,
    #[serde(default)]
    pub boundary: Option<PathBuf>,
    #[serde(default)]
    pub isochrones: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default = "default_segments")]
    pub segments: usize,
    #[serde(default)]
    pub locale: Option<Locale>,
    #[serde(default = "default_area_tolerance")]
    pub area_tolerance: f64,
    #[serde(default)]
    pub boundary_source: Option<BoundarySourceConfig>,
    #[serde(default)]
    pub geocoder: Option<GeocoderConfig>,
    #[serde(default)]
    pub routing: Option<RoutingConfig>,
}

fn default_area_type_field() -> String {
    "area_type".to_string()
}

fn default_water_values() -> Vec<String> {
    vec!["water".to_string(), "Water body".to_string()]
}

/// How to read the land/water split out of the boundary file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BoundarySourceConfig {
    /// Feature property holding the area type
    #[serde(default = "default_area_type_field")]
    pub area_type_field: String,
    /// Property values that mark water; everything else is land
    #[serde(default = "default_water_values")]
    pub water_values: Vec<String>,
    /// CRS identifier used when the file does not declare one
    #[serde(default)]
    pub crs: Option<String>,
}

impl Default for BoundarySourceConfig {
    fn default() -> Self {
        Self {
            area_type_field: default_area_type_field(),
            water_values: default_water_values(),
            crs: None,
        }
    }
}

fn default_geocoder_url() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

fn default_geocoder_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_geocoder_min_delay_ms() -> u64 {
    2000
}

fn default_error_wait_secs() -> u64 {
    10
}

fn default_country() -> String {
    "Netherlands".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GeocoderConfig {
    #[serde(default = "default_geocoder_url")]
    pub url: String,
    #[serde(default = "default_geocoder_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Minimum time between two requests
    #[serde(default = "default_geocoder_min_delay_ms")]
    pub min_delay_ms: u64,
    /// Wait before retrying a failed request
    #[serde(default = "default_error_wait_secs")]
    pub error_wait_secs: u64,
    /// Country appended to addresses that do not name one
    #[serde(default = "default_country")]
    pub country: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: default_geocoder_url(),
            timeout_secs: default_geocoder_timeout_secs(),
            max_retries: default_max_retries(),
            min_delay_ms: default_geocoder_min_delay_ms(),
            error_wait_secs: default_error_wait_secs(),
            country: default_country(),
        }
    }
}

fn default_routing_url() -> String {
    "https://api.openrouteservice.org".to_string()
}

fn default_profile() -> String {
    "driving-car".to_string()
}

fn default_range_type() -> String {
    "time".to_string()
}

fn default_smoothing() -> f64 {
    10.0
}

fn default_routing_timeout_secs() -> u64 {
    60
}

fn default_routing_min_delay_ms() -> u64 {
    3000
}

fn default_api_key_env() -> String {
    "OPENROUTE_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RoutingConfig {
    #[serde(default = "default_routing_url")]
    pub url: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    /// `time` or `distance`
    #[serde(default = "default_range_type")]
    pub range_type: String,
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
    #[serde(default = "default_routing_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_routing_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_error_wait_secs")]
    pub error_wait_secs: u64,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            url: default_routing_url(),
            profile: default_profile(),
            range_type: default_range_type(),
            smoothing: default_smoothing(),
            timeout_secs: default_routing_timeout_secs(),
            max_retries: default_max_retries(),
            min_delay_ms: default_routing_min_delay_ms(),
            error_wait_secs: default_error_wait_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl FileConfig {
    pub fn load() -> Option<Self> {
        let config_paths = get_config_paths();

        for path in config_paths {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => return Some(config),
                    Err(e) => {
                        warn!("Failed to parse config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("reachbands.toml"));
    paths.push(PathBuf::from(".reachbands.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("reachbands").join("config.toml"));
        paths.push(config_dir.join("reachbands.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".reachbands.toml"));
        paths.push(home.join(".config").join("reachbands").join("config.toml"));
    }

    paths
}
