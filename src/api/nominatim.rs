use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use super::{RateLimiter, USER_AGENT};
use crate::config::GeocoderConfig;
use crate::domain::PointRecord;

/// One row of the address table fed to `geocode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: String,
    pub category: String,
    pub street: String,
    #[serde(default)]
    pub postalcode: Option<String>,
    pub city: String,
    #[serde(default)]
    pub country: Option<String>,
}

impl AddressRecord {
    /// Free-form query, e.g. "Heidelberglaan 8, 3584 CS Utrecht, Netherlands"
    pub fn query(&self, default_country: &str) -> String {
        let mut parts = vec![self.street.trim().to_string()];
        let locality = match &self.postalcode {
            Some(code) if !code.trim().is_empty() => format!("{} {}", code.trim(), self.city.trim()),
            _ => self.city.trim().to_string(),
        };
        parts.push(locality);
        let country = self
            .country
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(default_country);
        parts.push(country.trim().to_string());
        parts.retain(|p| !p.is_empty());
        parts.join(", ")
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    #[allow(dead_code)]
    display_name: String,
}

fn parse_response(body: &str) -> Result<Option<(f64, f64)>> {
    let results: Vec<NominatimResult> =
        serde_json::from_str(body).context("Failed to parse Nominatim JSON response")?;

    let Some(result) = results.into_iter().next() else {
        return Ok(None);
    };
    let lat: f64 = result
        .lat
        .parse()
        .context("Failed to parse latitude from Nominatim response")?;
    let lon: f64 = result
        .lon
        .parse()
        .context("Failed to parse longitude from Nominatim response")?;
    Ok(Some((lat, lon)))
}

/// Rate-limited, retrying Nominatim client.
pub struct Geocoder {
    client: reqwest::blocking::Client,
    config: GeocoderConfig,
    limiter: RateLimiter,
}

impl Geocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        let limiter = RateLimiter::new(Duration::from_millis(config.min_delay_ms));
        Ok(Self {
            client,
            config,
            limiter,
        })
    }

    pub fn country(&self) -> &str {
        &self.config.country
    }

    /// Geocode a free-form query to (lat, lon). `Ok(None)` means the service
    /// answered but found nothing.
    pub fn geocode(&mut self, query: &str) -> Result<Option<(f64, f64)>> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                warn!(
                    query = %query,
                    attempt,
                    wait_secs = self.config.error_wait_secs,
                    "geocoding failed, retrying"
                );
                thread::sleep(Duration::from_secs(self.config.error_wait_secs));
            }
            self.limiter.wait();

            match self.request(query) {
                Ok(result) => return Ok(result),
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) => Err(e.context(format!(
                "Geocoding failed after {} retries",
                self.config.max_retries
            ))),
            None => bail!("Geocoding failed: {}", query),
        }
    }

    fn request(&self, query: &str) -> Result<Option<(f64, f64)>> {
        let response = self
            .client
            .get(&self.config.url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .context("Failed to send request to Nominatim API")?;

        if !response.status().is_success() {
            bail!("Nominatim API returned error status: {}", response.status());
        }

        let body = response.text().context("Failed to read Nominatim response")?;
        parse_response(&body)
    }
}

/// Resolve every address with `lookup`. Addresses that fail or are not
/// found keep null coordinates so the point table still lists them.
pub fn resolve_addresses<F>(
    addresses: &[AddressRecord],
    default_country: &str,
    mut lookup: F,
) -> Vec<PointRecord>
where
    F: FnMut(&str) -> Result<Option<(f64, f64)>>,
{
    addresses
        .iter()
        .map(|address| {
            let query = address.query(default_country);
            let coords = match lookup(&query) {
                Ok(Some(coords)) => {
                    debug!(id = %address.id, query = %query, "geocoded");
                    Some(coords)
                }
                Ok(None) => {
                    warn!(id = %address.id, query = %query, "address not found");
                    None
                }
                Err(e) => {
                    warn!(id = %address.id, query = %query, error = %e, "geocoding failed");
                    None
                }
            };
            PointRecord {
                id: address.id.clone(),
                category: address.category.clone(),
                latitude: coords.map(|(lat, _)| lat),
                longitude: coords.map(|(_, lon)| lon),
            }
        })
        .collect()
}
