use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::collections::VecDeque;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{RateLimiter, USER_AGENT};
use crate::config::RoutingConfig;
use crate::coverage::IsochroneRecord;
use crate::domain::{Category, PointTable};
use crate::error::InputDataError;
use crate::geometry::Crs;
use crate::io::features;

/// Isochrones to fetch for one point.
#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneJob {
    pub point_id: String,
    pub category: Category,
    /// (lon, lat)
    pub location: (f64, f64),
}

/// One job per located point, in table order.
pub fn jobs_for(points: &PointTable) -> Result<VecDeque<IsochroneJob>, InputDataError> {
    if !points.crs().is_geographic() {
        return Err(InputDataError::CrsMismatch {
            input: "point table",
            found: points.crs().clone(),
            target: Crs::Geographic,
        });
    }
    Ok(points
        .sites()
        .iter()
        .map(|site| IsochroneJob {
            point_id: site.id.clone(),
            category: site.category.clone(),
            location: (site.position.x(), site.position.y()),
        })
        .collect())
}

#[derive(Debug, Serialize)]
struct IsochroneRequest<'a> {
    locations: Vec<[f64; 2]>,
    range: &'a [f64],
    range_type: &'a str,
    smoothing: f64,
}

/// Turn a service response into isochrone rows. Each feature carries the
/// range it was computed for in `properties.value`.
pub fn parse_response(body: &str, job: &IsochroneJob) -> Result<Vec<IsochroneRecord>> {
    let collection =
        features::parse_collection(body).context("Failed to parse isochrone response")?;

    collection
        .features
        .iter()
        .map(|feature| {
            let threshold = features::property_f64(feature, "value")
                .context("isochrone feature has no value")?;
            let geometry = feature
                .geometry
                .as_ref()
                .context("isochrone feature has no geometry")?;
            let geometry = features::to_multipolygon(geometry)?;
            Ok(IsochroneRecord {
                point_id: job.point_id.clone(),
                category: job.category.clone(),
                threshold,
                geometry,
            })
        })
        .collect()
}

/// Blocking OpenRouteService isochrone client.
pub struct OpenRouteService {
    client: reqwest::blocking::Client,
    config: RoutingConfig,
    api_key: String,
}

impl OpenRouteService {
    /// Build a client, reading the API key from `config.api_key_env`.
    pub fn from_env(config: RoutingConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("{} is not set", config.api_key_env))?;
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.config.min_delay_ms)
    }

    /// Fetch every range for one job, retrying 429 and 5xx responses with a
    /// linearly growing wait.
    pub fn fetch(&self, job: &IsochroneJob, ranges: &[f64]) -> Result<Vec<IsochroneRecord>> {
        let url = format!(
            "{}/v2/isochrones/{}",
            self.config.url.trim_end_matches('/'),
            self.config.profile
        );
        let body = IsochroneRequest {
            locations: vec![[job.location.0, job.location.1]],
            range: ranges,
            range_type: &self.config.range_type,
            smoothing: self.config.smoothing,
        };

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let wait_secs = self.config.error_wait_secs * attempt as u64;
                warn!(
                    point = %job.point_id,
                    attempt,
                    wait_secs,
                    "isochrone request failed, retrying"
                );
                thread::sleep(Duration::from_secs(wait_secs));
            }

            let response = match self
                .client
                .post(&url)
                .header("Authorization", &self.api_key)
                .json(&body)
                .send()
            {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(format!("request failed: {}", e));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let text = response
                    .text()
                    .context("Failed to read isochrone response")?;
                return parse_response(&text, job);
            }
            if status.as_u16() == 429 || status.is_server_error() {
                last_error = Some(format!("status {}", status));
                continue;
            }
            bail!("OpenRouteService returned error status: {}", status);
        }

        bail!(
            "OpenRouteService failed after {} retries: {}",
            self.config.max_retries,
            last_error.unwrap_or_else(|| "Unknown error".to_string())
        )
    }
}

/// Result of draining a job queue.
#[derive(Debug, Default)]
pub struct QueueOutcome {
    pub records: Vec<IsochroneRecord>,
    /// (point id, reason) of jobs that failed for good
    pub failed: Vec<(String, String)>,
}

/// Process jobs front to back, at most one every `min_delay`. A failing job
/// is reported and skipped; the rest of the queue still runs.
pub fn run_queue<F>(mut jobs: VecDeque<IsochroneJob>, min_delay: Duration, mut fetch: F) -> QueueOutcome
where
    F: FnMut(&IsochroneJob) -> Result<Vec<IsochroneRecord>>,
{
    let mut limiter = RateLimiter::new(min_delay);
    let mut outcome = QueueOutcome::default();
    let total = jobs.len();

    while let Some(job) = jobs.pop_front() {
        limiter.wait();
        match fetch(&job) {
            Ok(records) => {
                debug!(point = %job.point_id, shapes = records.len(), remaining = jobs.len(), "fetched isochrones");
                outcome.records.extend(records);
            }
            Err(e) => {
                warn!(point = %job.point_id, error = %e, "skipping point");
                outcome.failed.push((job.point_id, format!("{:#}", e)));
            }
        }
    }

    info!(
        jobs = total,
        failed = outcome.failed.len(),
        shapes = outcome.records.len(),
        "isochrone queue drained"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PointRecord, Site};
    use geo::Point;

    fn job(id: &str) -> IsochroneJob {
        IsochroneJob {
            point_id: id.to_string(),
            category: Category::new("hbo").unwrap(),
            location: (5.12, 52.09),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = IsochroneRequest {
            locations: vec![[5.12, 52.09]],
            range: &[600.0, 900.0],
            range_type: "time",
            smoothing: 10.0,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["locations"][0][0], 5.12);
        assert_eq!(json["range"].as_array().unwrap().len(), 2);
        assert_eq!(json["range_type"], "time");
    }

    #[test]
    fn test_parse_response_values() {
        let body = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"group_index": 0, "value": 600.0},
             "geometry": {"type": "Polygon", "coordinates": [[[5.0,52.0],[5.1,52.0],[5.1,52.1],[5.0,52.0]]]}},
            {"type": "Feature", "properties": {"group_index": 0, "value": 900.0},
             "geometry": {"type": "Polygon", "coordinates": [[[5.0,52.0],[5.2,52.0],[5.2,52.2],[5.0,52.0]]]}}
        ]}"#;
        let records = parse_response(body, &job("7")).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].threshold, 900.0);
        assert_eq!(records[0].point_id, "7");
    }

    #[test]
    fn test_parse_response_with_service_members() {
        let body = r#"{"type": "FeatureCollection",
            "bbox": [5.0, 52.0, 5.1, 52.1],
            "metadata": {"service": "isochrones"},
            "features": [
                {"type": "Feature", "properties": {"group_index": 0, "value": 300.0},
                 "geometry": {"type": "Polygon", "coordinates": [[[5.0,52.0],[5.1,52.0],[5.1,52.1],[5.0,52.0]]]}},
                {"type": "Feature", "properties": {"group_index": 0},
                 "geometry": {"type": "Polygon", "coordinates": [[[5.0,52.0],[5.1,52.0],[5.1,52.1],[5.0,52.0]]]}}
            ]}"#;
        assert!(parse_response(body, &job("7")).is_err());

        let valid = body.replace(r#"{"group_index": 0}"#, r#"{"group_index": 0, "value": "600"}"#);
        let records = parse_response(&valid, &job("7")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].threshold, 600.0);
    }

    #[test]
    fn test_queue_skips_failing_jobs() {
        let jobs: VecDeque<IsochroneJob> = ["a", "b", "c"].into_iter().map(job).collect();
        let mut seen = Vec::new();

        let outcome = run_queue(jobs, Duration::ZERO, |job| {
            seen.push(job.point_id.clone());
            if job.point_id == "b" {
                bail!("status 500");
            }
            Ok(vec![IsochroneRecord {
                point_id: job.point_id.clone(),
                category: job.category.clone(),
                threshold: 600.0,
                geometry: geo::MultiPolygon::new(vec![]),
            }])
        });

        assert_eq!(seen, vec!["a", "b", "c"]);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "b");
    }

    #[test]
    fn test_jobs_require_geographic_points() {
        let (points, _) = PointTable::from_records(
            vec![PointRecord {
                id: "1".into(),
                category: "wo".into(),
                latitude: Some(52.0),
                longitude: Some(5.0),
            }],
            Crs::Geographic,
        )
        .unwrap();
        let jobs = jobs_for(&points).unwrap();
        assert_eq!(jobs[0].location, (5.0, 52.0));

        let planar = PointTable::new(
            vec![Site::new("1", Category::new("wo").unwrap(), Point::new(0.0, 0.0))],
            Crs::Planar("EPSG:28992".into()),
        );
        assert!(jobs_for(&planar).is_err());
    }
}
