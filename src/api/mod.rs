pub mod nominatim;
pub mod openrouteservice;

pub use nominatim::{AddressRecord, Geocoder, resolve_addresses};
pub use openrouteservice::{IsochroneJob, OpenRouteService, QueueOutcome, jobs_for, run_queue};

use std::thread;
use std::time::{Duration, Instant};

const USER_AGENT: &str = "reachbands/0.1.0";

/// Keeps consecutive requests at least `min_delay` apart.
#[derive(Debug)]
pub struct RateLimiter {
    min_delay: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last: None,
        }
    }

    /// Block until the next request may go out, then mark it sent.
    pub fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                thread::sleep(self.min_delay - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }
}
