//! City -> country resolution through a forward geocoder

use std::collections::{BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::Duration;

use reqwest::header::ACCEPT_LANGUAGE;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::GeocodeConfig;
use crate::countries::CountryNormalizer;
use crate::types::UNKNOWN_COUNTRY;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder timed out: {0}")]
    Timeout(String),
    #[error("geocoder service error: {0}")]
    Service(String),
}

impl From<reqwest::Error> for GeocodeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GeocodeError::Timeout(e.to_string())
        } else {
            GeocodeError::Service(e.to_string())
        }
    }
}

/// Forward geocoding: free text to a formatted address
pub trait Geocoder: Send + Sync {
    fn geocode(&self, query: &str) -> Result<Option<String>, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct Place {
    display_name: String,
}

/// OpenStreetMap Nominatim search API
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodeConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, query: &str) -> Result<Option<String>, GeocodeError> {
        let places: Vec<Place> = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .header(ACCEPT_LANGUAGE, "en")
            .send()?
            .error_for_status()?
            .json()?;
        Ok(places.into_iter().next().map(|p| p.display_name))
    }
}

/// Country part of a formatted address: the text after the last comma
pub fn country_from_address(address: &str) -> &str {
    address.rsplit(',').next().unwrap_or(address).trim()
}

/// What one worker found for one city
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Found(String),
    Unknown,
}

fn lookup_city(geocoder: &dyn Geocoder, city: &str, interval: Duration) -> Outcome {
    if city.trim().is_empty() {
        return Outcome::Unknown;
    }

    // Fixed per-task pause for the upstream rate limit
    thread::sleep(interval);

    let result = panic::catch_unwind(AssertUnwindSafe(|| geocoder.geocode(city)));
    match result {
        Ok(Ok(Some(address))) => {
            let country = country_from_address(&address);
            if country.is_empty() {
                warn!("Could not identify country for city: {}", city);
                Outcome::Unknown
            } else {
                Outcome::Found(country.to_string())
            }
        }
        Ok(Ok(None)) => {
            warn!("Could not identify country for city: {}", city);
            Outcome::Unknown
        }
        Ok(Err(e)) => {
            error!("Geocoding error for city '{}': {}", city, e);
            Outcome::Unknown
        }
        Err(_) => {
            error!("Error geocoding city '{}': lookup panicked", city);
            Outcome::Unknown
        }
    }
}

/// Resolves cities to countries with a fixed pool of workers.
///
/// Answers are cached for the life of the resolver, so each distinct city is
/// looked up at most once per run.
pub struct GeocodeResolver<'g> {
    geocoder: &'g dyn Geocoder,
    pool_size: usize,
    interval: Duration,
    cache: HashMap<String, String>,
    normalizer: CountryNormalizer,
}

impl<'g> GeocodeResolver<'g> {
    pub fn new(geocoder: &'g dyn Geocoder, pool_size: usize, interval: Duration) -> Self {
        Self {
            geocoder,
            pool_size: pool_size.max(1),
            interval,
            cache: HashMap::new(),
            normalizer: CountryNormalizer::new(),
        }
    }

    pub fn from_config(geocoder: &'g dyn Geocoder, config: &GeocodeConfig) -> Self {
        Self::new(geocoder, config.pool_size, config.interval())
    }

    /// Normalizer shared with record enrichment
    pub fn normalizer(&mut self) -> &mut CountryNormalizer {
        &mut self.normalizer
    }

    /// Country for every city in `cities`; failures map to "Unknown"
    pub fn resolve(&mut self, cities: &BTreeSet<String>) -> HashMap<String, String> {
        let pending: Vec<&str> = cities
            .iter()
            .filter(|c| !self.cache.contains_key(c.as_str()))
            .map(String::as_str)
            .collect();

        if !pending.is_empty() {
            info!(
                "Geocoding {} cities with {} workers",
                pending.len(),
                self.pool_size.min(pending.len())
            );
            for (city, outcome) in self.run_pool(&pending) {
                let country = match outcome {
                    Outcome::Found(raw) => {
                        let country = self.normalizer.normalize(&raw);
                        info!("Identified country for city '{}': {}", city, country);
                        country
                    }
                    Outcome::Unknown => UNKNOWN_COUNTRY.to_string(),
                };
                self.cache.insert(city, country);
            }
        }

        cities
            .iter()
            .map(|city| {
                let country = self
                    .cache
                    .entry(city.clone())
                    .or_insert_with(|| UNKNOWN_COUNTRY.to_string());
                (city.clone(), country.clone())
            })
            .collect()
    }

    /// Workers pull cities off a shared queue; each keeps its own answers
    /// until they are handed back over the channel.
    fn run_pool(&self, pending: &[&str]) -> Vec<(String, Outcome)> {
        let geocoder = self.geocoder;
        let interval = self.interval;
        let workers = self.pool_size.min(pending.len());
        let queue = Mutex::new(pending.iter());
        let (tx, rx) = mpsc::channel();

        thread::scope(|scope| {
            let queue = &queue;
            for _ in 0..workers {
                let tx = tx.clone();
                scope.spawn(move || loop {
                    let next = match queue.lock() {
                        Ok(mut q) => q.next().copied(),
                        Err(_) => None,
                    };
                    let Some(city) = next else { break };
                    let outcome = lookup_city(geocoder, city, interval);
                    if tx.send((city.to_string(), outcome)).is_err() {
                        break;
                    }
                });
            }
        });
        drop(tx);

        rx.into_iter().collect()
    }
}
