//! Run configuration: built-in defaults, optionally overridden by a JSON file

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const LISTING_URL: &str = "https://careers.un.org/jobopening?language=en&data=%257B%2522jle%2522:%255B%255D,%2522jc%2522:%255B%2522INT%2522%255D%257D";
pub const SITE_BASE_URL: &str = "https://careers.un.org";
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/112.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listing page the harvest starts from
    pub listing_url: String,
    /// Prefix for relative description links
    pub site_base_url: String,
    pub output_path: PathBuf,
    /// Workbook (or CSV) with a "Job ID" column of postings to skip
    pub applied_path: PathBuf,
    pub logs_dir: PathBuf,
    pub records_per_page: u32,
    /// Hard stop for pagination, in case the next control never disables
    pub max_pages: usize,
    pub timeouts: Timeouts,
    pub geocode: GeocodeConfig,
    pub browser: BrowserConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listing_url: LISTING_URL.to_string(),
            site_base_url: SITE_BASE_URL.to_string(),
            output_path: PathBuf::from("UN_Internships.xlsx"),
            applied_path: PathBuf::from("applied_intern.xlsx"),
            logs_dir: PathBuf::from("logs"),
            records_per_page: 50,
            max_pages: 500,
            timeouts: Timeouts::default(),
            geocode: GeocodeConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

/// Bounded waits, in seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    pub load_secs: f64,
    pub consent_secs: f64,
    pub page_size_secs: f64,
    pub next_secs: f64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            load_secs: 15.0,
            consent_secs: 10.0,
            page_size_secs: 15.0,
            next_secs: 10.0,
        }
    }
}

impl Timeouts {
    pub fn load(&self) -> Duration {
        secs(self.load_secs)
    }

    pub fn consent(&self) -> Duration {
        secs(self.consent_secs)
    }

    pub fn page_size(&self) -> Duration {
        secs(self.page_size_secs)
    }

    pub fn next(&self) -> Duration {
        secs(self.next_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeocodeConfig {
    pub endpoint: String,
    pub user_agent: String,
    /// Concurrent lookups
    pub pool_size: usize,
    /// Sleep before each lookup, per worker
    pub interval_secs: f64,
    pub timeout_secs: f64,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            endpoint: NOMINATIM_URL.to_string(),
            user_agent: "un_internships_scraper".to_string(),
            pool_size: 5,
            interval_secs: 1.0,
            timeout_secs: 10.0,
        }
    }
}

impl GeocodeConfig {
    pub fn interval(&self) -> Duration {
        secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserConfig {
    pub headless: bool,
    pub user_agent: String,
    /// Chrome executable; detected on the system when unset
    pub binary: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            user_agent: BROWSER_USER_AGENT.to_string(),
            binary: None,
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

impl Config {
    /// Defaults, or the given JSON file layered over them
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Path of the run log inside the logs directory
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir.join("scraping.log")
    }
}
