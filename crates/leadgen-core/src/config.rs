use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::AppError;

pub const DEFAULT_SERP_API_BASE_URL: &str = "https://serpapi.com/search.json";
pub const DEFAULT_ALLOWED_IPS: &[&str] = &["10.30.113.203", "127.0.0.1", "::1"];

// Upper bounds keep every derived `Instant` arithmetic in range.
const MAX_SYNC_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
const MAX_FETCH_TIMEOUT_SECS: u64 = 60 * 60;
const MAX_WATCH_POLL_MILLIS: u64 = 60 * 60 * 1000;
const MAX_FETCH_CONCURRENCY: u64 = 1000;

/// Process-wide configuration, read once at startup and passed to components.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Search provider API key. `None` disables `/search`.
    pub serp_api_key: Option<String>,
    pub serp_api_base_url: Url,
    /// Sheet-sync POST target. `None` disables the sync loop.
    pub google_script_url: Option<Url>,
    pub data_dir: PathBuf,
    pub processed_file: PathBuf,
    pub allowed_ips: Vec<IpAddr>,
    pub sync_interval: Duration,
    pub fetch_concurrency: usize,
    pub fetch_timeout: Duration,
    pub watch_data_dir: bool,
    pub watch_poll_interval: Duration,
    pub port: u16,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            serp_api_key: None,
            serp_api_base_url: Url::parse(DEFAULT_SERP_API_BASE_URL)
                .expect("default provider URL is valid"),
            google_script_url: None,
            data_dir: PathBuf::from("./data"),
            processed_file: PathBuf::from("./processed.json"),
            allowed_ips: DEFAULT_ALLOWED_IPS
                .iter()
                .filter_map(|ip| ip.parse().ok())
                .collect(),
            sync_interval: Duration::from_secs(300),
            fetch_concurrency: 10,
            fetch_timeout: Duration::from_secs(30),
            watch_data_dir: true,
            watch_poll_interval: Duration::from_millis(2000),
            port: 3000,
        }
    }
}

impl ScraperConfig {
    /// Read configuration from environment variables.
    ///
    /// - `SERP_API`, `GOOGLE_SCRIPT_URL` (optional; the features they power are off without them)
    /// - `SERP_API_BASE_URL`, `DATA_DIR`, `PROCESSED_FILE`, `ALLOWED_IPS`, `PORT`
    /// - `SYNC_INTERVAL_SECS`, `FETCH_CONCURRENCY`, `FETCH_TIMEOUT_SECS`
    /// - `WATCH_DATA_DIR`, `WATCH_POLL_MILLIS`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let serp_api_base_url = match get("SERP_API_BASE_URL") {
            Some(raw) => parse_url("SERP_API_BASE_URL", &raw)?,
            None => defaults.serp_api_base_url,
        };

        let google_script_url = get("GOOGLE_SCRIPT_URL")
            .map(|raw| parse_url("GOOGLE_SCRIPT_URL", &raw))
            .transpose()?;

        let allowed_ips = match get("ALLOWED_IPS") {
            Some(raw) => parse_ip_list(&raw)?,
            None => defaults.allowed_ips,
        };

        let sync_interval = match get("SYNC_INTERVAL_SECS") {
            Some(raw) => Duration::from_secs(parse_positive("SYNC_INTERVAL_SECS", &raw, MAX_SYNC_INTERVAL_SECS)?),
            None => defaults.sync_interval,
        };

        let fetch_concurrency = match get("FETCH_CONCURRENCY") {
            Some(raw) => parse_positive("FETCH_CONCURRENCY", &raw, MAX_FETCH_CONCURRENCY)? as usize,
            None => defaults.fetch_concurrency,
        };

        let fetch_timeout = match get("FETCH_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_positive("FETCH_TIMEOUT_SECS", &raw, MAX_FETCH_TIMEOUT_SECS)?),
            None => defaults.fetch_timeout,
        };

        let watch_data_dir = match get("WATCH_DATA_DIR") {
            Some(raw) => parse_bool("WATCH_DATA_DIR", &raw)?,
            None => defaults.watch_data_dir,
        };

        let watch_poll_interval = match get("WATCH_POLL_MILLIS") {
            Some(raw) => Duration::from_millis(parse_positive("WATCH_POLL_MILLIS", &raw, MAX_WATCH_POLL_MILLIS)?),
            None => defaults.watch_poll_interval,
        };

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!("Invalid PORT '{raw}': must be a port number"))
            })?,
            None => defaults.port,
        };

        Ok(Self {
            serp_api_key: get("SERP_API"),
            serp_api_base_url,
            google_script_url,
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            processed_file: get("PROCESSED_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.processed_file),
            allowed_ips,
            sync_interval,
            fetch_concurrency,
            fetch_timeout,
            watch_data_dir,
            watch_poll_interval,
            port,
        })
    }

    /// Whether `ip` may call protected routes. IPv4-mapped IPv6 addresses
    /// are compared as plain IPv4.
    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        self.allowed_ips.iter().any(|allowed| allowed.to_canonical() == ip)
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, AppError> {
    Url::parse(raw.trim())
        .map_err(|e| AppError::ConfigError(format!("Invalid {key} '{raw}': {e}")))
}

fn parse_positive(key: &str, raw: &str, max: u64) -> Result<u64, AppError> {
    let parsed: u64 = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {key} '{raw}': must be a positive integer"))
    })?;
    if !(1..=max).contains(&parsed) {
        return Err(AppError::ConfigError(format!(
            "{key} must be between 1 and {max}, got {parsed}"
        )));
    }
    Ok(parsed)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::ConfigError(format!(
            "Invalid {key} '{raw}': expected true or false"
        ))),
    }
}

fn parse_ip_list(raw: &str) -> Result<Vec<IpAddr>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpAddr>()
                .map_err(|_| AppError::ConfigError(format!("Invalid address in ALLOWED_IPS: {s}")))
        })
        .collect()
}
