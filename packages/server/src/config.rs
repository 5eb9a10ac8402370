use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
    pub detail_concurrency: usize,
    pub request_delay_ms: u64,
    pub api_ttl_minutes: u32,
    pub listing_ttl_hours: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            data_dir: PathBuf::from("data"),
            http_timeout_secs: 30,
            http_max_retries: 2,
            detail_concurrency: 4,
            request_delay_ms: 0,
            api_ttl_minutes: 60,
            listing_ttl_hours: 24,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = Self::default();
        Ok(Self {
            port: parse_var("PORT", defaults.port)?,
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            http_max_retries: parse_var("HTTP_MAX_RETRIES", defaults.http_max_retries)?,
            detail_concurrency: parse_var("DETAIL_CONCURRENCY", defaults.detail_concurrency)?,
            request_delay_ms: parse_var("REQUEST_DELAY_MS", defaults.request_delay_ms)?,
            api_ttl_minutes: parse_var("API_TTL_MINUTES", defaults.api_ttl_minutes)?,
            listing_ttl_hours: parse_var("LISTING_TTL_HOURS", defaults.listing_ttl_hours)?,
        })
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs)
    }

    pub fn request_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_delay_ms)
    }

    pub fn api_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.api_ttl_minutes))
    }

    pub fn listing_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.listing_ttl_hours))
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a non-negative integer", name)),
        Err(_) => Ok(default),
    }
}
