//! Process configuration assembled from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::util::env::{env_flag, env_opt, env_parse, env_parse_opt, init_env, log_env_snapshot};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://countries.db?mode=rwc";
pub const DEFAULT_COUNTRIES_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
pub const DEFAULT_EXCHANGE_RATE_URL: &str = "https://open.er-api.com/v6/latest/USD";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Upstream endpoints and their shared request bound.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub countries_url: String,
    pub exchange_rate_url: String,
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            countries_url: DEFAULT_COUNTRIES_URL.to_string(),
            exchange_rate_url: DEFAULT_EXCHANGE_RATE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub sources: SourceConfig,
    pub cache_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
    pub environment: String,
    pub request_log_db: bool,
    pub sync_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        init_env();

        let port = match env_opt("API_PORT").or_else(|| env_opt("PORT")) {
            Some(raw) => raw.trim().parse().context("Invalid API_PORT")?,
            None => 3000,
        };

        let timeout_secs: u64 = env_parse("FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS);

        Ok(Self {
            database_url: env_opt("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            db_max_connections: env_parse("DB_MAX_CONNS", 10u32).max(1),
            sources: SourceConfig {
                countries_url: env_opt("COUNTRIES_API_URL")
                    .unwrap_or_else(|| DEFAULT_COUNTRIES_URL.into()),
                exchange_rate_url: env_opt("EXCHANGE_RATE_API_URL")
                    .unwrap_or_else(|| DEFAULT_EXCHANGE_RATE_URL.into()),
                timeout: Duration::from_secs(timeout_secs.max(1)),
            },
            cache_dir: env_opt("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./cache")),
            host: env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            allowed_origins: env_opt("ALLOWED_ORIGINS").unwrap_or_else(|| "*".into()),
            environment: env_opt("APP_ENV").unwrap_or_else(|| "production".into()),
            request_log_db: env_flag("REQUEST_LOG_DB", true),
            sync_interval_secs: env_parse_opt("SYNC_INTERVAL_SECS").unwrap_or(0),
        })
    }

    /// Development mode exposes internal error details in HTTP responses.
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Log a redacted snapshot of the settings this process runs with.
    pub fn log_snapshot(&self, title: &str) {
        log_env_snapshot(
            title,
            &[
                "DATABASE_URL",
                "COUNTRIES_API_URL",
                "EXCHANGE_RATE_API_URL",
                "FETCH_TIMEOUT_SECS",
                "CACHE_DIR",
                "API_HOST",
                "API_PORT",
                "APP_ENV",
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sources_point_at_public_apis() {
        let cfg = SourceConfig::default();
        assert!(cfg.countries_url.starts_with("https://restcountries.com/"));
        assert!(cfg.exchange_rate_url.ends_with("/latest/USD"));
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }

    #[test]
    fn development_mode_is_case_insensitive() {
        let mut cfg = AppConfig::from_env().expect("config");
        cfg.environment = "Development".into();
        assert!(cfg.is_development());
        cfg.environment = "production".into();
        assert!(!cfg.is_development());
    }
}
