//! Upstream HTTP sources: the countries catalogue and the exchange-rate table.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::SourceConfig;
use crate::database_ops::exchange::parse_rate_table;
use crate::models::{ExchangeRateTable, RawCountry};

pub const COUNTRIES_SOURCE: &str = "Countries API";
pub const EXCHANGE_RATE_SOURCE: &str = "Exchange Rate API";

/// Pre-persistence failures; any of these aborts a refresh before writing.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{source_name} request timed out")]
    Timeout { source_name: &'static str },
    #[error("could not fetch data from {source_name}: {message}")]
    Unavailable {
        source_name: &'static str,
        message: String,
    },
    #[error("invalid {source_name} response: {message}")]
    MalformedResponse {
        source_name: &'static str,
        message: String,
    },
}

impl SourceError {
    pub fn source_name(&self) -> &'static str {
        match self {
            Self::Timeout { source_name }
            | Self::Unavailable { source_name, .. }
            | Self::MalformedResponse { source_name, .. } => source_name,
        }
    }

    fn from_reqwest(source_name: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { source_name }
        } else {
            Self::Unavailable {
                source_name,
                message: err.to_string(),
            }
        }
    }
}

/// The two independent inputs of a refresh batch.
#[async_trait]
pub trait DataSources: Send + Sync {
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>, SourceError>;
    async fn fetch_exchange_rates(&self) -> Result<ExchangeRateTable, SourceError>;
}

#[derive(Clone)]
pub struct HttpSources {
    http: Client,
    countries_url: String,
    exchange_rate_url: String,
}

impl HttpSources {
    pub fn new(cfg: &SourceConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            countries_url: cfg.countries_url.clone(),
            exchange_rate_url: cfg.exchange_rate_url.clone(),
        })
    }

    async fn get_json(&self, source_name: &'static str, url: &str) -> Result<Value, SourceError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(source_name, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable {
                source_name,
                message: format!("http {status}"),
            });
        }
        // An undecodable body counts as an unavailable source.
        resp.json::<Value>()
            .await
            .map_err(|e| SourceError::from_reqwest(source_name, e))
    }
}

#[async_trait]
impl DataSources for HttpSources {
    #[instrument(skip(self))]
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>, SourceError> {
        let v = self.get_json(COUNTRIES_SOURCE, &self.countries_url).await?;
        let items = v.as_array().ok_or_else(|| SourceError::Unavailable {
            source_name: COUNTRIES_SOURCE,
            message: "expected a JSON array of countries".into(),
        })?;
        let countries: Vec<RawCountry> = items.iter().map(RawCountry::from_value).collect();
        debug!(count = countries.len(), "fetched countries");
        Ok(countries)
    }

    #[instrument(skip(self))]
    async fn fetch_exchange_rates(&self) -> Result<ExchangeRateTable, SourceError> {
        let v = self
            .get_json(EXCHANGE_RATE_SOURCE, &self.exchange_rate_url)
            .await?;
        let table = parse_rate_table(&v)?;
        debug!(count = table.len(), base = ?table.base, "fetched exchange rates");
        Ok(table)
    }
}
