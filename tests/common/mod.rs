#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use country_exchange::database_ops::sources::{
    DataSources, SourceError, COUNTRIES_SOURCE, EXCHANGE_RATE_SOURCE,
};
use country_exchange::models::{ExchangeRateTable, RawCountry, RawCurrency};
use tokio::sync::Barrier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    None,
    Timeout,
    Unavailable,
}

/// In-process stand-in for the two upstream APIs.
pub struct FakeSources {
    pub countries: Vec<RawCountry>,
    pub rates: ExchangeRateTable,
    pub countries_failure: Failure,
    pub rates_failure: Failure,
    pub calls: AtomicUsize,
    /// When set, each fetch blocks until the other one has started too.
    pub rendezvous: Option<Arc<Barrier>>,
}

impl FakeSources {
    pub fn new(countries: Vec<RawCountry>, rates: ExchangeRateTable) -> Self {
        Self {
            countries,
            rates,
            countries_failure: Failure::None,
            rates_failure: Failure::None,
            calls: AtomicUsize::new(0),
            rendezvous: None,
        }
    }

    /// Both fetches must be in flight at once or they fail with a timeout.
    pub fn requiring_overlap(mut self) -> Self {
        self.rendezvous = Some(Arc::new(Barrier::new(2)));
        self
    }

    async fn meet(&self, source_name: &'static str) -> Result<(), SourceError> {
        let Some(barrier) = &self.rendezvous else {
            return Ok(());
        };
        tokio::time::timeout(Duration::from_secs(2), barrier.wait())
            .await
            .map(|_| ())
            .map_err(|_| SourceError::Timeout { source_name })
    }

    pub fn failing_rates(mut self, failure: Failure) -> Self {
        self.rates_failure = failure;
        self
    }

    pub fn failing_countries(mut self, failure: Failure) -> Self {
        self.countries_failure = failure;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn fail(source_name: &'static str, failure: Failure) -> Option<SourceError> {
    match failure {
        Failure::None => None,
        Failure::Timeout => Some(SourceError::Timeout { source_name }),
        Failure::Unavailable => Some(SourceError::Unavailable {
            source_name,
            message: "http 502 Bad Gateway".into(),
        }),
    }
}

#[async_trait]
impl DataSources for FakeSources {
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.meet(COUNTRIES_SOURCE).await?;
        match fail(COUNTRIES_SOURCE, self.countries_failure) {
            Some(e) => Err(e),
            None => Ok(self.countries.clone()),
        }
    }

    async fn fetch_exchange_rates(&self) -> Result<ExchangeRateTable, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.meet(EXCHANGE_RATE_SOURCE).await?;
        match fail(EXCHANGE_RATE_SOURCE, self.rates_failure) {
            Some(e) => Err(e),
            None => Ok(self.rates.clone()),
        }
    }
}

pub fn raw_country(name: &str, region: &str, population: u64, code: Option<&str>) -> RawCountry {
    RawCountry {
        name: Some(name.to_string()),
        capital: Some(format!("{name} City")),
        region: Some(region.to_string()),
        population: Some(population),
        currencies: code
            .map(|c| {
                vec![RawCurrency {
                    code: Some(c.to_string()),
                    ..Default::default()
                }]
            })
            .unwrap_or_default(),
        flag: Some(format!("https://flags.example/{}.svg", name.to_lowercase())),
    }
}

pub fn sample_countries() -> Vec<RawCountry> {
    vec![
        raw_country("Nigeria", "Africa", 206_139_589, Some("NGN")),
        raw_country("Ghana", "Africa", 31_072_940, Some("GHS")),
        raw_country("Germany", "Europe", 83_240_525, Some("EUR")),
        raw_country("Antarctica", "Polar", 1_000, None),
        raw_country("Wakanda", "Africa", 1_000, Some("WK")),
    ]
}

pub fn sample_rates() -> ExchangeRateTable {
    [("NGN", 1600.0), ("GHS", 15.5), ("EUR", 0.92), ("USD", 1.0)]
        .into_iter()
        .collect()
}

pub fn temp_cache_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("country-exchange-test-{}", uuid::Uuid::new_v4()))
}
