//! Domain types shared by the source client, reconciler, store and HTTP layer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Currency descriptor as listed by the countries source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCurrency {
    pub code: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

/// Untrusted country payload. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCountry {
    pub name: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    /// `None` when the source value was missing, negative or not a number.
    pub population: Option<u64>,
    pub currencies: Vec<RawCurrency>,
    pub flag: Option<String>,
}

impl RawCountry {
    /// Lenient decode of one element of the countries payload.
    ///
    /// Accepts both the restcountries v2 shape (`name`/`capital`/`flag` as strings,
    /// `currencies` as an array) and the v3 shape (`name.common`, `capital` array,
    /// `flags.png`, `currencies` keyed by code). Anything that is not an object
    /// decodes to an all-empty record.
    pub fn from_value(v: &Value) -> Self {
        let Some(obj) = v.as_object() else {
            return Self::default();
        };

        let name = match obj.get("name") {
            Some(Value::Object(n)) => n.get("common").and_then(non_blank),
            Some(other) => non_blank(other),
            None => None,
        };

        let capital = match obj.get("capital") {
            Some(Value::Array(items)) => items.iter().find_map(non_blank),
            Some(other) => non_blank(other),
            None => None,
        };

        let flag = obj.get("flag").and_then(non_blank).or_else(|| {
            obj.get("flags").and_then(|f| match f {
                Value::Object(m) => m.get("png").or_else(|| m.get("svg")).and_then(non_blank),
                _ => None,
            })
        });

        let currencies = match obj.get("currencies") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|c| RawCurrency {
                    code: c.get("code").and_then(non_blank),
                    name: c.get("name").and_then(non_blank),
                    symbol: c.get("symbol").and_then(non_blank),
                })
                .collect(),
            Some(Value::Object(by_code)) => by_code
                .iter()
                .map(|(code, c)| RawCurrency {
                    code: Some(code.clone()).filter(|s| !s.trim().is_empty()),
                    name: c.get("name").and_then(non_blank),
                    symbol: c.get("symbol").and_then(non_blank),
                })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            name,
            capital,
            region: obj.get("region").and_then(non_blank),
            population: obj.get("population").and_then(lenient_count),
            currencies,
            flag,
        }
    }
}

fn non_blank(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn lenient_count(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.floor() as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Exchange rates keyed by ISO currency code, relative to `base`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeRateTable {
    pub base: Option<String>,
    rates: HashMap<String, f64>,
}

impl ExchangeRateTable {
    pub fn new(base: Option<String>) -> Self {
        Self {
            base,
            rates: HashMap::new(),
        }
    }

    /// Insert a rate; non-finite or non-positive values are refused.
    pub fn insert(&mut self, code: impl Into<String>, rate: f64) -> bool {
        if !rate.is_finite() || rate <= 0.0 {
            return false;
        }
        self.rates.insert(code.into(), rate);
        true
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ExchangeRateTable {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut table = Self::default();
        for (code, rate) in iter {
            table.insert(code, rate);
        }
        table
    }
}

/// Reconciler output: canonical shape, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedCountry {
    pub name: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
}

/// Persisted country row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CountryRecord {
    pub id: i64,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Ordering for country listings. Unknown keys fall back to `NameAsc`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    GdpAsc,
    GdpDesc,
    PopulationAsc,
    PopulationDesc,
    #[default]
    NameAsc,
    NameDesc,
}

impl SortOrder {
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("gdp_asc") => Self::GdpAsc,
            Some("gdp_desc") => Self::GdpDesc,
            Some("population_asc") => Self::PopulationAsc,
            Some("population_desc") => Self::PopulationDesc,
            Some("name_desc") => Self::NameDesc,
            _ => Self::NameAsc,
        }
    }

    pub fn order_by(self) -> &'static str {
        match self {
            Self::GdpAsc => "estimated_gdp ASC, name COLLATE NOCASE ASC",
            Self::GdpDesc => "estimated_gdp DESC, name COLLATE NOCASE ASC",
            Self::PopulationAsc => "population ASC, name COLLATE NOCASE ASC",
            Self::PopulationDesc => "population DESC, name COLLATE NOCASE ASC",
            Self::NameAsc => "name COLLATE NOCASE ASC",
            Self::NameDesc => "name COLLATE NOCASE DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CountryFilter {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub total_countries: i64,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

/// Outcome of one completed refresh batch.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub total_countries: i64,
    pub last_refreshed_at: DateTime<Utc>,
    pub fetched: usize,
    pub written: usize,
    pub failed: usize,
}
