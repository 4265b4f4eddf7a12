// API request/response models (DTOs)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{CountryFilter, CountryRecord, SortOrder};

/// Error payload for every non-2xx response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// `GET /countries` query string
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListQuery {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

impl ListQuery {
    pub fn into_filter(self) -> CountryFilter {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        CountryFilter {
            sort: SortOrder::from_param(self.sort.as_deref()),
            region: non_empty(self.region),
            currency: non_empty(self.currency),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub message: String,
    pub total_countries: i64,
    pub last_refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub country: CountryRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub uptime_seconds: u64,
}

/// Landing payload for `GET /`
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub status: String,
    pub endpoints: BTreeMap<String, String>,
}

impl ServiceInfo {
    pub fn current() -> Self {
        let endpoints = [
            ("refresh", "POST /countries/refresh"),
            ("getAllCountries", "GET /countries"),
            ("getCountry", "GET /countries/:name"),
            ("deleteCountry", "DELETE /countries/:name"),
            ("status", "GET /status"),
            ("image", "GET /countries/image"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            message: "Countries Exchange API".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            status: "running".into(),
            endpoints,
        }
    }
}
