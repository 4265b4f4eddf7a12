//! Country persistence: upsert-by-name, fault-tolerant batch writes and the
//! global refresh marker.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::models::{CountryFilter, CountryRecord, NormalizedCountry};
use crate::util::db::Db;

const COUNTRY_COLUMNS: &str = "id, name, capital, region, population, currency_code, \
     exchange_rate, estimated_gdp, flag_url, last_refreshed_at, created_at";

const REFRESH_MARKER_KEY: &str = "last_refreshed_at";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Lookup key for the case-insensitive natural key.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Db {
    /// Insert or update one country keyed by its case-insensitive name.
    ///
    /// Runs as a single statement, so the lookup and the write cannot interleave
    /// with another writer. `created_at` is only set on insert. The returned row
    /// comes back from the store, not from the payload.
    #[instrument(skip(self, country), fields(name = country.name.as_deref().unwrap_or("")))]
    pub async fn upsert_country(
        &self,
        country: &NormalizedCountry,
    ) -> Result<CountryRecord, StoreError> {
        let name = country
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| StoreError::InvalidRecord("country name is missing".into()))?;
        if country.population < 0 {
            return Err(StoreError::InvalidRecord(format!(
                "negative population for {name}"
            )));
        }

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO countries \
             (name, name_key, capital, region, population, currency_code, exchange_rate, \
              estimated_gdp, flag_url, last_refreshed_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (name_key) DO UPDATE SET \
               capital = excluded.capital, \
               region = excluded.region, \
               population = excluded.population, \
               currency_code = excluded.currency_code, \
               exchange_rate = excluded.exchange_rate, \
               estimated_gdp = excluded.estimated_gdp, \
               flag_url = excluded.flag_url, \
               last_refreshed_at = excluded.last_refreshed_at \
             RETURNING {COUNTRY_COLUMNS}"
        );
        let rec = sqlx::query_as::<_, CountryRecord>(&sql)
            .bind(name)
            .bind(name_key(name))
            .bind(&country.capital)
            .bind(&country.region)
            .bind(country.population)
            .bind(&country.currency_code)
            .bind(country.exchange_rate)
            .bind(country.estimated_gdp)
            .bind(&country.flag_url)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok(rec)
    }

    /// Upsert every country, logging and skipping the ones that fail.
    /// Returns only the rows that were written.
    #[instrument(skip_all, fields(input = countries.len()))]
    pub async fn bulk_reconcile(&self, countries: &[NormalizedCountry]) -> Vec<CountryRecord> {
        let mut written = Vec::with_capacity(countries.len());
        for country in countries {
            match self.upsert_country(country).await {
                Ok(rec) => written.push(rec),
                Err(e) => {
                    warn!(
                        name = country.name.as_deref().unwrap_or("<unnamed>"),
                        error = %e,
                        "skipping country after write failure"
                    );
                }
            }
        }
        written
    }

    /// Advance the refresh marker to now and return the stored value.
    pub async fn commit_refresh_marker(&self) -> Result<DateTime<Utc>, StoreError> {
        let now = Utc::now();
        let stored: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO metadata (key_name, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT (key_name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at \
             RETURNING value",
        )
        .bind(REFRESH_MARKER_KEY)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    pub async fn refresh_marker(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let value: Option<Option<DateTime<Utc>>> =
            sqlx::query_scalar("SELECT value FROM metadata WHERE key_name = ?")
                .bind(REFRESH_MARKER_KEY)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.flatten())
    }

    pub async fn get_country_by_name(&self, name: &str) -> Result<Option<CountryRecord>, StoreError> {
        let sql = format!("SELECT {COUNTRY_COLUMNS} FROM countries WHERE name_key = ?");
        let rec = sqlx::query_as::<_, CountryRecord>(&sql)
            .bind(name_key(name))
            .fetch_optional(&self.pool)
            .await?;
        Ok(rec)
    }

    /// Remove a country and hand back the row as it was before deletion.
    #[instrument(skip(self))]
    pub async fn delete_country_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CountryRecord>, StoreError> {
        let sql = format!("DELETE FROM countries WHERE name_key = ? RETURNING {COUNTRY_COLUMNS}");
        let rec = sqlx::query_as::<_, CountryRecord>(&sql)
            .bind(name_key(name))
            .fetch_optional(&self.pool)
            .await?;
        Ok(rec)
    }

    pub async fn list_countries(&self, filter: &CountryFilter) -> Result<Vec<CountryRecord>, StoreError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {COUNTRY_COLUMNS} FROM countries WHERE 1=1"));
        if let Some(region) = filter.region.as_deref() {
            qb.push(" AND region = ").push_bind(region.trim().to_string());
            qb.push(" COLLATE NOCASE");
        }
        if let Some(currency) = filter.currency.as_deref() {
            qb.push(" AND currency_code = ").push_bind(currency.trim().to_string());
            qb.push(" COLLATE NOCASE");
        }
        qb.push(" ORDER BY ").push(filter.sort.order_by());
        let rows = qb
            .build_query_as::<CountryRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Highest estimated GDP first; rows without an estimate are left out.
    pub async fn top_countries_by_gdp(&self, limit: i64) -> Result<Vec<CountryRecord>, StoreError> {
        let sql = format!(
            "SELECT {COUNTRY_COLUMNS} FROM countries WHERE estimated_gdp IS NOT NULL \
             ORDER BY estimated_gdp DESC, name COLLATE NOCASE ASC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, CountryRecord>(&sql)
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn country_count(&self) -> Result<i64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM countries")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortOrder;
    use std::time::Duration;

    fn country(name: &str, region: &str, population: i64, currency: Option<&str>, gdp: Option<f64>) -> NormalizedCountry {
        NormalizedCountry {
            name: Some(name.to_string()),
            capital: None,
            region: Some(region.to_string()),
            population,
            currency_code: currency.map(str::to_string),
            exchange_rate: currency.map(|_| 2.0),
            estimated_gdp: gdp,
            flag_url: None,
        }
    }

    fn names(rows: &[CountryRecord]) -> Vec<&str> {
        rows.iter().map(|r| r.name.as_str()).collect()
    }

    #[tokio::test]
    async fn upsert_inserts_then_updates_in_place() {
        let db = Db::in_memory().await.unwrap();
        let first = db
            .upsert_country(&country("Nigeria", "Africa", 100, Some("NGN"), Some(10.0)))
            .await
            .unwrap();
        assert_eq!(first.created_at, first.last_refreshed_at);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let mut changed = country("NIGERIA", "Africa", 250, Some("NGN"), Some(99.0));
        changed.capital = Some("Abuja".into());
        let second = db.upsert_country(&changed).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "Nigeria");
        assert_eq!(second.population, 250);
        assert_eq!(second.capital.as_deref(), Some("Abuja"));
        assert_eq!(second.created_at, first.created_at);
        assert!(second.last_refreshed_at > first.last_refreshed_at);
        assert_eq!(db.country_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_rejects_missing_name() {
        let db = Db::in_memory().await.unwrap();
        let mut nameless = country("x", "Africa", 1, None, Some(0.0));
        nameless.name = None;
        assert!(matches!(
            db.upsert_country(&nameless).await,
            Err(StoreError::InvalidRecord(_))
        ));
        nameless.name = Some("   ".into());
        assert!(db.upsert_country(&nameless).await.is_err());
        assert_eq!(db.country_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn bulk_reconcile_skips_failures() {
        let db = Db::in_memory().await.unwrap();
        let mut bad = country("Broken", "Africa", 1, None, Some(0.0));
        bad.name = None;
        let negative = country("Negative", "Africa", -3, None, Some(0.0));
        let batch = vec![
            country("Ghana", "Africa", 5, Some("GHS"), Some(1.0)),
            bad,
            country("Kenya", "Africa", 7, Some("KES"), Some(2.0)),
            negative,
        ];
        let written = db.bulk_reconcile(&batch).await;
        assert_eq!(written.len(), 2);
        assert_eq!(names(&written), vec!["Ghana", "Kenya"]);
        assert_eq!(db.country_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn refresh_marker_starts_null_and_advances() {
        let db = Db::in_memory().await.unwrap();
        assert_eq!(db.refresh_marker().await.unwrap(), None);

        let first = db.commit_refresh_marker().await.unwrap();
        assert_eq!(db.refresh_marker().await.unwrap(), Some(first));

        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = db.commit_refresh_marker().await.unwrap();
        assert!(second > first);
        assert_eq!(db.refresh_marker().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn delete_returns_snapshot_or_none() {
        let db = Db::in_memory().await.unwrap();
        db.upsert_country(&country("Chad", "Africa", 3, None, Some(0.0)))
            .await
            .unwrap();

        assert!(db.delete_country_by_name("Nonexistent").await.unwrap().is_none());
        assert_eq!(db.country_count().await.unwrap(), 1);

        let gone = db.delete_country_by_name("cHAD").await.unwrap().unwrap();
        assert_eq!(gone.name, "Chad");
        assert_eq!(db.country_count().await.unwrap(), 0);
        assert!(db.get_country_by_name("Chad").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_and_sorts() {
        let db = Db::in_memory().await.unwrap();
        for c in [
            country("benin", "Africa", 12, Some("XOF"), Some(300.0)),
            country("Austria", "Europe", 9, Some("EUR"), Some(900.0)),
            country("Angola", "Africa", 33, Some("AOA"), Some(100.0)),
            country("Togo", "Africa", 8, Some("XOF"), Some(200.0)),
        ] {
            db.upsert_country(&c).await.unwrap();
        }

        let default = db.list_countries(&CountryFilter::default()).await.unwrap();
        assert_eq!(names(&default), vec!["Angola", "Austria", "benin", "Togo"]);

        let unknown = CountryFilter {
            sort: SortOrder::from_param(Some("shoe_size")),
            ..Default::default()
        };
        assert_eq!(db.list_countries(&unknown).await.unwrap(), default);

        let africa_by_gdp = CountryFilter {
            region: Some("AFRICA".into()),
            sort: SortOrder::GdpDesc,
            ..Default::default()
        };
        assert_eq!(
            names(&db.list_countries(&africa_by_gdp).await.unwrap()),
            vec!["benin", "Togo", "Angola"]
        );

        let xof = CountryFilter {
            currency: Some("xof".into()),
            sort: SortOrder::PopulationAsc,
            ..Default::default()
        };
        assert_eq!(names(&db.list_countries(&xof).await.unwrap()), vec!["Togo", "benin"]);

        let desc = CountryFilter {
            sort: SortOrder::NameDesc,
            ..Default::default()
        };
        assert_eq!(
            names(&db.list_countries(&desc).await.unwrap()),
            vec!["Togo", "benin", "Austria", "Angola"]
        );
    }

    #[tokio::test]
    async fn top_by_gdp_excludes_null_but_keeps_zero() {
        let db = Db::in_memory().await.unwrap();
        for c in [
            country("Rich", "X", 1, Some("AAA"), Some(500.0)),
            country("Zero", "X", 1, Some("BBB"), Some(0.0)),
            country("Unknown", "X", 1, None, None),
            country("Mid", "X", 1, Some("CCC"), Some(50.0)),
        ] {
            db.upsert_country(&c).await.unwrap();
        }
        let top = db.top_countries_by_gdp(5).await.unwrap();
        assert_eq!(names(&top), vec!["Rich", "Mid", "Zero"]);
        let top1 = db.top_countries_by_gdp(1).await.unwrap();
        assert_eq!(names(&top1), vec!["Rich"]);
    }
}
