use chrono::Utc;

use crate::util::db::Db;

/// One completed HTTP request, as recorded by the request-log middleware.
#[derive(Debug, Clone)]
pub struct RequestLogEntry {
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub response_time_ms: f64,
    pub request_id: String,
}

impl Db {
    pub async fn insert_request_log(&self, entry: &RequestLogEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO request_logs \
             (method, url, status_code, ip_address, user_agent, response_time_ms, request_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.method)
        .bind(&entry.url)
        .bind(i64::from(entry.status_code))
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.response_time_ms)
        .bind(&entry.request_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
