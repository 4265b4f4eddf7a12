use anyhow::Result;
use chrono::Utc;
use country_exchange::artifact::SummaryArtifact;
use country_exchange::config::AppConfig;
use country_exchange::database_ops::refresh::RefreshService;
use country_exchange::database_ops::sources::HttpSources;
use country_exchange::logging::init_tracing;
use country_exchange::util::db::Db;
use country_exchange::util::env as env_util;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    init_tracing("info,sqlx=warn")?;
    env_util::bootstrap_cli("country_sync");

    let cfg = AppConfig::from_env()?;
    cfg.log_snapshot("country_sync");
    let db = Db::connect(&cfg.database_url, cfg.db_max_connections.min(5)).await?;
    let sources = Arc::new(HttpSources::new(&cfg.sources)?);
    let svc = RefreshService::new(db, sources).with_artifact(SummaryArtifact::new(&cfg.cache_dir));

    if cfg.sync_interval_secs == 0 {
        // one-shot
        run_once(&svc).await?;
    } else {
        loop {
            if let Err(e) = run_once(&svc).await {
                error!(error = ?e, "country sync failed");
            }
            tokio::time::sleep(Duration::from_secs(cfg.sync_interval_secs)).await;
        }
    }
    Ok(())
}

async fn run_once(svc: &RefreshService) -> Result<()> {
    let start = Utc::now();
    let summary = svc.run().await?;
    info!(
        fetched = summary.fetched,
        written = summary.written,
        failed = summary.failed,
        total = summary.total_countries,
        elapsed_ms = (Utc::now() - start).num_milliseconds(),
        ts = %summary.last_refreshed_at,
        "synced countries"
    );
    Ok(())
}
