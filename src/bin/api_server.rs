// HTTP API server binary for the countries exchange service

use anyhow::Result;
use country_exchange::api::{ApiServer, AppState};
use country_exchange::artifact::SummaryArtifact;
use country_exchange::config::AppConfig;
use country_exchange::database_ops::refresh::RefreshService;
use country_exchange::database_ops::sources::HttpSources;
use country_exchange::logging::init_tracing;
use country_exchange::util::db::Db;
use country_exchange::util::env as env_util;
use std::sync::Arc;
use std::time::Instant;

#[actix_web::main]
async fn main() -> Result<()> {
    // Load dotenv/env once (safe to call multiple times)
    env_util::init_env();
    init_tracing("info,sqlx=warn")?;
    env_util::bootstrap_cli("api_server");

    let cfg = AppConfig::from_env()?;
    cfg.log_snapshot("api_server");

    let db = Db::connect(&cfg.database_url, cfg.db_max_connections).await?;
    tracing::info!("Database connected successfully");

    let artifact = SummaryArtifact::new(&cfg.cache_dir);
    let sources = Arc::new(HttpSources::new(&cfg.sources)?);
    let refresh = RefreshService::new(db.clone(), sources).with_artifact(artifact.clone());

    let state = AppState {
        db,
        refresh,
        artifact,
        expose_errors: cfg.is_development(),
        started_at: Instant::now(),
    };

    ApiServer::from_config(&cfg).run(state).await
}
