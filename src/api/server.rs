// actix-web server wiring for the countries API

use crate::api::handlers::AppState;
use crate::api::request_log::RequestLog;
use crate::api::{middleware, routes};
use crate::config::AppConfig;
use actix_web::middleware::Condition;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};

/// Seconds in-flight requests get to finish on shutdown.
const SHUTDOWN_GRACE_SECS: u64 = 10;

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
    pub request_log_db: bool,
}

impl ApiServer {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            host: cfg.host.clone(),
            port: cfg.port,
            allowed_origins: cfg.allowed_origins.clone(),
            request_log_db: cfg.request_log_db,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Serve until the process is signalled.
    pub async fn run(self, state: AppState) -> Result<()> {
        let bind_addr = self.bind_addr();
        tracing::info!(
            addr = %bind_addr,
            request_log_db = self.request_log_db,
            "starting countries API server"
        );

        let log_db = state.db.clone();
        let state = web::Data::new(state);
        let ApiServer {
            allowed_origins,
            request_log_db,
            ..
        } = self;

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .wrap(Condition::new(request_log_db, RequestLog::new(log_db.clone())))
                .wrap(middleware::access_logger())
                .wrap(middleware::compression())
                .wrap(middleware::cors(&allowed_origins))
                .configure(routes::configure_routes)
        })
        .shutdown_timeout(SHUTDOWN_GRACE_SECS)
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;

        server.run().await.context("HTTP server error")?;
        tracing::info!("countries API server stopped");
        Ok(())
    }
}
