// HTTP request handlers for API endpoints

use crate::api::error::ApiError;
use crate::api::models::*;
use crate::artifact::{SummaryArtifact, SUMMARY_CONTENT_TYPE};
use crate::database_ops::refresh::{RefreshError, RefreshService};
use crate::models::StatusSnapshot;
use crate::util::db::Db;
use actix_web::{web, HttpResponse};
use std::time::Instant;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub refresh: RefreshService,
    pub artifact: SummaryArtifact,
    /// Include internal error text in 500 responses
    pub expose_errors: bool,
    pub started_at: Instant,
}

impl AppState {
    fn internal(&self, err: impl std::fmt::Display) -> ApiError {
        ApiError::internal(err, self.expose_errors)
    }
}

type HandlerResult = Result<HttpResponse, ApiError>;

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(ServiceInfo::current())
}

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let db_status = if state.db.ping().await {
        "connected"
    } else {
        "disconnected"
    };

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        database: db_status.to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

/// Pull both sources and reconcile them into the store
pub async fn refresh_countries(state: web::Data<AppState>) -> HandlerResult {
    tracing::info!("country refresh requested");

    let summary = state.refresh.run().await.map_err(|e| match e {
        RefreshError::Source(source) => ApiError::Upstream {
            details: source.to_string(),
        },
        other => state.internal(other),
    })?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        message: "Countries refreshed successfully".to_string(),
        total_countries: summary.total_countries,
        last_refreshed_at: summary.last_refreshed_at,
    }))
}

/// List countries with optional region/currency filters and sorting
pub async fn list_countries(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> HandlerResult {
    let filter = query.into_inner().into_filter();
    let countries = state
        .db
        .list_countries(&filter)
        .await
        .map_err(|e| state.internal(e))?;
    Ok(HttpResponse::Ok().json(countries))
}

pub async fn get_country(state: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let name = path.into_inner();
    match state
        .db
        .get_country_by_name(&name)
        .await
        .map_err(|e| state.internal(e))?
    {
        Some(country) => Ok(HttpResponse::Ok().json(country)),
        None => Err(ApiError::NotFound("Country not found")),
    }
}

pub async fn delete_country(state: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let name = path.into_inner();
    tracing::info!(name = %name, "country delete requested");

    let deleted = state
        .db
        .delete_country_by_name(&name)
        .await
        .map_err(|e| state.internal(e))?
        .ok_or(ApiError::NotFound("Country not found"))?;

    Ok(HttpResponse::Ok().json(DeleteResponse {
        message: "Country deleted successfully".to_string(),
        country: deleted,
    }))
}

/// Total countries and the last refresh marker
pub async fn get_status(state: web::Data<AppState>) -> HandlerResult {
    let total_countries = state
        .db
        .country_count()
        .await
        .map_err(|e| state.internal(e))?;
    let last_refreshed_at = state
        .db
        .refresh_marker()
        .await
        .map_err(|e| state.internal(e))?;

    Ok(HttpResponse::Ok().json(StatusSnapshot {
        total_countries,
        last_refreshed_at,
    }))
}

/// Serve the summary image rendered by the last refresh
pub async fn summary_image(state: web::Data<AppState>) -> HandlerResult {
    let bytes = state
        .artifact
        .load()
        .await
        .map_err(|e| state.internal(format!("{e:#}")))?
        .ok_or(ApiError::NotFound("Summary image not found"))?;

    Ok(HttpResponse::Ok()
        .content_type(SUMMARY_CONTENT_TYPE)
        .body(bytes))
}

pub async fn route_not_found() -> HandlerResult {
    Err(ApiError::NotFound("Route not found"))
}
