// Error type returned by HTTP handlers

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::api::models::ErrorBody;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),

    /// An upstream source failed; the detail names which one and why.
    #[error("External data source unavailable")]
    Upstream { details: String },

    /// `details` is only populated when the service runs in development mode.
    #[error("Internal server error")]
    Internal { details: Option<String> },
}

impl ApiError {
    pub fn internal(err: impl std::fmt::Display, expose_details: bool) -> Self {
        tracing::error!(error = %err, "request failed");
        Self::Internal {
            details: expose_details.then(|| err.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let details = match self {
            ApiError::NotFound(_) => None,
            ApiError::Upstream { details } => Some(details.clone()),
            ApiError::Internal { details } => details.clone(),
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            details,
        })
    }
}
