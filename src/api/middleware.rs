// Access log, compression and CORS wrappers for the countries API

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{Compress, Logger};

/// Access log line: client, request line, status, bytes, agent, latency.
/// Health probes are left out to keep the log readable.
pub fn access_logger() -> Logger {
    Logger::new(r#"%a "%r" %s %b "%{User-Agent}i" %Dms"#).exclude("/health")
}

pub fn compression() -> Compress {
    Compress::default()
}

/// `None` means any origin is allowed.
fn parse_origins(allowed_origins: &str) -> Option<Vec<&str>> {
    let origins: Vec<&str> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();
    if origins.is_empty() || origins.contains(&"*") {
        None
    } else {
        Some(origins)
    }
}

/// Read-only API plus refresh and delete; no credentials are involved.
pub fn cors(allowed_origins: &str) -> Cors {
    let base = Cors::default()
        .allowed_methods(vec!["GET", "POST", "DELETE"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .expose_headers(vec![header::HeaderName::from_static(
            crate::api::request_log::REQUEST_ID_HEADER,
        )])
        .max_age(3600);

    match parse_origins(allowed_origins) {
        None => base.allow_any_origin(),
        Some(origins) => origins
            .into_iter()
            .fold(base, |cors, origin| cors.allowed_origin(origin)),
    }
}
