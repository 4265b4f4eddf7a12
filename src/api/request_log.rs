// Request logging middleware: persists one row per completed request

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::time::Instant;

use crate::database_ops::request_log::RequestLogEntry;
use crate::util::db::Db;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Records method, url, status, client, user agent and latency into
/// `request_logs`. The insert runs detached; failures are only logged.
pub struct RequestLog {
    db: Db,
}

impl RequestLog {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLog
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLogMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLogMiddleware {
            service,
            db: self.db.clone(),
        }))
    }
}

pub struct RequestLogMiddleware<S> {
    service: S,
    db: Db,
}

impl<S, B> Service<ServiceRequest> for RequestLogMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let db = self.db.clone();
        let request_id = uuid::Uuid::new_v4().to_string();
        let method = req.method().to_string();
        let url = req.uri().to_string();
        let ip_address = req.connection_info().realip_remote_addr().map(str::to_string);
        let user_agent = req
            .headers()
            .get("User-Agent")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            if let Ok(v) = HeaderValue::from_str(&request_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), v);
            }

            let entry = RequestLogEntry {
                method,
                url,
                status_code: res.status().as_u16(),
                ip_address,
                user_agent,
                response_time_ms: started.elapsed().as_secs_f64() * 1000.0,
                request_id,
            };
            actix_web::rt::spawn(async move {
                if let Err(e) = db.insert_request_log(&entry).await {
                    tracing::warn!(error = %e, url = %entry.url, "failed to write request log");
                }
            });
            Ok(res)
        })
    }
}
