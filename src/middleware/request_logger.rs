//! Request logging middleware.
//!
//! Every request gets a UUIDv7 request id, echoed in the `X-Request-Id`
//! response header and attached to the start and completion log lines
//! (target `api`). Completion lines carry the matched route pattern so
//! they group by endpoint.

use std::future::{Ready, ready};
use std::time::Instant;

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::header::{HeaderName, HeaderValue};
use futures_util::future::LocalBoxFuture;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::API_KEY_HEADER;

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Characters of an API key that may be logged.
const LOGGED_KEY_PREFIX: usize = 8;

/// Request logger middleware factory.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

/// Request logger middleware service.
pub struct RequestLoggerMiddleware<S> {
    service: S,
}

fn key_prefix(req: &ServiceRequest) -> String {
    match req.headers().get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        Some(key) if key.chars().count() > LOGGED_KEY_PREFIX => {
            format!("{}...", key.chars().take(LOGGED_KEY_PREFIX).collect::<String>())
        }
        Some(_) => "malformed".to_string(),
        None => "none".to_string(),
    }
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
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
        let start = Instant::now();
        let request_id = Uuid::now_v7();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        info!(
            target: "api",
            request_id = %request_id,
            method = %method,
            path = %path,
            remote_addr = %remote_addr,
            api_key = %key_prefix(&req),
            "Request started"
        );

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            let duration_ms = start.elapsed().as_millis() as u64;
            let status = res.status().as_u16();
            let route = res.request().match_pattern().unwrap_or(path);

            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            if res.status().is_server_error() {
                error!(target: "api", request_id = %request_id, method = %method, route = %route, status, duration_ms, "Request failed");
            } else if res.status().is_client_error() {
                warn!(target: "api", request_id = %request_id, method = %method, route = %route, status, duration_ms, "Request rejected");
            } else {
                info!(target: "api", request_id = %request_id, method = %method, route = %route, status, duration_ms, "Request completed");
            }

            Ok(res)
        })
    }
}
