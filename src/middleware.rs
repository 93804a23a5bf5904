use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL, REQUESTS_ADMITTED, REQUESTS_REJECTED};
use crate::models::WebResponse;
use crate::rate_limit::{ClientId, Registry};
use crate::security::apply_security_headers;

/// Admission control, applied to every route.
///
/// Derives the client id from the peer address, takes a token from that
/// client's bucket and either runs the rest of the stack or answers 429
/// straight away. A missing peer address fails only this request.
pub async fn admission(State(registry): State<Arc<Registry>>, request: Request, next: Next) -> Response {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let mut response = match client_id(&request) {
        Ok(client_id) => {
            if registry.check(&client_id, Instant::now()) {
                REQUESTS_ADMITTED.inc();
                next.run(request).await
            } else {
                REQUESTS_REJECTED.inc();
                debug!(client = %client_id, "Rate limit exceeded");
                too_many_requests()
            }
        }
        Err(err) => {
            warn!(error = %err, path = %request.uri().path(), "Could not identify client");
            err.into_response()
        }
    };

    apply_security_headers(response.headers_mut());
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    response
}

// Peer address recorded by `into_make_service_with_connect_info`
pub fn client_id(request: &Request) -> Result<ClientId, ApiError> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| ClientId::from(*addr))
        .ok_or_else(|| ApiError::MalformedClientId("no peer address on request".to_string()))
}

pub fn too_many_requests() -> Response {
    let status = StatusCode::TOO_MANY_REQUESTS;
    (status, Json(WebResponse::<()>::new(status, None))).into_response()
}
