//! Proxy dispatcher: executes one client request against a chosen upstream.
//!
//! Per-request pipeline, each stage an explicit `Result`:
//! ```text
//! Admitting  → credential verify, quota check (no side effects on reject)
//! Selecting  → least-connections pick over live store reads
//! Forwarding → INCR up_conn (lease), strip host header, forward with
//!              timeout, relay verbatim; lease DECRs on every exit path
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request, Uri},
    response::{IntoResponse, Response},
};
use tokio::time::{self, Instant};

use crate::auth;
use crate::balancer::{select_upstream, ConnectionLease};
use crate::error::GatewayError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::resolve_identity;
use crate::store::keys;

/// Main proxy entry point; all non-login, non-admin traffic lands here.
pub async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(crate::http::X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "proxying request"
    );

    let mut upstream_label = String::from("none");
    let response = match dispatch(&state, client_addr, request, &mut upstream_label).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "request rejected");
            e.into_response()
        }
    };

    metrics::record_request(
        &method,
        response.status().as_u16(),
        &upstream_label,
        start.into_std(),
    );
    response
}

async fn dispatch(
    state: &AppState,
    client_addr: SocketAddr,
    request: Request<Body>,
    upstream_label: &mut String,
) -> Result<Response, GatewayError> {
    // Admitting: credential first, then quota. A rejected request touches no
    // upstream state.
    let claims = auth::verify(
        &state.config.auth.secret,
        auth::bearer_token(request.headers())?,
    )?;
    let identity = resolve_identity(state.config.rate_limit.identity, &claims, client_addr.ip());
    state
        .rate_limiter
        .check(state.store.as_ref(), &identity)
        .await?;

    // Selecting.
    let selection = select_upstream(state.store.as_ref(), &state.config.upstreams).await?;
    if selection.degraded {
        metrics::record_degraded_selection();
    }
    *upstream_label = selection.upstream.clone();

    // Forwarding: the lease decrements the connection count when dropped,
    // whichever way this function exits.
    let _lease = ConnectionLease::acquire(state.store.clone(), &selection.upstream).await;
    let outcome = forward(state, &selection.upstream, request).await;

    if let Err(GatewayError::UpstreamTransport(_)) = &outcome {
        // Fast-path failure signal, independent of the next probe cycle.
        if let Err(e) = state.store.incr(&keys::fail(&selection.upstream)).await {
            tracing::warn!(error = %e, upstream = %selection.upstream, "failed to record upstream failure");
        }
    }

    outcome
}

async fn forward(
    state: &AppState,
    upstream: &str,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let (mut parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri: Uri = format!("{}{}", upstream.trim_end_matches('/'), path_and_query)
        .parse()
        .map_err(|e: axum::http::uri::InvalidUri| GatewayError::UpstreamTransport(e.to_string()))?;

    // The authority comes from the target URI; relaying the client's host
    // header would desynchronize the upstream.
    parts.headers.remove(header::HOST);

    let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in parts.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
    }
    let forward_request = builder
        .body(body)
        .map_err(|e| GatewayError::UpstreamTransport(e.to_string()))?;

    let timeout = Duration::from_secs(state.config.proxy.timeout_secs);
    match time::timeout(timeout, state.client.request(forward_request)).await {
        Ok(Ok(response)) => {
            let (parts, body) = response.into_parts();
            Ok(Response::from_parts(parts, Body::new(body)))
        }
        Ok(Err(e)) => Err(GatewayError::UpstreamTransport(e.to_string())),
        Err(_) => Err(GatewayError::UpstreamTransport(format!(
            "timed out after {}s",
            state.config.proxy.timeout_secs
        ))),
    }
}
