//! HTTP server setup and the thin non-proxy handlers.
//!
//! # Responsibilities
//! - Create the axum Router with login, admin, and proxy fallback routes
//! - Wire up middleware (request ID, tracing, whole-request timeout)
//! - Spawn the health monitor next to the server
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth;
use crate::balancer::upstream_status;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::health::HealthMonitor;
use crate::http::proxy::proxy_handler;
use crate::http::request::GatewayRequestId;
use crate::security::RateLimiter;
use crate::store::StateStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub store: Arc<dyn StateStore>,
    pub client: Client<HttpConnector, Body>,
    pub rate_limiter: RateLimiter,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: Arc<GatewayConfig>,
    store: Arc<dyn StateStore>,
}

impl HttpServer {
    /// Create a new HTTP server over the given store.
    pub fn new(config: GatewayConfig, store: Arc<dyn StateStore>) -> Self {
        let config = Arc::new(config);
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let rate_limiter = RateLimiter::new(&config.rate_limit);

        let state = AppState {
            config: config.clone(),
            store: store.clone(),
            client,
            rate_limiter,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            store,
        }
    }

    /// Build the axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/login", post(login))
            .route("/admin/status", get(admin_status))
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(GatewayRequestId))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        // The monitor shares the shutdown channel and exits with the server.
        let monitor = HealthMonitor::new(
            self.store.clone(),
            self.config.upstreams.clone(),
            self.config.health.clone(),
        );
        let monitor_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            monitor.run(monitor_shutdown).await;
        });

        let mut rx = shutdown;
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = rx.recv() => {}
                }
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    access_token: String,
    token_type: &'static str,
}

/// Issue a signed bearer credential for the given username.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let token = auth::issue(
        &state.config.auth.secret,
        &body.username,
        state.config.auth.token_expiry_mins,
    )?;
    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer",
    }))
}

/// Status reporter: per-upstream health, failures, latency, connections.
/// Restricted to the configured admin subject; marked non-cacheable.
async fn admin_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let claims = auth::verify(&state.config.auth.secret, auth::bearer_token(&headers)?)?;
    if claims.sub != state.config.auth.admin_subject {
        return Err(GatewayError::Forbidden);
    }

    let data = upstream_status(state.store.as_ref(), &state.config.upstreams).await?;

    let mut response = Json(serde_json::json!({
        "status": "ok",
        "data": data,
    }))
    .into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}
