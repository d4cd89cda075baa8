//! Inspection and control API for a keep-alive provider.
//!
//! Routes:
//! - GET /health
//! - GET /v1/cache
//! - DELETE /v1/cache            (body: owner key or array of owner keys)
//! - PUT /v1/cache/{id}          (body: partial entry)
//! - POST /v1/cache/{id}/unactivate
//! - GET /v1/cache/{id}/events   (SSE mount notifications)
//! - GET /metrics

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::cache::entry::{CacheEntry, EntryPatch, Identification};
use crate::config::{Config, Matcher, ProviderConfig};
use crate::error::KeepAliveError;
use crate::notify::EventKey;
use crate::provider::surface::SurfaceState;
use crate::provider::{FlushReport, MemorySurface, Provider, ProviderHandle};
use crate::server::metrics::Metrics;
use crate::server::streaming::notifications_to_sse_stream;

/// Application state shared across handlers.
pub struct AppState {
    pub handle: ProviderHandle<Value>,
    pub surface: MemorySurface,
    pub config: Arc<Config>,
    pub metrics: Metrics,
    pub start_time: Instant,
}

impl AppState {
    /// Build a provider over JSON content and wrap it for serving.
    pub fn new(config: Arc<Config>) -> prometheus::Result<Self> {
        let surface = MemorySurface::new();
        let provider = json_provider(&config.provider, surface.clone());

        Ok(Self {
            handle: ProviderHandle::new(provider),
            surface,
            config,
            metrics: Metrics::new()?,
            start_time: Instant::now(),
        })
    }
}

/// Provider whose content is a JSON value carrying its owner key in `owner_field`.
pub fn json_provider(config: &ProviderConfig, surface: MemorySurface) -> Provider<Value> {
    let owner_field = config.owner_field.clone();
    Provider::new(
        config,
        move |content: &Value| {
            content
                .get(owner_field.as_str())
                .and_then(Value::as_str)
                .map(str::to_string)
        },
        Box::new(surface),
    )
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/v1/cache", get(get_cache).delete(remove_cache))
        .route("/v1/cache/{id}", put(set_cache))
        .route("/v1/cache/{id}/unactivate", post(unactivate))
        .route("/v1/cache/{id}/events", get(mount_events))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─── Response Types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub existed: bool,
    pub entries: usize,
}

#[derive(Debug, Serialize)]
pub struct CacheResponse {
    pub provider: String,
    pub capacity: Option<usize>,
    /// Tasks still queued; zero after every handled request.
    pub pending_tasks: usize,
    pub keys: Vec<Identification>,
    pub entries: Vec<CacheEntry<Value>>,
    pub include: Option<Matcher>,
    pub exclude: Option<Matcher>,
    pub surface: SurfaceState,
}

/// Error body returned for rejected requests.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub struct ApiError(KeepAliveError);

impl From<KeepAliveError> for ApiError {
    fn from(err: KeepAliveError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            KeepAliveError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        existed: state.handle.is_existed(),
        entries: state.handle.len().await,
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, StatusCode> {
    state.metrics.render().map_err(|err| {
        warn!(error = %err, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

async fn get_cache(State(state): State<Arc<AppState>>) -> Json<CacheResponse> {
    let (capacity, pending_tasks) = {
        let shared = state.handle.shared();
        let provider = shared.read().await;
        (provider.capacity(), provider.pending_tasks())
    };

    Json(CacheResponse {
        provider: state.handle.provider_identification().to_string(),
        capacity,
        pending_tasks,
        keys: state.handle.keys().await,
        entries: state.handle.cache().await,
        include: state.handle.include().cloned(),
        exclude: state.handle.exclude().cloned(),
        surface: state.surface.snapshot(),
    })
}

async fn set_cache(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<EntryPatch<Value>>,
) -> Json<FlushReport> {
    info!(identification = %id, "set_cache request");

    let report = state.handle.set_cache(&id, patch).await;
    state.metrics.observe(&report, state.handle.len().await);
    Json(report)
}

async fn remove_cache(
    State(state): State<Arc<AppState>>,
    Json(target): Json<Value>,
) -> Result<Json<FlushReport>, ApiError> {
    let report = state.handle.remove_cache_value(&target).await?;

    info!(removed = report.removed.len(), "remove_cache request");
    state.metrics.observe(&report, state.handle.len().await);
    Ok(Json(report))
}

async fn unactivate(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> StatusCode {
    if state.handle.unactivate(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn mount_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let key = EventKey::mounted(id);
    let rx = state.handle.notification_channel().subscribe_channel(key.clone());
    let stream = notifications_to_sse_stream(rx, key);
    Sse::new(stream).keep_alive(KeepAlive::default())
}
