/// HTTP surface: one independently-owned `HealthSession` per client session.
///
/// Sessions live in a registry behind a `tokio::sync::RwLock`; no two
/// sessions share a log. Nothing is persisted.
use crate::conditions::ConditionEntry;
use crate::config::HealthConfig;
use crate::ingest::{IngestReport, RawRow};
use crate::metrics::{MetricField, MetricRanges};
use crate::profile::{Profile, ProfileInput};
use crate::report::{chart_series, ChartSeries, HealthReport};
use crate::session::HealthSession;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

/// Live sessions keyed by id. Ids are never reused within a process.
pub struct SessionRegistry {
    next_id: u64,
    ranges: MetricRanges,
    sessions: HashMap<u64, HealthSession>,
}

impl SessionRegistry {
    pub fn new(ranges: MetricRanges) -> Self {
        Self {
            next_id: 1,
            ranges,
            sessions: HashMap::new(),
        }
    }

    pub fn create(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.sessions.insert(id, HealthSession::new(self.ranges));
        id
    }

    pub fn get(&self, id: u64) -> Option<&HealthSession> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut HealthSession> {
        self.sessions.get_mut(&id)
    }

    pub fn remove(&mut self, id: u64) -> Option<HealthSession> {
        self.sessions.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[derive(Clone)]
struct AppState {
    registry: Arc<RwLock<SessionRegistry>>,
    recent_window: usize,
}

type ApiError = (StatusCode, Json<Value>);

fn error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (status, Json(json!({ "error": message.to_string() })))
}

fn no_session(id: u64) -> ApiError {
    error(StatusCode::NOT_FOUND, format!("no session {id}"))
}

/// Build the router. Split out from [`run`] so tests can drive it directly.
pub fn router(config: &HealthConfig) -> Router {
    let state = AppState {
        registry: Arc::new(RwLock::new(SessionRegistry::new(config.ranges.to_ranges()))),
        recent_window: config.reports.recent_window,
    };

    Router::new()
        .route("/api/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", delete(end_session))
        .route("/api/sessions/{id}/profile", put(save_profile))
        .route("/api/sessions/{id}/metrics", post(ingest_metrics))
        .route("/api/sessions/{id}/metrics/{field}", get(metric_series))
        .route("/api/sessions/{id}/conditions", post(record_condition))
        .route("/api/sessions/{id}/report", get(report))
        .route("/api/sessions/{id}/reset", post(reset))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

pub async fn run(config: &HealthConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(config);

    let addr = format!("{}:{}", config.serve.bind, config.serve.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!("serve listening on {local_addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({"ok": true}))
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let mut registry = state.registry.write().await;
    let id = registry.create();
    tracing::info!(session = id, live = registry.len(), "session created");
    (StatusCode::CREATED, Json(json!({ "id": id })))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let mut registry = state.registry.write().await;
    registry.remove(id).ok_or_else(|| no_session(id))?;
    tracing::info!(session = id, live = registry.len(), "session ended");
    Ok(StatusCode::NO_CONTENT)
}

async fn save_profile(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(input): Json<ProfileInput>,
) -> Result<Json<Profile>, ApiError> {
    let mut registry = state.registry.write().await;
    let session = registry.get_mut(id).ok_or_else(|| no_session(id))?;
    let profile = session
        .save_profile(input)
        .map_err(|e| error(StatusCode::BAD_REQUEST, e))?;
    Ok(Json(profile.clone()))
}

async fn ingest_metrics(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(rows): Json<Vec<RawRow>>,
) -> Result<Json<IngestReport>, ApiError> {
    let mut registry = state.registry.write().await;
    let session = registry.get_mut(id).ok_or_else(|| no_session(id))?;
    let report = session.ingest(&rows);
    tracing::debug!(session = id, accepted = report.accepted, "metrics ingested");
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct SeriesQuery {
    recent: Option<usize>,
}

async fn metric_series(
    State(state): State<AppState>,
    Path((id, field)): Path<(u64, String)>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<ChartSeries>, ApiError> {
    let field: MetricField = field
        .parse()
        .map_err(|e| error(StatusCode::NOT_FOUND, e))?;
    let registry = state.registry.read().await;
    let session = registry.get(id).ok_or_else(|| no_session(id))?;
    Ok(Json(chart_series(session.metrics(), field, query.recent)))
}

async fn record_condition(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(entry): Json<ConditionEntry>,
) -> Result<StatusCode, ApiError> {
    let mut registry = state.registry.write().await;
    let session = registry.get_mut(id).ok_or_else(|| no_session(id))?;
    session
        .record_condition(entry)
        .map_err(|e| error(StatusCode::BAD_REQUEST, e))?;
    Ok(StatusCode::CREATED)
}

async fn report(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<HealthReport>, ApiError> {
    let registry = state.registry.read().await;
    let session = registry.get(id).ok_or_else(|| no_session(id))?;
    Ok(Json(HealthReport::build(session, state.recent_window)))
}

async fn reset(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let mut registry = state.registry.write().await;
    let session = registry.get_mut(id).ok_or_else(|| no_session(id))?;
    session.reset();
    Ok(StatusCode::NO_CONTENT)
}
