pub mod aggregate;
pub mod attributes;
pub mod config;
pub mod engine;
pub mod error;
pub mod geocode;
pub mod geometry;
pub mod graph;
pub mod models;
pub mod risk;
pub mod routing;
pub mod visibility;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::aggregate::RouteAnnotator;
use crate::engine::{PathFinder, RoadGraph};
use crate::error::RouteError;
use crate::geocode::{Geocoder, resolve_endpoint};
use crate::models::{ApiError, RouteRequest, RouteResponse};
use crate::risk::{RandomDecisions, RiskClassifier};
use crate::visibility::VisibilityScorer;

#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<RoadGraph>,
    pub classifier: Arc<RiskClassifier>,
    pub visibility: Arc<dyn VisibilityScorer>,
    pub geocoder: Option<Arc<Geocoder>>,
    /// When set every request replays the same hazard draws.
    pub risk_seed: Option<u64>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/get-route", post(route_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn route_handler(
    State(state): State<AppState>,
    Json(req): Json<RouteRequest>,
) -> Result<Json<RouteResponse>, (StatusCode, Json<ApiError>)> {
    annotate(&state, &req).await.map(Json).map_err(|err| {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!("route {:?} -> {:?} failed: {err}", req.start, req.end);
        } else {
            tracing::info!("route {:?} -> {:?}: {err}", req.start, req.end);
        }
        (status, Json(ApiError { error: err.to_string() }))
    })
}

async fn annotate(state: &AppState, req: &RouteRequest) -> Result<RouteResponse, RouteError> {
    let geocoder = state.geocoder.as_deref();
    let start = resolve_endpoint(&req.start, geocoder).await?;
    let end = resolve_endpoint(&req.end, geocoder).await?;

    // Path search is CPU bound; keep it off the async workers.
    let graph = Arc::clone(&state.graph);
    let path = tokio::task::spawn_blocking(move || graph.shortest_path(start, end))
        .await
        .map_err(|err| RouteError::Internal(err.to_string()))??;
    tracing::debug!("path with {} node(s), {:.0} m", path.nodes.len(), path.length_m);

    let decisions = match state.risk_seed {
        Some(seed) => RandomDecisions::seeded(seed),
        None => RandomDecisions::from_entropy(),
    };
    let mut annotator = RouteAnnotator::new(&state.classifier, decisions, state.visibility.score());
    let summary = annotator.aggregate(&path, state.graph.as_ref())?;
    Ok(summary.into_response())
}
