use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::db::Database;
use crate::predictor::{predict_run, RunModel};
use crate::similarity::{parse_query_vector, rank_similar_games};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Loaded once at startup, read-only thereafter. `None` means the
    /// predictor serves its degraded fallback.
    pub model: Arc<Option<RunModel>>,
}

/// Build the Axum router for the API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/predict-run", post(predict_run_handler))
        .route("/api/similar-games", get(similar_games_handler))
        .route("/api/fingerprints", get(fingerprints_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// GET /health
async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct PredictRunRequest {
    pub momentum_window: Vec<f64>,
    pub score_diff: f64,
}

/// POST /api/predict-run
///
/// Always 200: the predictor handles its own degraded paths.
async fn predict_run_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictRunRequest>,
) -> impl IntoResponse {
    let result = predict_run(state.model.as_ref().as_ref(), &req.momentum_window, req.score_diff);
    Json(result)
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct SimilarGamesParams {
    /// Comma-separated list of exactly 20 floats
    pub momentum_vector: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// GET /api/similar-games?momentum_vector=...&top_k=5
async fn similar_games_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SimilarGamesParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let query = parse_query_vector(&params.momentum_vector)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    // Persistence failures degrade to an empty corpus (mock results),
    // never a failed request
    let corpus = state.db.list_fingerprints().unwrap_or_else(|e| {
        warn!("Corpus fetch failed, falling back to empty corpus: {}", e);
        Vec::new()
    });

    rank_similar_games(&query, &corpus, params.top_k)
        .map(Json)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

#[derive(Debug, Serialize)]
struct FingerprintSummary {
    game_id: String,
    season: String,
    home_team: String,
    away_team: String,
    final_score: String,
}

/// GET /api/fingerprints
async fn fingerprints_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let fingerprints = state
        .db
        .list_fingerprints()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let summaries: Vec<FingerprintSummary> = fingerprints
        .into_iter()
        .map(|fp| FingerprintSummary {
            game_id: fp.game_id,
            season: fp.season,
            home_team: fp.home_team,
            away_team: fp.away_team,
            final_score: fp.final_score,
        })
        .collect();
    Ok(Json(json!({ "count": summaries.len(), "results": summaries })))
}
