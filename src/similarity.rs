//! Similar-game search: ranks stored fingerprints against a query vector by
//! cosine similarity.
//!
//! A cold-started corpus (fewer than 10 raw entries, counted before any
//! per-entry validity filtering) returns a fixed mock result set flagged
//! `using_mock_data` so the response shape stays stable and demonstrable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::{GameFingerprint, NUM_BUCKETS};
use crate::fingerprint::builder::round3;

/// Minimum raw corpus size before real rankings are served
pub const MIN_CORPUS_SIZE: usize = 10;

/// Caller-visible rejection of a malformed query
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("momentum_vector must contain exactly {NUM_BUCKETS} values, got {0}")]
    WrongLength(usize),
    #[error("momentum_vector entry {0:?} is not a number")]
    NotNumeric(String),
}

/// Parse a delimited list of floats into a query vector. Length is
/// validated here as well so API callers get a single error path.
pub fn parse_query_vector(raw: &str) -> Result<Vec<f64>, QueryError> {
    let values = raw
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .map_err(|_| QueryError::NotNumeric(part.to_string()))
        })
        .collect::<Result<Vec<f64>, QueryError>>()?;
    if values.len() != NUM_BUCKETS {
        return Err(QueryError::WrongLength(values.len()));
    }
    Ok(values)
}

/// Cosine similarity between two equal-length vectors. Zero-norm inputs
/// score 0.0 rather than dividing by zero.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarGame {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub final_score: String,
    pub season: String,
    /// Cosine similarity, rounded to 3 decimals
    pub similarity_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarGamesResponse {
    /// True when the mock fallback set was served instead of a real ranking
    pub using_mock_data: bool,
    pub results: Vec<SimilarGame>,
}

/// Rank the corpus against the query and return the top `top_k` matches.
///
/// Corpus entries without exactly 20 vector entries are skipped silently.
/// The mock-fallback check deliberately runs on the raw corpus size before
/// that filtering, so a corpus of 10+ entries with few valid vectors may
/// return a short real ranking rather than mock data.
pub fn rank_similar_games(
    query: &[f64],
    corpus: &[GameFingerprint],
    top_k: usize,
) -> Result<SimilarGamesResponse, QueryError> {
    if query.len() != NUM_BUCKETS {
        return Err(QueryError::WrongLength(query.len()));
    }

    if corpus.len() < MIN_CORPUS_SIZE {
        return Ok(mock_results(top_k));
    }

    let mut results: Vec<SimilarGame> = corpus
        .iter()
        .filter(|game| game.momentum_vector.len() == NUM_BUCKETS)
        .map(|game| SimilarGame {
            game_id: game.game_id.clone(),
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            final_score: game.final_score.clone(),
            season: game.season.clone(),
            similarity_score: round3(cosine_similarity(query, &game.momentum_vector)),
        })
        .collect();

    // Stable sort: ties keep original corpus order
    results.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    results.truncate(top_k);

    Ok(SimilarGamesResponse {
        using_mock_data: false,
        results,
    })
}

/// Fixed placeholder results served while the corpus is cold
fn mock_results(top_k: usize) -> SimilarGamesResponse {
    let mut results = vec![
        SimilarGame {
            game_id: "mock_game_1".into(),
            home_team: "Bulls".into(),
            away_team: "Knicks".into(),
            final_score: "100-98".into(),
            season: "mock".into(),
            similarity_score: 0.942,
        },
        SimilarGame {
            game_id: "mock_game_2".into(),
            home_team: "Lakers".into(),
            away_team: "Celtics".into(),
            final_score: "114-110".into(),
            season: "mock".into(),
            similarity_score: 0.887,
        },
        SimilarGame {
            game_id: "mock_game_3".into(),
            home_team: "Warriors".into(),
            away_team: "Cavaliers".into(),
            final_score: "104-91".into(),
            season: "mock".into(),
            similarity_score: 0.811,
        },
    ];
    results.truncate(top_k);
    SimilarGamesResponse {
        using_mock_data: true,
        results,
    }
}
