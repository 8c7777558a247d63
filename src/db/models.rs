use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of time buckets in a momentum vector.
pub const NUM_BUCKETS: usize = 20;

/// A single play from the upstream play-by-play feed.
///
/// Plays are read-only inputs: the pipeline classifies and aggregates them
/// but never mutates them. Fields mirror the loosely-typed upstream JSON, so
/// everything except `period` is optional or free-form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayEvent {
    /// Period number: 1–4 regulation, 5+ overtime. 0 means unknown.
    pub period: u32,
    /// Remaining game clock within the period, in one of several wire
    /// encodings ("PT11M22.00S", "11:22", or plain seconds).
    pub clock: String,
    /// Acting team, if the play is attributable to one. `None` or 0 marks a
    /// non-team event (period start, official timeout, ...).
    pub team_id: Option<i64>,
    /// Structured action classification, e.g. "3pt", "turnover", "steal".
    pub action_type: Option<String>,
    /// "made" | "missed" for shot attempts.
    pub shot_result: Option<String>,
    /// Free-text play description, used as a fallback classification tier.
    pub description: Option<String>,
}

/// A stored per-game momentum fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameFingerprint {
    /// Upstream game ID (unique key)
    pub game_id: String,
    pub season: String,
    pub home_team: String,
    pub away_team: String,
    /// e.g. "116-117", or "Unknown" when the boxscore was unavailable
    pub final_score: String,
    /// 20 cumulative normalized momentum values in [-1, 1]
    pub momentum_vector: Vec<f64>,
    /// Free-form extras (game date, mock-data markers, ...)
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// One game row from the upstream game log, resolved to home/away.
#[derive(Debug, Clone)]
pub struct GameSummary {
    pub game_id: String,
    pub season: String,
    pub home_team: String,
    pub away_team: String,
    /// Upstream ID of the home team, needed to orient momentum direction
    pub home_team_id: i64,
    pub game_date: String,
}
