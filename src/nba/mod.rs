//! Upstream play-by-play retrieval from the NBA stats API.
//!
//! Lenient JSON handling throughout: records missing required fields are
//! skipped, not errored. Transient request failures retry with exponential
//! backoff before giving up on the game.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::db::models::{GameSummary, PlayEvent};

/// Trait that every play-by-play source must implement.
#[async_trait]
pub trait PlayByPlaySource: Send + Sync {
    /// Most recent completed games, newest first, deduplicated by game id.
    async fn fetch_recent_games(&self, max_games: usize) -> Result<Vec<GameSummary>>;

    /// Full ordered play stream plus the final score for one game.
    async fn fetch_game(&self, game_id: &str) -> Result<GamePlayByPlay>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct GamePlayByPlay {
    pub plays: Vec<PlayEvent>,
    /// "116-117" (home-away), or "Unknown" when scores are absent
    pub final_score: String,
}

/// Play-by-play source backed by the public stats.nba.com endpoints.
pub struct StatsApi {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
}

impl StatsApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(StatsApi {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET a JSON document with retry and exponential backoff. The stats
    /// API rejects requests without browser-like headers with a 403.
    async fn get_json(&self, url: &str, retries: u32, delay: Duration) -> Result<serde_json::Value> {
        let mut attempt = 0;
        loop {
            let result = self
                .http
                .get(url)
                .header(
                    "User-Agent",
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
                )
                .header("Accept", "application/json, text/plain, */*")
                .header("Referer", "https://www.nba.com/")
                .header("Origin", "https://www.nba.com")
                .send()
                .await;

            let err = match result {
                Ok(resp) if resp.status().is_success() => {
                    return resp.json().await.context("Failed to parse stats response");
                }
                Ok(resp) => anyhow::anyhow!("stats API error: {}", resp.status()),
                Err(e) => anyhow::Error::from(e),
            };

            if attempt >= retries {
                return Err(err);
            }
            let wait = delay * 2u32.pow(attempt);
            warn!("Attempt {} failed: {}. Retrying in {:?}...", attempt + 1, err, wait);
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl PlayByPlaySource for StatsApi {
    fn name(&self) -> &str {
        "stats.nba.com"
    }

    async fn fetch_recent_games(&self, max_games: usize) -> Result<Vec<GameSummary>> {
        let season = current_season_label(chrono::Utc::now().date_naive());
        let url = format!(
            "{}/leaguegamelog?Season={}&SeasonType=Regular+Season&LeagueID=00",
            self.base_url, season
        );
        debug!("Fetching game log from {}", url);
        let raw = self
            .get_json(&url, 2, Duration::from_secs(3))
            .await
            .context("game log request failed")?;
        Ok(parse_game_log(&raw, &season, max_games))
    }

    async fn fetch_game(&self, game_id: &str) -> Result<GamePlayByPlay> {
        let url = format!(
            "{}/playbyplayv3?GameID={}&StartPeriod=0&EndPeriod=14",
            self.base_url, game_id
        );
        debug!("Fetching play-by-play from {}", url);
        let raw = self
            .get_json(&url, 2, Duration::from_secs(2))
            .await
            .with_context(|| format!("play-by-play request failed for {}", game_id))?;
        Ok(parse_play_by_play(&raw))
    }
}

/// Season label for a given date, e.g. "2025-26" from August onward.
fn current_season_label(today: chrono::NaiveDate) -> String {
    use chrono::Datelike;
    let year = today.year();
    if today.month() >= 7 {
        format!("{}-{:02}", year, (year + 1) % 100)
    } else {
        format!("{}-{:02}", year - 1, year % 100)
    }
}

/// Parse the tabular game-log payload ({headers, rowSet}) into home-oriented
/// game summaries. The log has one row per team per game; the home row is
/// the one whose MATCHUP contains " vs. " (away rows use " @ ").
fn parse_game_log(raw: &serde_json::Value, season: &str, max_games: usize) -> Vec<GameSummary> {
    let result_set = &raw["resultSets"][0];
    let headers: Vec<&str> = match result_set["headers"].as_array() {
        Some(h) => h.iter().filter_map(|v| v.as_str()).collect(),
        None => return vec![],
    };
    let col = |name: &str| headers.iter().position(|h| *h == name);
    let (game_id_col, matchup_col, team_id_col, date_col) = match (
        col("GAME_ID"),
        col("MATCHUP"),
        col("TEAM_ID"),
        col("GAME_DATE"),
    ) {
        (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
        _ => return vec![],
    };

    let rows = match result_set["rowSet"].as_array() {
        Some(r) => r,
        None => return vec![],
    };

    let mut games: Vec<GameSummary> = rows
        .iter()
        .filter_map(|row| {
            let row = row.as_array()?;
            let matchup = row.get(matchup_col)?.as_str()?;
            // Home rows only
            let (home_team, away_team) = matchup.split_once(" vs. ")?;
            Some(GameSummary {
                game_id: json_string(row.get(game_id_col)?)?,
                season: season.to_string(),
                home_team: home_team.trim().to_string(),
                away_team: away_team.trim().to_string(),
                home_team_id: row.get(team_id_col)?.as_i64()?,
                game_date: json_string(row.get(date_col)?).unwrap_or_default(),
            })
        })
        .collect();

    games.sort_by(|a, b| b.game_date.cmp(&a.game_date));
    games.dedup_by(|a, b| a.game_id == b.game_id);
    games.truncate(max_games);
    games
}

/// Parse the playbyplayv3 payload into play events plus the final score.
fn parse_play_by_play(raw: &serde_json::Value) -> GamePlayByPlay {
    let actions = raw["game"]["actions"].as_array();
    let plays: Vec<PlayEvent> = actions
        .map(|list| {
            list.iter()
                .map(|action| PlayEvent {
                    period: action["period"].as_u64().unwrap_or(0) as u32,
                    clock: action["clock"].as_str().unwrap_or("").to_string(),
                    team_id: action["teamId"].as_i64(),
                    action_type: action["actionType"].as_str().map(str::to_string),
                    shot_result: action["shotResult"].as_str().map(str::to_string),
                    description: action["description"].as_str().map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default();

    // The last action carries the closing scoreline
    let final_score = actions
        .and_then(|list| list.last())
        .and_then(|last| {
            let home = json_number_string(&last["scoreHome"])?;
            let away = json_number_string(&last["scoreAway"])?;
            Some(format!("{}-{}", home, away))
        })
        .unwrap_or_else(|| "Unknown".to_string());

    GamePlayByPlay { plays, final_score }
}

/// Game IDs arrive either as strings or bare numbers depending on the feed
fn json_string(value: &serde_json::Value) -> Option<String> {
    value
        .as_str()
        .map(str::to_string)
        .or_else(|| value.as_i64().map(|n| n.to_string()))
}

fn json_number_string(value: &serde_json::Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| value.as_i64().map(|n| n.to_string()))
}
