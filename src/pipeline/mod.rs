//! Historical ingestion: turn completed games into stored fingerprints.
//!
//! Also hosts the mock seeder used to demo the API before any real games
//! have been ingested.

use anyhow::Result;
use chrono::Utc;
use rand::Rng;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

use crate::db::models::{GameFingerprint, NUM_BUCKETS};
use crate::db::Database;
use crate::fingerprint::{compute_momentum_vector, is_degenerate};
use crate::nba::PlayByPlaySource;

/// Games with fewer plays than this are treated as incomplete feeds
const MIN_PLAYS: usize = 20;
/// Pause between upstream game fetches (rate limiting)
const FETCH_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Fetch recent games from the source and store a fingerprint for each one
/// not already in the database. Per-game failures are counted and logged;
/// they never abort the run.
pub async fn ingest_games(
    source: &dyn PlayByPlaySource,
    db: &Database,
    max_games: usize,
) -> Result<IngestStats> {
    let games = source.fetch_recent_games(max_games).await?;
    let total = games.len();
    info!("Found {} unique games to process from {}", total, source.name());

    let mut stats = IngestStats::default();
    for (idx, game) in games.iter().enumerate() {
        let progress = format!("[{}/{}]", idx + 1, total);

        match db.has_game(&game.game_id) {
            Ok(true) => {
                info!("{} {} vs {} — already stored, skipping", progress, game.home_team, game.away_team);
                stats.skipped += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("{} DB check failed for {}: {}", progress, game.game_id, e);
                stats.failed += 1;
                continue;
            }
        }

        info!("{} Processing {} vs {} ({})...", progress, game.home_team, game.away_team, game.game_date);
        tokio::time::sleep(FETCH_PAUSE).await;

        let pbp = match source.fetch_game(&game.game_id).await {
            Ok(p) => p,
            Err(e) => {
                warn!("{} Failed to fetch play-by-play: {}", progress, e);
                stats.failed += 1;
                continue;
            }
        };
        if pbp.plays.len() < MIN_PLAYS {
            warn!("{} Only {} plays found (too few), skipping", progress, pbp.plays.len());
            stats.failed += 1;
            continue;
        }

        let momentum_vector = compute_momentum_vector(&pbp.plays, game.home_team_id);
        if is_degenerate(&momentum_vector) {
            warn!("{} Momentum vector is all zeros, skipping", progress);
            stats.failed += 1;
            continue;
        }

        let record = GameFingerprint {
            game_id: game.game_id.clone(),
            season: game.season.clone(),
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            final_score: pbp.final_score.clone(),
            momentum_vector,
            metadata: json!({ "game_date": game.game_date }),
            created_at: Utc::now(),
        };
        match db.insert_fingerprint(&record) {
            Ok(()) => {
                info!("{} Stored. Score: {}", progress, record.final_score);
                stats.processed += 1;
            }
            Err(e) => {
                warn!("{} Failed to insert: {}", progress, e);
                stats.failed += 1;
            }
        }
    }

    info!(
        "Ingestion complete: processed={} skipped={} failed={}",
        stats.processed, stats.skipped, stats.failed
    );
    Ok(stats)
}

// ── Mock seeding ──────────────────────────────────────────────────────────────

/// Shape of a seeded random-walk vector
#[derive(Debug, Clone, Copy)]
enum Trend {
    Balanced,
    HomeBlowout,
    AwayBlowout,
    ComebackHome,
}

const MOCK_GAMES: &[(&str, &str, &str, Trend)] = &[
    ("Celtics", "Heat", "118-104", Trend::HomeBlowout),
    ("Lakers", "Nuggets", "105-114", Trend::AwayBlowout),
    ("Warriors", "Suns", "122-119", Trend::ComebackHome),
    ("Bucks", "76ers", "110-108", Trend::Balanced),
    ("Knicks", "Pacers", "130-101", Trend::HomeBlowout),
    ("Mavericks", "Clippers", "98-105", Trend::Balanced),
    ("Timberwolves", "Thunder", "112-115", Trend::Balanced),
    ("Cavaliers", "Magic", "104-103", Trend::ComebackHome),
    ("Pelicans", "Kings", "125-100", Trend::HomeBlowout),
    ("Bulls", "Hawks", "120-118", Trend::Balanced),
    ("Heat", "Celtics", "95-120", Trend::AwayBlowout),
    ("Suns", "Timberwolves", "116-122", Trend::Balanced),
    ("Pacers", "Knicks", "121-89", Trend::HomeBlowout),
    ("Nuggets", "Lakers", "108-106", Trend::Balanced),
    ("Thunder", "Mavericks", "111-120", Trend::AwayBlowout),
];

/// Generate a realistic-looking momentum vector as a capped random walk
fn generate_trend_vector<R: Rng>(rng: &mut R, trend: Trend) -> Vec<f64> {
    let mut vector = Vec::with_capacity(NUM_BUCKETS);
    vector.push(0.0);
    let mut current = 0.0f64;

    for step_idx in 1..NUM_BUCKETS {
        let step = match trend {
            Trend::Balanced => rng.gen_range(-0.3..0.3),
            Trend::HomeBlowout => rng.gen_range(0.0..0.3),
            Trend::AwayBlowout => rng.gen_range(-0.3..0.0),
            Trend::ComebackHome => {
                // Away starts strong, home finishes strong
                if step_idx < 10 {
                    rng.gen_range(-0.3..0.1)
                } else {
                    rng.gen_range(0.0..0.4)
                }
            }
        };
        current = (current + step).clamp(-1.0, 1.0);
        vector.push((current * 1000.0).round() / 1000.0);
    }
    vector
}

/// Seed a demo corpus of mock fingerprints, skipping ids already stored.
/// Returns the number of newly-inserted games.
pub fn seed_mock_games(db: &Database) -> Result<usize> {
    let mut rng = rand::thread_rng();
    let mut inserted = 0;

    for (i, (home, away, score, trend)) in MOCK_GAMES.iter().enumerate() {
        let game_id = format!("mock_{}", 1000 + i);
        if db.has_game(&game_id)? {
            info!("Game {} already exists, skipping", game_id);
            continue;
        }

        let record = GameFingerprint {
            game_id,
            season: "2023-24".into(),
            home_team: (*home).into(),
            away_team: (*away).into(),
            final_score: (*score).into(),
            momentum_vector: generate_trend_vector(&mut rng, *trend),
            metadata: json!({ "mock_data": true, "trend": format!("{:?}", trend) }),
            created_at: Utc::now(),
        };
        db.insert_fingerprint(&record)?;
        info!("Inserted {} vs {}", home, away);
        inserted += 1;
    }

    info!("Done. Inserted {} new mock games.", inserted);
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nba::GamePlayByPlay;
    use crate::db::models::{GameSummary, PlayEvent};
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct FakeSource {
        games: Vec<GameSummary>,
        plays: Vec<PlayEvent>,
        fail_pbp: bool,
    }

    #[async_trait]
    impl PlayByPlaySource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch_recent_games(&self, max_games: usize) -> anyhow::Result<Vec<GameSummary>> {
            Ok(self.games.iter().take(max_games).cloned().collect())
        }

        async fn fetch_game(&self, _game_id: &str) -> anyhow::Result<GamePlayByPlay> {
            if self.fail_pbp {
                return Err(anyhow!("upstream down"));
            }
            Ok(GamePlayByPlay {
                plays: self.plays.clone(),
                final_score: "101-99".into(),
            })
        }
    }

    fn summary(game_id: &str) -> GameSummary {
        GameSummary {
            game_id: game_id.into(),
            season: "2024-25".into(),
            home_team: "Bulls".into(),
            away_team: "Knicks".into(),
            home_team_id: 100,
            game_date: "2025-01-15".into(),
        }
    }

    fn scoring_plays() -> Vec<PlayEvent> {
        (0..25u32)
            .map(|i| PlayEvent {
                period: 1 + (i % 4),
                clock: "PT06M00.00S".into(),
                team_id: Some(if i % 3 == 0 { 200 } else { 100 }),
                action_type: Some("2pt".into()),
                shot_result: Some("made".into()),
                description: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn ingest_stores_new_games_and_skips_existing() {
        let db = Database::open(":memory:").unwrap();
        let source = FakeSource {
            games: vec![summary("g1"), summary("g2")],
            plays: scoring_plays(),
            fail_pbp: false,
        };

        let stats = ingest_games(&source, &db, 50).await.unwrap();
        assert_eq!(stats.processed, 2);
        assert_eq!(db.count_fingerprints().unwrap(), 2);

        // Second run skips everything
        let stats = ingest_games(&source, &db, 50).await.unwrap();
        assert_eq!(stats.processed, 0);
        assert_eq!(stats.skipped, 2);
    }

    #[tokio::test]
    async fn ingest_counts_upstream_failures_without_aborting() {
        let db = Database::open(":memory:").unwrap();
        let source = FakeSource {
            games: vec![summary("g1")],
            plays: vec![],
            fail_pbp: true,
        };
        let stats = ingest_games(&source, &db, 50).await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(db.count_fingerprints().unwrap(), 0);
    }

    #[tokio::test]
    async fn ingest_rejects_degenerate_fingerprints() {
        let db = Database::open(":memory:").unwrap();
        // Enough plays, but none team-attributable: all-zero vector
        let plays: Vec<PlayEvent> = (0..25)
            .map(|_| PlayEvent {
                period: 1,
                clock: "PT06M00.00S".into(),
                team_id: None,
                action_type: None,
                shot_result: None,
                description: Some("timeout".into()),
            })
            .collect();
        let source = FakeSource {
            games: vec![summary("g1")],
            plays,
            fail_pbp: false,
        };
        let stats = ingest_games(&source, &db, 50).await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(db.count_fingerprints().unwrap(), 0);
    }

    #[test]
    fn seeded_vectors_are_valid_fingerprints() {
        let mut rng = rand::thread_rng();
        for trend in [
            Trend::Balanced,
            Trend::HomeBlowout,
            Trend::AwayBlowout,
            Trend::ComebackHome,
        ] {
            let v = generate_trend_vector(&mut rng, trend);
            assert_eq!(v.len(), NUM_BUCKETS);
            assert!(v.iter().all(|x| (-1.0..=1.0).contains(x)));
        }
    }

    #[test]
    fn seeding_is_idempotent() {
        let db = Database::open(":memory:").unwrap();
        assert_eq!(seed_mock_games(&db).unwrap(), MOCK_GAMES.len());
        assert_eq!(seed_mock_games(&db).unwrap(), 0);
        assert_eq!(db.count_fingerprints().unwrap() as usize, MOCK_GAMES.len());
    }
}
