use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::warn;

pub mod models;
use models::{GameFingerprint, NUM_BUCKETS};

/// Thread-safe SQLite handle (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path.
    /// Pass ":memory:" for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Fingerprints ──────────────────────────────────────────────────────────

    /// Insert a fully-populated fingerprint. Fails on duplicate game_id; the
    /// pipeline checks `has_game` first, so a conflict here is a real error.
    pub fn insert_fingerprint(&self, fp: &GameFingerprint) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO game_fingerprints (
                game_id, season, home_team, away_team, final_score,
                momentum_vector, metadata, created_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                fp.game_id,
                fp.season,
                fp.home_team,
                fp.away_team,
                fp.final_score,
                serde_json::to_string(&fp.momentum_vector)?,
                serde_json::to_string(&fp.metadata)?,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    /// Whether a fingerprint for this game is already stored
    pub fn has_game(&self, game_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM game_fingerprints WHERE game_id = ?1",
            params![game_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    /// Total stored fingerprints
    pub fn count_fingerprints(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM game_fingerprints", [], |r| r.get(0))?;
        Ok(count)
    }

    /// List every stored fingerprint, oldest first (insertion order).
    ///
    /// Rows whose JSON columns fail to parse are dropped with a warning
    /// rather than failing the whole corpus fetch.
    pub fn list_fingerprints(&self) -> Result<Vec<GameFingerprint>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT game_id, season, home_team, away_team, final_score,
                    momentum_vector, metadata, created_at
             FROM game_fingerprints ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, chrono::DateTime<Utc>>(7)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let fingerprints = rows
            .into_iter()
            .filter_map(
                |(game_id, season, home_team, away_team, final_score, vec_json, meta_json, created_at)| {
                    let momentum_vector: Vec<f64> = match serde_json::from_str(&vec_json) {
                        Ok(v) => v,
                        Err(e) => {
                            warn!("Dropping fingerprint {}: bad vector JSON: {}", game_id, e);
                            return None;
                        }
                    };
                    let metadata =
                        serde_json::from_str(&meta_json).unwrap_or(serde_json::Value::Null);
                    Some(GameFingerprint {
                        game_id,
                        season,
                        home_team,
                        away_team,
                        final_score,
                        momentum_vector,
                        metadata,
                        created_at,
                    })
                },
            )
            .collect();
        Ok(fingerprints)
    }

    /// List only fingerprints carrying a full 20-element vector, for training.
    pub fn list_training_vectors(&self) -> Result<Vec<Vec<f64>>> {
        let vectors = self
            .list_fingerprints()?
            .into_iter()
            .map(|fp| fp.momentum_vector)
            .filter(|v| v.len() == NUM_BUCKETS)
            .collect();
        Ok(vectors)
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS game_fingerprints (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id         TEXT    NOT NULL UNIQUE,
    season          TEXT    NOT NULL,
    home_team       TEXT    NOT NULL,
    away_team       TEXT    NOT NULL,
    final_score     TEXT    NOT NULL DEFAULT 'Unknown',
    momentum_vector TEXT    NOT NULL,
    metadata        TEXT    NOT NULL DEFAULT 'null',
    created_at      TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_fingerprints_game ON game_fingerprints(game_id);
"#;
