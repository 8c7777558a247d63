//! Aggregates per-play scores into a 20-element momentum fingerprint.
//!
//! Raw bucket totals are converted to a running cumulative sum — bucket *i*
//! answers "who has the advantage through this point in the game", not
//! "what happened in this interval" — then normalized so the strongest
//! swing sits at exactly ±1.

use crate::db::models::{PlayEvent, NUM_BUCKETS};
use crate::fingerprint::bucket::{bucket_index, parse_clock};
use crate::fingerprint::scoring::event_score;

/// Compute the normalized cumulative momentum vector for a full game.
///
/// Plays with an unknown period or unparseable clock are dropped silently;
/// aggregation is commutative per bucket, so play order does not matter.
pub fn compute_momentum_vector(plays: &[PlayEvent], home_team_id: i64) -> Vec<f64> {
    let mut raw = [0.0f64; NUM_BUCKETS];

    for play in plays {
        if play.period == 0 {
            continue;
        }
        let remaining = match parse_clock(&play.clock) {
            Some(secs) => secs,
            None => continue,
        };
        let idx = bucket_index(play.period, remaining);
        raw[idx] += event_score(play, home_team_id);
    }

    // Rolling cumulative sum
    let mut cumulative = [0.0f64; NUM_BUCKETS];
    let mut running = 0.0;
    for i in 0..NUM_BUCKETS {
        running += raw[i];
        cumulative[i] = running;
    }

    // Normalize to [-1, 1]; an all-zero signal divides by 1.0 instead
    let mut max_abs = cumulative.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if max_abs == 0.0 {
        max_abs = 1.0;
    }

    cumulative.iter().map(|v| round3(v / max_abs)).collect()
}

/// An all-zero vector means the game had no usable team-attributable plays.
/// Such fingerprints are rejected by the pipeline, never stored.
pub fn is_degenerate(vector: &[f64]) -> bool {
    vector.iter().all(|v| *v == 0.0)
}

/// Round to 3 decimal places (canonical precision for stored vectors and
/// similarity scores).
pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
