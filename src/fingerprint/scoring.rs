//! Assigns a signed momentum weight to a single play.
//!
//! Home plays push the signal positive, away plays negative. Magnitudes are
//! additive: one play can match several rules (a made fast-break dunk scores
//! 2.0 + 1.0 + 1.5). Structured fields (`action_type`, `shot_result`) are
//! the primary classification tier; free-text substring matching on the
//! description is a fallback for heterogeneous upstream data shapes.

use crate::db::models::PlayEvent;

/// Signed momentum contribution of one play from the home team's
/// perspective. Returns 0.0 when the acting team cannot be determined; such
/// plays must not be counted toward any bucket.
pub fn event_score(play: &PlayEvent, home_team_id: i64) -> f64 {
    let team_id = match play.team_id {
        Some(id) if id != 0 => id,
        _ => return 0.0,
    };
    let multiplier = if team_id == home_team_id { 1.0 } else { -1.0 };

    let action_type = lower(&play.action_type);
    let shot_result = lower(&play.shot_result);
    let description = lower(&play.description);

    let mut score = 0.0;

    // Made shots, by structured shot type
    if shot_result == "made" {
        score += match action_type.as_str() {
            "3pt" => 3.0,
            "2pt" => 2.0,
            "freethrow" => 1.0,
            _ => 0.0,
        };
    }

    // Turnovers kill momentum
    if action_type == "turnover" || description.contains("turnover") {
        score -= 2.0;
    }

    // Blocks and steals (high momentum impact)
    if action_type.contains("block") || description.contains("block") {
        score += 1.5;
    }
    if action_type.contains("steal") || description.contains("steal") {
        score += 1.5;
    }

    // Dunks (free-text only — upstream has no structured dunk flag)
    if description.contains("dunk") {
        score += 1.0;
    }

    // Fast breaks
    if description.contains("fast break") {
        score += 1.5;
    }

    score * multiplier
}

fn lower(field: &Option<String>) -> String {
    field.as_deref().unwrap_or("").to_lowercase()
}
