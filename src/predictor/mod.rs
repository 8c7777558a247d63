//! Run prediction: maps a recent momentum window through a trained logistic
//! classifier and turns the probability into a qualitative signal.
//!
//! The model is an opaque "6 floats in, P(run) out" capability loaded once
//! at startup into a read-only handle. Its absence is a normal, handled
//! condition: the predictor always returns a well-formed result and never
//! propagates an inference failure to its caller.

pub mod training;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::db::models::NUM_BUCKETS;
use crate::fingerprint::builder::round3;

/// Momentum values per feature window
pub const WINDOW_LEN: usize = 5;
/// Window values + progress index
pub const FEATURE_LEN: usize = WINDOW_LEN + 1;

/// Trained binary classifier: logistic regression over the 6-feature input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunModel {
    pub weights: [f64; FEATURE_LEN],
    pub bias: f64,
}

impl RunModel {
    /// Load the model artifact from disk. A missing file is a normal
    /// condition (`Ok(None)`); a present-but-unreadable file is an error.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file {}", path.display()))?;
        let model: RunModel = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse model file {}", path.display()))?;
        Ok(Some(model))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write model file {}", path.display()))?;
        Ok(())
    }

    /// P(run) for a 6-feature input
    pub fn predict_proba(&self, features: &[f64; FEATURE_LEN]) -> f64 {
        let z: f64 = self
            .weights
            .iter()
            .zip(features.iter())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        sigmoid(z)
    }
}

/// Numerically stable logistic sigmoid
pub(crate) fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Reserved for the degraded path (model missing or inference failed)
    Low,
    Medium,
    High,
}

/// The predictor's response shape. Computed fresh per request.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    /// P(run), rounded to 3 decimals
    pub run_probability: f64,
    pub confidence: Confidence,
    pub message: String,
}

/// Map a live momentum/score-differential scalar (domain roughly
/// [-100, 100]) onto a bucket index in [0, 19], standing in for the true
/// game-progress position when the caller only has a live scalar.
pub fn estimate_bucket_index(score_diff: f64) -> usize {
    let idx = ((score_diff + 100.0) / 200.0 * (NUM_BUCKETS - 1) as f64).round();
    idx.clamp(0.0, (NUM_BUCKETS - 1) as f64) as usize
}

/// Build the 6-feature vector: the window left-padded with zeros to 5 (or
/// truncated to the most recent 5) plus the estimated bucket index.
pub fn build_features(momentum_window: &[f64], score_diff: f64) -> [f64; FEATURE_LEN] {
    let mut features = [0.0f64; FEATURE_LEN];
    let take = momentum_window.len().min(WINDOW_LEN);
    let src = &momentum_window[momentum_window.len() - take..];
    features[WINDOW_LEN - take..WINDOW_LEN].copy_from_slice(src);
    features[WINDOW_LEN] = estimate_bucket_index(score_diff) as f64;
    features
}

/// Predict whether a momentum run is imminent.
///
/// Degraded paths: no model loaded → neutral 0.5 / low; inference producing
/// a non-finite probability → 0.0 / low. Both return normally.
pub fn predict_run(
    model: Option<&RunModel>,
    momentum_window: &[f64],
    score_diff: f64,
) -> PredictionResult {
    let model = match model {
        Some(m) => m,
        None => {
            return PredictionResult {
                run_probability: 0.5,
                confidence: Confidence::Low,
                message: "(Mock) Run Predictor Offline".into(),
            }
        }
    };

    let features = build_features(momentum_window, score_diff);
    let prob_run = model.predict_proba(&features);
    if !prob_run.is_finite() {
        warn!("Run model produced a non-finite probability; returning fallback");
        return PredictionResult {
            run_probability: 0.0,
            confidence: Confidence::Low,
            message: "Error calculating prediction.".into(),
        };
    }

    let confidence = if prob_run > 0.75 || prob_run < 0.25 {
        Confidence::High
    } else {
        Confidence::Medium
    };

    // Direction comes from the latest momentum value in the padded window
    let last_momentum = features[WINDOW_LEN - 1];
    let message = if prob_run > 0.6 {
        if last_momentum > 0.1 {
            "Home team showing signs of a momentum run."
        } else if last_momentum < -0.1 {
            "Away team showing signs of a momentum run."
        } else {
            "Game flow indicating a potential breakout."
        }
    } else {
        "Game flow looks stable."
    };

    PredictionResult {
        run_probability: round3(prob_run),
        confidence,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// A model that predicts purely from the last window value, steeply.
    fn direction_model(scale: f64) -> RunModel {
        RunModel {
            weights: [0.0, 0.0, 0.0, 0.0, scale, 0.0],
            bias: 0.0,
        }
    }

    #[test]
    fn feature_vector_concrete_scenario() {
        // round(((50+100)/200)*19) = round(14.25) = 14
        let f = build_features(&[0.1, 0.2, 0.3, 0.4, 0.5], 50.0);
        assert_eq!(f, [0.1, 0.2, 0.3, 0.4, 0.5, 14.0]);
    }

    #[test]
    fn bucket_estimate_clamps_to_range() {
        assert_eq!(estimate_bucket_index(-100.0), 0);
        assert_eq!(estimate_bucket_index(-250.0), 0);
        assert_eq!(estimate_bucket_index(0.0), 10);
        assert_eq!(estimate_bucket_index(100.0), 19);
        assert_eq!(estimate_bucket_index(500.0), 19);
    }

    #[test]
    fn short_window_left_pads_with_zeros() {
        let f = build_features(&[0.7, 0.9], 0.0);
        assert_eq!(f, [0.0, 0.0, 0.0, 0.7, 0.9, 10.0]);
    }

    #[test]
    fn long_window_keeps_most_recent_five() {
        let f = build_features(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7], 0.0);
        assert_eq!(f, [0.3, 0.4, 0.5, 0.6, 0.7, 10.0]);
    }

    #[test]
    fn missing_model_returns_offline_fallback() {
        let result = predict_run(None, &[0.1, 0.2], 0.0);
        assert_relative_eq!(result.run_probability, 0.5);
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result.message.contains("Offline"));
    }

    #[test]
    fn non_finite_inference_returns_error_fallback() {
        let broken = RunModel {
            weights: [f64::NAN; FEATURE_LEN],
            bias: 0.0,
        };
        let result = predict_run(Some(&broken), &[0.5; 5], 0.0);
        assert_relative_eq!(result.run_probability, 0.0);
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn high_confidence_outside_probability_band() {
        let model = direction_model(50.0);
        let up = predict_run(Some(&model), &[0.0, 0.0, 0.0, 0.0, 0.9], 0.0);
        assert!(up.run_probability > 0.75);
        assert_eq!(up.confidence, Confidence::High);

        let down = predict_run(Some(&model), &[0.0, 0.0, 0.0, 0.0, -0.9], 0.0);
        assert!(down.run_probability < 0.25);
        assert_eq!(down.confidence, Confidence::High);
    }

    #[test]
    fn medium_confidence_inside_band() {
        let model = direction_model(1.0);
        let result = predict_run(Some(&model), &[0.0, 0.0, 0.0, 0.0, 0.2], 0.0);
        assert!(result.run_probability > 0.25 && result.run_probability < 0.75);
        assert_eq!(result.confidence, Confidence::Medium);
    }

    #[test]
    fn run_messages_follow_last_momentum_direction() {
        let model = direction_model(50.0);
        let home = predict_run(Some(&model), &[0.0, 0.0, 0.0, 0.0, 0.9], 0.0);
        assert!(home.message.contains("Home team"));

        // Last value barely positive but probability forced high via bias
        let biased = RunModel {
            weights: [0.0; FEATURE_LEN],
            bias: 3.0,
        };
        let breakout = predict_run(Some(&biased), &[0.0, 0.0, 0.0, 0.0, 0.05], 0.0);
        assert!(breakout.message.contains("breakout"));

        let away_model = direction_model(-50.0);
        let away = predict_run(Some(&away_model), &[0.0, 0.0, 0.0, 0.0, -0.9], 0.0);
        // -50 * -0.9 = 45 -> P ~ 1, last momentum -0.9 -> away run
        assert!(away.message.contains("Away team"));
    }

    #[test]
    fn low_probability_reports_stable_game() {
        let model = RunModel {
            weights: [0.0; FEATURE_LEN],
            bias: -2.0,
        };
        let result = predict_run(Some(&model), &[0.9; 5], 0.0);
        assert!(result.run_probability <= 0.6);
        assert_eq!(result.message, "Game flow looks stable.");
    }

    #[test]
    fn model_save_load_roundtrip() {
        let dir = std::env::temp_dir().join("momentum-shift-model-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("run_predictor.json");

        let model = RunModel {
            weights: [0.1, -0.2, 0.3, -0.4, 0.5, 0.01],
            bias: -0.25,
        };
        model.save(&path).unwrap();
        let loaded = RunModel::load(&path).unwrap().unwrap();
        assert_eq!(loaded.weights, model.weights);
        assert_relative_eq!(loaded.bias, model.bias);

        let missing = RunModel::load(&dir.join("nope.json")).unwrap();
        assert!(missing.is_none());
        std::fs::remove_file(&path).ok();
    }
}
