//! Offline model fitting: sliding-window sample generation from stored
//! fingerprints plus a class-weighted logistic regression fit.

use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;
use tracing::info;

use super::{sigmoid, RunModel, FEATURE_LEN, WINDOW_LEN};
use crate::db::Database;

const FUTURE_LEN: usize = 3;
/// Forward average must cross this magnitude to count as a run
const RUN_THRESHOLD: f64 = 0.3;

/// One labeled sliding-window sample derived from a momentum vector.
/// Ephemeral: generated on demand, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub features: [f64; FEATURE_LEN],
    pub label: u8,
}

/// Generate labeled sliding-window samples from one momentum vector.
///
/// A "run" label requires both a magnitude condition (the forward 3-bucket
/// average crossing ±0.3) and trend continuation (moving further in that
/// direction than the current window average). The feature layout matches
/// the live predictor exactly: 5 window values + the absolute bucket index
/// of the window's last element.
pub fn training_samples(vector: &[f64]) -> Vec<TrainingSample> {
    let span = WINDOW_LEN + FUTURE_LEN;
    if vector.len() < span {
        return Vec::new();
    }

    let mut samples = Vec::with_capacity(vector.len() - span + 1);
    for i in 0..=vector.len() - span {
        let window = &vector[i..i + WINDOW_LEN];
        let future = &vector[i + WINDOW_LEN..i + span];

        let avg_window = window.iter().sum::<f64>() / WINDOW_LEN as f64;
        let avg_future = future.iter().sum::<f64>() / FUTURE_LEN as f64;

        let label = if (avg_future > RUN_THRESHOLD && avg_future > avg_window)
            || (avg_future < -RUN_THRESHOLD && avg_future < avg_window)
        {
            1
        } else {
            0
        };

        let mut features = [0.0f64; FEATURE_LEN];
        features[..WINDOW_LEN].copy_from_slice(window);
        features[WINDOW_LEN] = (i + WINDOW_LEN - 1) as f64;
        samples.push(TrainingSample { features, label });
    }
    samples
}

/// Held-out evaluation of a fitted model
#[derive(Debug, Clone, Copy)]
pub struct FitMetrics {
    pub train_samples: usize,
    pub test_samples: usize,
    pub positives: usize,
    pub accuracy: f64,
}

/// Fit a logistic regression on the samples by gradient descent.
///
/// Runs are rare, so positive samples are up-weighted by the class ratio
/// (the "balanced" scheme). Returns `None` when the data cannot support a
/// fit: too few samples or only one class present.
pub fn fit_run_model(
    samples: &[TrainingSample],
    max_iters: usize,
    learning_rate: f64,
) -> Option<RunModel> {
    if samples.len() < 8 {
        return None;
    }
    let positives = samples.iter().filter(|s| s.label == 1).count();
    if positives == 0 || positives == samples.len() {
        return None;
    }
    let pos_weight = (samples.len() - positives) as f64 / positives as f64;

    let n = samples.len() as f64;
    let mut weights = [0.0f64; FEATURE_LEN];
    let mut bias = 0.0f64;

    for iter in 0..max_iters.max(1) {
        let lr = learning_rate / (1.0 + 0.01 * iter as f64);
        let mut grad_w = [0.0f64; FEATURE_LEN];
        let mut grad_b = 0.0f64;

        for sample in samples {
            let z: f64 = weights
                .iter()
                .zip(sample.features.iter())
                .map(|(w, x)| w * x)
                .sum::<f64>()
                + bias;
            let p = sigmoid(z);
            let y = sample.label as f64;
            let class_weight = if sample.label == 1 { pos_weight } else { 1.0 };
            let err = (p - y) * class_weight;
            for (g, x) in grad_w.iter_mut().zip(sample.features.iter()) {
                *g += err * x;
            }
            grad_b += err;
        }

        for (w, g) in weights.iter_mut().zip(grad_w.iter()) {
            *w -= lr * g / n;
        }
        bias -= lr * grad_b / n;

        if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return None;
        }
    }

    Some(RunModel { weights, bias })
}

/// Generate samples from every stored 20-element vector, fit on an 80/20
/// shuffle split, report held-out accuracy, and write the model artifact.
pub fn train_from_store(db: &Database, model_path: &Path) -> Result<FitMetrics> {
    let vectors = db.list_training_vectors()?;
    if vectors.is_empty() {
        bail!("No stored fingerprints to train on. Run the data pipeline first.");
    }
    info!("Found {} games. Generating sliding window samples...", vectors.len());

    let mut samples: Vec<TrainingSample> = vectors
        .iter()
        .flat_map(|v| training_samples(v))
        .collect();
    if samples.is_empty() {
        bail!("Not enough valid vectors to generate samples.");
    }

    let positives = samples.iter().filter(|s| s.label == 1).count();
    info!(
        "Generated {} samples. Target runs: {} ({:.1}%)",
        samples.len(),
        positives,
        positives as f64 / samples.len() as f64 * 100.0
    );

    // Deterministic shuffle so repeated runs produce the same split
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    samples.shuffle(&mut rng);
    let split = (samples.len() as f64 * 0.8) as usize;
    let (train, test) = samples.split_at(split.max(1).min(samples.len() - 1));

    let model = match fit_run_model(train, 500, 0.1) {
        Some(m) => m,
        None => bail!("Training data is degenerate (single class or too few samples)."),
    };

    let correct = test
        .iter()
        .filter(|s| {
            let p = model.predict_proba(&s.features);
            (p > 0.5) == (s.label == 1)
        })
        .count();
    let accuracy = correct as f64 / test.len() as f64;
    info!("Held-out accuracy: {:.3} ({} test samples)", accuracy, test.len());

    model.save(model_path)?;
    info!("Model saved to {}", model_path.display());

    Ok(FitMetrics {
        train_samples: train.len(),
        test_samples: test.len(),
        positives,
        accuracy,
    })
}
