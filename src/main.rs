use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod config;
mod db;
mod fingerprint;
mod nba;
mod pipeline;
mod predictor;
mod similarity;

use api::AppState;
use config::Config;
use db::Database;
use nba::StatsApi;
use predictor::RunModel;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    // One-shot tasks run and exit
    if config.seed {
        let inserted = pipeline::seed_mock_games(&db)?;
        info!("Seeded {} mock fingerprints", inserted);
        return Ok(());
    }
    if config.ingest {
        let source = StatsApi::new(&config.stats_api_url)?;
        pipeline::ingest_games(&source, &db, config.max_games).await?;
        return Ok(());
    }
    if config.train {
        let metrics = predictor::training::train_from_store(&db, Path::new(&config.model_path))?;
        info!(
            "Training finished: {} train / {} test samples ({} runs), accuracy {:.3}",
            metrics.train_samples, metrics.test_samples, metrics.positives, metrics.accuracy
        );
        return Ok(());
    }

    // Serve the API. The model is loaded once into read-only state; its
    // absence means the predictor serves fallback results.
    let model = match RunModel::load(Path::new(&config.model_path)) {
        Ok(Some(m)) => {
            info!("Run predictor model loaded from {}", config.model_path);
            Some(m)
        }
        Ok(None) => {
            warn!(
                "Run predictor model not found at {}; API will return mock predictions",
                config.model_path
            );
            None
        }
        Err(e) => {
            warn!("Failed to load run predictor model: {}; using fallback", e);
            None
        }
    };

    let corpus_size = db.count_fingerprints().unwrap_or(0);
    info!("Fingerprint corpus size: {}", corpus_size);

    let state = AppState {
        db,
        model: Arc::new(model),
    };
    let app = api::router(state);
    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
