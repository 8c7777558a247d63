use clap::Parser;

/// NBA momentum fingerprinting backend
#[derive(Parser, Debug, Clone)]
#[command(name = "momentum-shift", version, about)]
pub struct Config {
    /// API listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen_addr: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "momentum.db")]
    pub database_path: String,

    /// Run-predictor model artifact path
    #[arg(long, env = "MODEL_PATH", default_value = "run_predictor.json")]
    pub model_path: String,

    /// NBA stats API base URL
    #[arg(long, env = "STATS_API_URL", default_value = "https://stats.nba.com/stats")]
    pub stats_api_url: String,

    /// Maximum number of recent games to ingest per run
    #[arg(long, env = "MAX_GAMES", default_value = "50")]
    pub max_games: usize,

    /// Seed the demo fingerprint corpus and exit
    #[arg(long)]
    pub seed: bool,

    /// Ingest recent games from the stats API and exit
    #[arg(long)]
    pub ingest: bool,

    /// Train the run predictor from stored fingerprints and exit
    #[arg(long)]
    pub train: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_games == 0 {
            anyhow::bail!("max_games must be at least 1");
        }
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            anyhow::bail!("listen_addr '{}' is not a valid socket address", self.listen_addr);
        }
        let one_shot = [self.seed, self.ingest, self.train];
        if one_shot.iter().filter(|f| **f).count() > 1 {
            anyhow::bail!("--seed, --ingest and --train are mutually exclusive");
        }
        Ok(())
    }
}
