//! Train a diagnostic model on synthetic data and run one sample diagnosis.
//!
//! Respects TRIAGYX_CONFIG / triagyx.toml; with no config the bundle lands
//! in ./models.

use tracing::info;
use tracing_subscriber::EnvFilter;

use triagyx_engine::{EngineConfig, TriageEngine};

const TRAINING_ROWS: usize = 2000;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::load()?;
    let engine = TriageEngine::new(config)?;

    info!(rows = TRAINING_ROWS, "training on synthetic data");
    engine.train_synthetic(TRAINING_ROWS)?;

    // age, temperature, cough, fatigue, body ache, aqi, humidity, ambient.
    let sample = [45.0, 39.2, 8.0, 6.0, 4.0, 180.0, 65.0, 28.0];
    let result = engine.diagnose(&sample)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    let attribution = engine.explain_diagnosis(&sample)?;
    println!("{}", serde_json::to_string_pretty(&attribution)?);

    Ok(())
}
