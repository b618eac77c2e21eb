//! Worker entry point
//!
//! Wires the job store, the queue broker and the stage catalog together and
//! hands them to the consumer loop.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use splatforge_core::domain::pipeline::PipelineDefinition;
use splatforge_dispatch::{RedisScheduler, RetryPolicy, TaskScheduler};
use splatforge_store::{JobStore, PgJobStore};
use splatforge_worker::config::Config;
use splatforge_worker::consumer::ChainConsumer;
use splatforge_worker::executor::StageExecutor;
use splatforge_worker::stages::StageRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "splatforge_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Splatforge Worker");

    // Load configuration
    let config = load_config()?;
    info!(
        "Loaded configuration: worker_id={}, pools={:?}",
        config.worker_id, config.pools
    );

    // Per-job working files live under the data dir
    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .context("Failed to create data directory")?;

    // Connect to the shared job store
    let store = PgJobStore::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    store
        .run_migrations()
        .await
        .context("Failed to run database migrations")?;
    let store: Arc<dyn JobStore> = Arc::new(store);

    info!("Job store initialized");

    // Connect to the queue broker (with retry logic)
    let scheduler = RedisScheduler::connect(&config.redis_url, RetryPolicy::default())
        .await
        .context("Failed to connect to queue broker")?;
    let scheduler: Arc<dyn TaskScheduler> = Arc::new(scheduler);

    info!("Queue broker connection established");

    // Register stage handlers
    let registry = StageRegistry::standard();
    info!("Registered {} stage handlers", registry.len());

    let executor = StageExecutor::new(
        Arc::clone(&store),
        registry,
        PipelineDefinition::standard(),
        config.data_dir.clone(),
    );

    let consumer = ChainConsumer::new(config, scheduler, executor);

    info!("Worker initialized successfully");

    // Start consuming chains
    consumer.run().await;

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(_) => {
            info!("Failed to load config from environment, using defaults");
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}
