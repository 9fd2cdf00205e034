use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gdd_gateway::model_registry::ModelRegistry;
use gdd_gateway::server;
use gdd_gateway::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration before tracing so the configured level applies
    let config = gdd_core::Config::load()?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.settings.logging.level.clone().into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Configuration loaded (default models: {})",
        config.default_model_chain().join(" -> ")
    );

    let db_path = config.settings.database_path()?;
    let db = gdd_db::GddDbPool::open(&db_path).await?;
    info!("Section database ready at {}", db_path.display());

    let registry = Arc::new(ModelRegistry::from_config(&config));
    let available = registry
        .list_models()
        .into_iter()
        .filter(|model| model.available)
        .count();
    if available == 0 {
        warn!("No provider API key configured; AI endpoints will fail until one is set");
    } else {
        info!("{} models available", available);
    }

    let state = Arc::new(AppState::new(&config, registry, db.clone()));
    let bind_addr = config.bind_addr();
    let result = server::run(state, &bind_addr).await;

    db.close().await;
    result
}
