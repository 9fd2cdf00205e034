//! Shared application state for the HTTP server.

use std::sync::Arc;

use gdd_core::Config;
use gdd_db::GddDbPool;

use crate::enhancement::EnhancementService;
use crate::generation::GenerationService;
use crate::model_registry::ModelRegistry;

pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub generation: GenerationService,
    pub enhancement: EnhancementService,
    pub cors_allowed_origins: Vec<String>,
    db: GddDbPool,
}

impl AppState {
    pub fn new(config: &Config, registry: Arc<ModelRegistry>, db: GddDbPool) -> Self {
        let generation_settings = config.settings.generation.clone();
        Self {
            generation: GenerationService::new(Arc::clone(&registry), generation_settings.clone()),
            enhancement: EnhancementService::new(Arc::clone(&registry), generation_settings),
            registry,
            cors_allowed_origins: config.settings.gateway.cors_allowed_origins.clone(),
            db,
        }
    }

    pub fn db(&self) -> &GddDbPool {
        &self.db
    }
}
