pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use algorithms::{ColdStartInferencer, ColdStartOutcome, ColdStartParams, LatentFactorModel, RatingStore, Trainer};
pub use config::Config;
pub use error::{LatentRecError, Result};
pub use models::*;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub model_handle: services::serving::ModelHandle,
    pub model_store: Arc<services::storage::ModelStore>,
    pub training_service: Arc<services::training::TrainingService>,
    pub recommendation_service: Arc<services::recommendation::RecommendationService>,
    pub serving_service: Arc<services::serving::ServingService>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let model_handle = services::serving::ModelHandle::new();

        let model_store = Arc::new(
            services::storage::ModelStore::new(config.storage.model_dir.clone())
                .with_full_matrix(config.storage.write_full_matrix),
        );

        let training_service = Arc::new(services::training::TrainingService::new(config.clone()));

        let recommendation_service = Arc::new(
            services::recommendation::RecommendationService::new(config.clone())?
        );

        let serving_service = Arc::new(services::serving::ServingService::new(
            model_handle.clone(),
            recommendation_service.clone(),
        ));

        Ok(Self {
            config,
            model_handle,
            model_store,
            training_service,
            recommendation_service,
            serving_service,
        })
    }

    /// Loads the persisted model, if any, and publishes it.
    pub fn restore_model(&self) -> Result<Option<PersistedModel>> {
        if !self.model_store.exists() {
            return Ok(None);
        }
        let (persisted, model) = self.model_store.load()?;
        self.model_handle.publish(Arc::new(model));
        Ok(Some(persisted))
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
