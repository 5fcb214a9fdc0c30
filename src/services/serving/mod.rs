use crate::algorithms::LatentFactorModel;
use crate::error::{LatentRecError, Result};
use crate::models::{Recommendation, RecommendationRequest};
use crate::services::recommendation::RecommendationService;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared slot holding the currently published model.
///
/// Readers clone the inner `Arc` and keep using that snapshot even if a newer
/// model is published meanwhile; a published model is never mutated.
#[derive(Debug, Clone, Default)]
pub struct ModelHandle {
    slot: Arc<RwLock<Option<Arc<LatentFactorModel>>>>,
}

impl ModelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: LatentFactorModel) -> Self {
        let handle = Self::new();
        handle.publish(Arc::new(model));
        handle
    }

    /// Replaces the published model in one step.
    pub fn publish(&self, model: Arc<LatentFactorModel>) {
        info!(
            "Publishing model with {} users x {} items (k = {})",
            model.num_users(),
            model.num_items(),
            model.hyperparameters().k
        );
        *self.slot.write() = Some(model);
    }

    pub fn current(&self) -> Option<Arc<LatentFactorModel>> {
        self.slot.read().clone()
    }
}

/// Answers recommendation requests against whatever model is published.
pub struct ServingService {
    handle: ModelHandle,
    recommendation_service: Arc<RecommendationService>,
    serving_stats: Arc<DashMap<String, u64>>,
}

impl ServingService {
    pub fn new(handle: ModelHandle, recommendation_service: Arc<RecommendationService>) -> Self {
        Self {
            handle,
            recommendation_service,
            serving_stats: Arc::new(DashMap::new()),
        }
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    pub fn serve(&self, request: &RecommendationRequest, n: usize) -> Result<Recommendation> {
        self.increment_stat("total_requests");
        let model = self.current_model()?;
        let start_time = Instant::now();

        match self.recommendation_service.recommend(&model, request, n) {
            Ok(response) => {
                self.increment_stat("successful_requests");
                info!(
                    "Served {} recommendations for request {} in {}ms",
                    response.items.len(),
                    request.request_id,
                    start_time.elapsed().as_millis()
                );
                Ok(response)
            }
            Err(e) => {
                self.increment_stat("failed_requests");
                error!("Failed to serve request {}: {}", request.request_id, e);
                Err(e)
            }
        }
    }

    pub fn serve_batch(
        &self,
        requests: &[RecommendationRequest],
        n: usize,
    ) -> Result<Vec<Result<Recommendation>>> {
        self.increment_stat("batch_requests");
        let model = self.current_model()?;
        let responses = self.recommendation_service.recommend_batch(&model, requests, n);

        let failed = responses.iter().filter(|r| r.is_err()).count() as u64;
        self.add_stat("total_requests", requests.len() as u64);
        self.add_stat("successful_requests", requests.len() as u64 - failed);
        self.add_stat("failed_requests", failed);
        Ok(responses)
    }

    pub fn get_serving_stats(&self) -> HashMap<String, u64> {
        self.serving_stats
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    fn current_model(&self) -> Result<Arc<LatentFactorModel>> {
        self.handle
            .current()
            .ok_or_else(|| LatentRecError::precondition("no trained model has been published"))
    }

    fn increment_stat(&self, key: &str) {
        self.add_stat(key, 1);
    }

    fn add_stat(&self, key: &str, amount: u64) {
        *self.serving_stats.entry(key.to_string()).or_insert(0) += amount;
    }
}
