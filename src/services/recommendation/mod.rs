use crate::algorithms::{initializer, ColdStartInferencer, ColdStartOutcome, ColdStartParams, LatentFactorModel};
use crate::config::Config;
use crate::error::Result;
use crate::models::{NewUserRating, Recommendation, RecommendationRequest};
use crate::utils::{self, validation};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns a new user's raw ratings into a ranked list of unseen items.
pub struct RecommendationService {
    config: Arc<Config>,
    pool: rayon::ThreadPool,
}

impl RecommendationService {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.serving.workers)
            .thread_name(|i| format!("latentrec-cold-start-{}", i))
            .build()?;

        Ok(Self { config, pool })
    }

    pub fn cold_start_params(&self) -> ColdStartParams {
        ColdStartParams {
            max_iterations: self.config.cold_start.max_iterations,
            rmse_threshold: self.config.cold_start.rmse_threshold,
        }
    }

    /// Full per-item prediction vector for ratings given on the raw scale.
    pub fn predict_scores(
        &self,
        model: &LatentFactorModel,
        raw_ratings: &[NewUserRating],
    ) -> Result<ColdStartOutcome> {
        let duplicates = validation::duplicate_items(raw_ratings);
        if !duplicates.is_empty() {
            warn!("Items rated more than once, keeping the last rating: {:?}", duplicates);
        }

        let ratings = utils::rescale_ratings(
            &utils::dedup_ratings(raw_ratings),
            self.config.cold_start.rating_scale,
        );

        let mut rng = initializer::rng_from_seed(self.config.cold_start.seed);
        ColdStartInferencer::new(model, self.cold_start_params()).infer(&ratings, &mut rng)
    }

    /// Top `n` items the user has not rated, best first.
    pub fn recommend(
        &self,
        model: &LatentFactorModel,
        request: &RecommendationRequest,
        n: usize,
    ) -> Result<Recommendation> {
        let outcome = self.predict_scores(model, &request.ratings)?;

        let rated: HashSet<usize> = request.ratings.iter().map(|r| r.item).collect();
        let items = utils::top_n_unseen(&outcome.predictions.to_vec(), &rated, n);

        debug!(
            "Request {}: {} ratings, {} cold-start iterations, {} items returned",
            request.request_id,
            request.ratings.len(),
            outcome.history.len(),
            items.len()
        );

        Ok(Recommendation {
            request_id: request.request_id,
            items,
            history: outcome.history,
            generated_at: Utc::now(),
        })
    }

    /// Runs every request in parallel against the same frozen model.
    pub fn recommend_batch(
        &self,
        model: &LatentFactorModel,
        requests: &[RecommendationRequest],
        n: usize,
    ) -> Vec<Result<Recommendation>> {
        self.pool.install(|| {
            requests
                .par_iter()
                .map(|request| self.recommend(model, request, n))
                .collect()
        })
    }
}
