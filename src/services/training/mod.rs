use crate::algorithms::{initializer, LatentFactorModel, RatingStore, Trainer};
use crate::config::Config;
use crate::error::Result;
use crate::models::EpochRecord;
use crate::services::serving::ModelHandle;
use crate::utils::metrics::{self, ErrorMetrics};
use crate::utils::validation;
use ndarray::Array2;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model: Arc<LatentFactorModel>,
    pub history: Vec<EpochRecord>,
    pub metrics: ErrorMetrics,
    pub elapsed: Duration,
}

impl TrainingReport {
    pub fn final_rmse(&self) -> Option<f64> {
        self.history.last().map(|record| record.rmse)
    }
}

/// Trains brand-new models from dense rating matrices.
pub struct TrainingService {
    config: Arc<Config>,
}

impl TrainingService {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn fit(&self, matrix: &Array2<f64>) -> Result<TrainingReport> {
        let start_time = Instant::now();
        let store = RatingStore::from_matrix(matrix)?;

        info!(
            "Training on {} observations ({} users x {} items, density {:.4})",
            store.len(),
            store.num_users(),
            store.num_items(),
            store.density()
        );

        let hyper = self.config.model.hyperparameters();
        let mut rng = initializer::rng_from_seed(self.config.training.seed);
        let mut model = LatentFactorModel::from_ratings(hyper, &store, &mut rng)?;

        let epochs = self.config.training.epochs;
        let log_every = self.config.training.log_every;
        let mut trainer = Trainer::new(rng);
        let mut history = Vec::with_capacity(epochs);

        for record in trainer.epochs(&mut model, store.observations(), epochs)? {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!("Training aborted after {} epochs: {}", history.len(), e);
                    return Err(e);
                }
            };

            if log_every > 0 && (record.epoch + 1) % log_every == 0 {
                info!("Epoch: {} ; error = {:.4}", record.epoch + 1, record.rmse);
            } else {
                debug!("Epoch: {} ; error = {:.4}", record.epoch + 1, record.rmse);
            }
            history.push(record);
        }

        let metrics = metrics::evaluate(&model, store.observations())?;
        let elapsed = start_time.elapsed();
        info!(
            "Training finished in {:?}: rmse {:.4}, mae {:.4}",
            elapsed, metrics.rmse, metrics.mae
        );

        Ok(TrainingReport {
            model: Arc::new(model),
            history,
            metrics,
            elapsed,
        })
    }

    /// Trains a fresh model and swaps it into `handle` only once training succeeded.
    pub fn fit_and_publish(&self, matrix: &Array2<f64>, handle: &ModelHandle) -> Result<TrainingReport> {
        let report = self.fit(matrix)?;
        handle.publish(report.model.clone());
        Ok(report)
    }

    /// Error of an existing model against a rating matrix of the same shape.
    pub fn evaluate(&self, model: &LatentFactorModel, matrix: &Array2<f64>) -> Result<ErrorMetrics> {
        validation::validate_matrix_matches_model(matrix, model.num_users(), model.num_items())?;
        let store = RatingStore::from_matrix(matrix)?;
        metrics::evaluate(model, store.observations())
    }
}
