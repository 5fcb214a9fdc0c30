use crate::error::{LatentRecError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hyperparameters fixed for the lifetime of a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Latent dimensionality.
    pub k: usize,
    /// Learning rate.
    pub alpha: f64,
    /// Regularization strength.
    pub beta: f64,
}

impl Hyperparameters {
    pub fn new(k: usize, alpha: f64, beta: f64) -> Self {
        Self { k, alpha, beta }
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(LatentRecError::precondition("latent dimensionality must be at least 1"));
        }
        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return Err(LatentRecError::precondition(format!(
                "learning rate must be positive and finite, got {}",
                self.alpha
            )));
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(LatentRecError::precondition(format!(
                "regularization must be non-negative and finite, got {}",
                self.beta
            )));
        }
        Ok(())
    }
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self::new(34, 0.02, 0.02)
    }
}

/// An observed rating cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub user: usize,
    pub item: usize,
    pub rating: f64,
}

impl Observation {
    pub fn new(user: usize, item: usize, rating: f64) -> Self {
        Self { user, item, rating }
    }
}

/// Error after one training epoch or one cold-start iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub rmse: f64,
}

/// A rating supplied by a user who is not part of the trained model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewUserRating {
    pub item: usize,
    pub rating: f64,
}

impl NewUserRating {
    pub fn new(item: usize, rating: f64) -> Self {
        Self { item, rating }
    }
}

impl From<(usize, f64)> for NewUserRating {
    fn from((item, rating): (usize, f64)) -> Self {
        Self { item, rating }
    }
}

/// Full trained state in plain vectors. Biases are flat, one entry per user/item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub k: usize,
    pub alpha: f64,
    pub beta: f64,
    pub global_bias: f64,
    pub user_bias: Vec<f64>,
    pub item_bias: Vec<f64>,
    pub user_factors: Vec<Vec<f64>>,
    pub item_factors: Vec<Vec<f64>>,
}

impl ModelSnapshot {
    pub fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters::new(self.k, self.alpha, self.beta)
    }
}

/// On-disk envelope around a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedModel {
    pub model_id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub epochs_trained: usize,
    pub final_rmse: Option<f64>,
    pub snapshot: ModelSnapshot,
}

impl PersistedModel {
    pub fn new(snapshot: ModelSnapshot) -> Self {
        Self {
            model_id: Uuid::new_v4(),
            saved_at: Utc::now(),
            epochs_trained: 0,
            final_rmse: None,
            snapshot,
        }
    }

    pub fn with_training_history(mut self, history: &[EpochRecord]) -> Self {
        self.epochs_trained = history.len();
        self.final_rmse = history.last().map(|record| record.rmse);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item: usize,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub request_id: Uuid,
    /// Ratings on the caller's raw scale.
    pub ratings: Vec<NewUserRating>,
}

impl RecommendationRequest {
    pub fn new(ratings: Vec<NewUserRating>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            ratings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub request_id: Uuid,
    pub items: Vec<ScoredItem>,
    pub history: Vec<EpochRecord>,
    pub generated_at: DateTime<Utc>,
}
