//! Fits a factor vector and bias for a user outside the trained model.
//!
//! The trained model is only borrowed immutably, so any number of fits can run
//! against the same model at once. Each fit owns its [`NewUserState`] and
//! drops it once the prediction vector is produced.

use super::{initializer, LatentFactorModel, Sgd};
use crate::error::{LatentRecError, Result};
use crate::models::{EpochRecord, NewUserRating};
use crate::utils::{metrics, validation};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColdStartParams {
    pub max_iterations: usize,
    /// Fitting stops as soon as the RMSE drops below this value.
    pub rmse_threshold: f64,
}

impl Default for ColdStartParams {
    fn default() -> Self {
        Self {
            max_iterations: 40,
            rmse_threshold: 0.7,
        }
    }
}

/// Ephemeral parameters of the user being fitted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserState {
    pub bias: f64,
    pub factors: Array1<f64>,
}

impl NewUserState {
    pub fn initialize<R: Rng + ?Sized>(k: usize, rng: &mut R) -> Self {
        Self {
            bias: 0.0,
            factors: initializer::factor_vector(rng, k),
        }
    }

    #[inline]
    fn score(&self, model: &LatentFactorModel, item: usize) -> f64 {
        model.global_bias
            + self.bias
            + model.item_bias[item]
            + self.factors.dot(&model.item_factors.row(item))
    }

    fn step(&mut self, model: &LatentFactorModel, sgd: &Sgd, rating: &NewUserRating) {
        let error = rating.rating - self.score(model, rating.item);
        self.bias = sgd.step_bias(self.bias, error);
        sgd.step_factors(self.factors.view_mut(), model.item_factors.row(rating.item), error);
    }

    /// Predicted rating for every item in the model.
    pub fn predict_all(&self, model: &LatentFactorModel) -> Array1<f64> {
        Array1::from_shape_fn(model.num_items(), |item| self.score(model, item))
    }
}

#[derive(Debug, Clone)]
pub struct ColdStartOutcome {
    /// One predicted rating per item in the model, rated items included.
    pub predictions: Array1<f64>,
    pub history: Vec<EpochRecord>,
    pub converged: bool,
}

pub struct ColdStartInferencer<'m> {
    model: &'m LatentFactorModel,
    sgd: Sgd,
    params: ColdStartParams,
}

impl<'m> ColdStartInferencer<'m> {
    pub fn new(model: &'m LatentFactorModel, params: ColdStartParams) -> Self {
        Self {
            model,
            sgd: Sgd::new(model.hyperparameters()),
            params,
        }
    }

    pub fn params(&self) -> &ColdStartParams {
        &self.params
    }

    /// `ratings` must already be on the model's training scale.
    pub fn infer<R: Rng + ?Sized>(
        &self,
        ratings: &[NewUserRating],
        rng: &mut R,
    ) -> Result<ColdStartOutcome> {
        if self.params.max_iterations == 0 {
            return Err(LatentRecError::precondition(
                "cold-start iteration budget must be at least 1",
            ));
        }
        if !self.params.rmse_threshold.is_finite() {
            return Err(LatentRecError::precondition("RMSE threshold must be finite"));
        }
        validation::validate_new_user_ratings(ratings, self.model.num_items())?;

        let model = self.model;
        let mut state = NewUserState::initialize(model.hyperparameters().k, rng);
        let mut order = ratings.to_vec();
        let mut history = Vec::new();
        let mut converged = false;

        for iteration in 0..self.params.max_iterations {
            order.shuffle(rng);
            for rating in &order {
                state.step(model, &self.sgd, rating);
            }

            let rmse = metrics::rmse_from_pairs(
                ratings
                    .iter()
                    .map(|r| (r.rating, state.score(model, r.item))),
            )?;
            history.push(EpochRecord {
                epoch: iteration,
                rmse,
            });

            if rmse < self.params.rmse_threshold {
                converged = true;
                break;
            }
        }

        debug!(
            "Cold-start fit on {} ratings finished after {} iterations (converged: {})",
            ratings.len(),
            history.len(),
            converged
        );

        Ok(ColdStartOutcome {
            predictions: state.predict_all(model),
            history,
            converged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{RatingStore, Trainer};
    use crate::models::Hyperparameters;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn trained_model() -> LatentFactorModel {
        let matrix = array![
            [5.0, 3.0, 0.0, 1.0],
            [4.0, 0.0, 0.0, 1.0],
            [1.0, 1.0, 0.0, 5.0],
            [1.0, 0.0, 0.0, 4.0],
            [0.0, 1.0, 5.0, 4.0],
        ];
        let store = RatingStore::from_matrix(&matrix).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let mut model =
            LatentFactorModel::from_ratings(Hyperparameters::new(3, 0.02, 0.02), &store, &mut rng)
                .unwrap();
        Trainer::new(StdRng::seed_from_u64(22))
            .train(&mut model, store.observations(), 30)
            .unwrap();
        model
    }

    #[test]
    fn test_prediction_vector_covers_every_item() {
        let model = trained_model();
        let inferencer = ColdStartInferencer::new(&model, ColdStartParams::default());
        let ratings = [NewUserRating::new(0, 4.5), NewUserRating::new(3, 1.0)];

        let outcome = inferencer.infer(&ratings, &mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(outcome.predictions.len(), 4);
        assert!(!outcome.history.is_empty());
        assert!(outcome.history.len() <= 40);
        assert!(outcome.predictions.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_stops_early_below_threshold() {
        let model = trained_model();
        let params = ColdStartParams {
            max_iterations: 40,
            rmse_threshold: 10.0,
        };
        let outcome = ColdStartInferencer::new(&model, params)
            .infer(&[NewUserRating::new(1, 3.0)], &mut StdRng::seed_from_u64(2))
            .unwrap();

        assert!(outcome.converged);
        assert_eq!(outcome.history.len(), 1);
    }

    #[test]
    fn test_exhausts_budget_when_threshold_unreachable() {
        let model = trained_model();
        let params = ColdStartParams {
            max_iterations: 5,
            rmse_threshold: 0.0,
        };
        let outcome = ColdStartInferencer::new(&model, params)
            .infer(
                &[NewUserRating::new(0, 5.0), NewUserRating::new(2, 0.5)],
                &mut StdRng::seed_from_u64(3),
            )
            .unwrap();

        assert!(!outcome.converged);
        assert_eq!(outcome.history.len(), 5);
        assert!(outcome.history.iter().enumerate().all(|(i, r)| r.epoch == i));
    }

    #[test]
    fn test_fit_moves_toward_given_ratings() {
        // orthogonal item factors make the two ratings separable
        let model = LatentFactorModel::from_snapshot(crate::models::ModelSnapshot {
            k: 2,
            alpha: 0.05,
            beta: 0.01,
            global_bias: 3.0,
            user_bias: vec![0.0],
            item_bias: vec![0.0, 0.0, 0.0],
            user_factors: vec![vec![0.0, 0.0]],
            item_factors: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]],
        })
        .unwrap();
        let params = ColdStartParams {
            max_iterations: 200,
            rmse_threshold: 0.05,
        };
        let ratings = [NewUserRating::new(0, 5.0), NewUserRating::new(1, 1.0)];
        let outcome = ColdStartInferencer::new(&model, params)
            .infer(&ratings, &mut StdRng::seed_from_u64(4))
            .unwrap();

        assert!(outcome.converged);
        assert!((outcome.predictions[0] - 5.0).abs() < 0.2);
        assert!((outcome.predictions[1] - 1.0).abs() < 0.2);
        assert!(outcome.predictions[0] > outcome.predictions[2]);
        assert!(outcome.predictions[2] > outcome.predictions[1]);
    }

    #[test]
    fn test_out_of_range_item_rejected_without_mutation() {
        let model = trained_model();
        let before = model.clone();
        let inferencer = ColdStartInferencer::new(&model, ColdStartParams::default());

        let err = inferencer
            .infer(
                &[NewUserRating::new(0, 3.0), NewUserRating::new(4, 2.0)],
                &mut StdRng::seed_from_u64(5),
            )
            .unwrap_err();

        assert!(err.is_precondition());
        assert_eq!(model, before);
    }

    #[test]
    fn test_empty_ratings_rejected() {
        let model = trained_model();
        let inferencer = ColdStartInferencer::new(&model, ColdStartParams::default());
        assert!(inferencer
            .infer(&[], &mut StdRng::seed_from_u64(6))
            .unwrap_err()
            .is_precondition());
    }

    #[test]
    fn test_frozen_model_is_untouched_by_inference() {
        let model = trained_model();
        let before = model.clone();
        ColdStartInferencer::new(&model, ColdStartParams::default())
            .infer(&[NewUserRating::new(2, 4.0)], &mut StdRng::seed_from_u64(7))
            .unwrap();
        assert_eq!(model, before);
    }
}
