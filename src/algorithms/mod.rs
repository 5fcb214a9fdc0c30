pub mod cold_start;
pub mod initializer;
pub mod optimizer;
pub mod ratings;
pub mod trainer;

pub use cold_start::{ColdStartInferencer, ColdStartOutcome, ColdStartParams, NewUserState};
pub use optimizer::Sgd;
pub use ratings::RatingStore;
pub use trainer::{Epochs, Trainer};

use crate::error::{LatentRecError, Result};
use crate::models::{Hyperparameters, ModelSnapshot};
use crate::utils::validation;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;

/// Biased low-rank rating model.
///
/// `predict(u, i) = global_bias + user_bias[u] + item_bias[i] + <user_factors[u], item_factors[i]>`,
/// unclamped.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentFactorModel {
    hyper: Hyperparameters,
    pub(crate) global_bias: f64,
    pub(crate) user_bias: Array1<f64>,
    pub(crate) item_bias: Array1<f64>,
    pub(crate) user_factors: Array2<f64>,
    pub(crate) item_factors: Array2<f64>,
}

impl LatentFactorModel {
    /// Zero biases, Gaussian factors with standard deviation `1/k`.
    pub fn initialize<R: Rng + ?Sized>(
        hyper: Hyperparameters,
        num_users: usize,
        num_items: usize,
        global_bias: f64,
        rng: &mut R,
    ) -> Result<Self> {
        hyper.validate()?;
        if !global_bias.is_finite() {
            return Err(LatentRecError::precondition("global bias must be finite"));
        }

        Ok(Self {
            hyper,
            global_bias,
            user_bias: Array1::zeros(num_users),
            item_bias: Array1::zeros(num_items),
            user_factors: initializer::factor_matrix(rng, num_users, hyper.k),
            item_factors: initializer::factor_matrix(rng, num_items, hyper.k),
        })
    }

    /// Initializes with the store's dimensions and its mean rating as global bias.
    pub fn from_ratings<R: Rng + ?Sized>(
        hyper: Hyperparameters,
        store: &RatingStore,
        rng: &mut R,
    ) -> Result<Self> {
        let global_bias = store.mean_rating()?;
        Self::initialize(hyper, store.num_users(), store.num_items(), global_bias, rng)
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyper
    }

    pub fn num_users(&self) -> usize {
        self.user_factors.nrows()
    }

    pub fn num_items(&self) -> usize {
        self.item_factors.nrows()
    }

    pub fn global_bias(&self) -> f64 {
        self.global_bias
    }

    pub fn user_bias(&self) -> ArrayView1<'_, f64> {
        self.user_bias.view()
    }

    pub fn item_bias(&self) -> ArrayView1<'_, f64> {
        self.item_bias.view()
    }

    pub fn user_factors(&self) -> ArrayView2<'_, f64> {
        self.user_factors.view()
    }

    pub fn item_factors(&self) -> ArrayView2<'_, f64> {
        self.item_factors.view()
    }

    pub fn predict(&self, user: usize, item: usize) -> Result<f64> {
        validation::validate_index("user", user, self.num_users())?;
        validation::validate_index("item", item, self.num_items())?;
        Ok(self.score(user, item))
    }

    /// Prediction for every cell, observed or not.
    pub fn reconstruct(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.num_users(), self.num_items()), |(user, item)| {
            self.score(user, item)
        })
    }

    /// Prediction without bounds checks; indices must already be validated.
    #[inline]
    pub(crate) fn score(&self, user: usize, item: usize) -> f64 {
        self.global_bias
            + self.user_bias[user]
            + self.item_bias[item]
            + self.user_factors.row(user).dot(&self.item_factors.row(item))
    }

    pub fn is_finite(&self) -> bool {
        self.global_bias.is_finite()
            && self.user_bias.iter().all(|v| v.is_finite())
            && self.item_bias.iter().all(|v| v.is_finite())
            && self.user_factors.iter().all(|v| v.is_finite())
            && self.item_factors.iter().all(|v| v.is_finite())
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            k: self.hyper.k,
            alpha: self.hyper.alpha,
            beta: self.hyper.beta,
            global_bias: self.global_bias,
            user_bias: self.user_bias.to_vec(),
            item_bias: self.item_bias.to_vec(),
            user_factors: self.user_factors.outer_iter().map(|row| row.to_vec()).collect(),
            item_factors: self.item_factors.outer_iter().map(|row| row.to_vec()).collect(),
        }
    }

    pub fn from_snapshot(snapshot: ModelSnapshot) -> Result<Self> {
        validation::validate_snapshot(&snapshot)?;

        let k = snapshot.k;
        let user_factors = rows_to_matrix(snapshot.user_factors, k)?;
        let item_factors = rows_to_matrix(snapshot.item_factors, k)?;

        Ok(Self {
            hyper: Hyperparameters::new(k, snapshot.alpha, snapshot.beta),
            global_bias: snapshot.global_bias,
            user_bias: Array1::from_vec(snapshot.user_bias),
            item_bias: Array1::from_vec(snapshot.item_bias),
            user_factors,
            item_factors,
        })
    }
}

fn rows_to_matrix(rows: Vec<Vec<f64>>, k: usize) -> Result<Array2<f64>> {
    let n = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n, k), flat)
        .map_err(|e| LatentRecError::precondition(format!("factor matrix shape: {}", e)))
}
