use crate::error::{LatentRecError, Result};
use crate::models::Observation;
use crate::utils::validation;
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;

/// Observed cells of a dense rating matrix. `0` cells are unobserved.
#[derive(Debug, Clone)]
pub struct RatingStore {
    num_users: usize,
    num_items: usize,
    observations: Vec<Observation>,
}

impl RatingStore {
    /// Collects every non-zero cell in row-major order.
    pub fn from_matrix(matrix: &Array2<f64>) -> Result<Self> {
        validation::validate_rating_matrix(matrix)?;

        let (num_users, num_items) = matrix.dim();
        let observations = matrix
            .indexed_iter()
            .filter(|(_, &rating)| rating != 0.0)
            .map(|((user, item), &rating)| Observation::new(user, item, rating))
            .collect();

        Ok(Self {
            num_users,
            num_items,
            observations,
        })
    }

    pub fn from_observations(
        num_users: usize,
        num_items: usize,
        observations: Vec<Observation>,
    ) -> Result<Self> {
        validation::validate_observations(&observations, num_users, num_items)?;
        Ok(Self {
            num_users,
            num_items,
            observations,
        })
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn num_users(&self) -> usize {
        self.num_users
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Fraction of cells that carry a rating.
    pub fn density(&self) -> f64 {
        let cells = self.num_users * self.num_items;
        if cells == 0 {
            0.0
        } else {
            self.observations.len() as f64 / cells as f64
        }
    }

    pub fn mean_rating(&self) -> Result<f64> {
        if self.observations.is_empty() {
            return Err(LatentRecError::precondition(
                "cannot compute the mean rating of an empty observation set",
            ));
        }
        let total: f64 = self.observations.iter().map(|obs| obs.rating).sum();
        Ok(total / self.observations.len() as f64)
    }

    /// A fresh uniformly random visiting order. The stored order is untouched.
    pub fn shuffled_order<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.observations.len()).collect();
        order.shuffle(rng);
        order
    }
}
