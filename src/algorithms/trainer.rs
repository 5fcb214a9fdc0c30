//! Epoch-based SGD over a fixed observation set.

use super::{LatentFactorModel, Sgd};
use crate::error::{LatentRecError, Result};
use crate::models::{EpochRecord, Observation};
use crate::utils::{metrics, validation};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

pub struct Trainer<R> {
    rng: R,
}

impl<R: Rng> Trainer<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Lazily trains `model` for exactly `epochs` passes over `observations`.
    ///
    /// Input is validated up front; nothing is mutated until the first item is
    /// pulled. The returned sequence cannot be restarted: the model carries the
    /// effect of every epoch already consumed.
    pub fn epochs<'a>(
        &'a mut self,
        model: &'a mut LatentFactorModel,
        observations: &'a [Observation],
        epochs: usize,
    ) -> Result<Epochs<'a, R>> {
        if observations.is_empty() {
            return Err(LatentRecError::precondition(
                "cannot train on an empty observation set",
            ));
        }
        validation::validate_observations(observations, model.num_users(), model.num_items())?;

        Ok(Epochs {
            sgd: Sgd::new(model.hyperparameters()),
            model,
            observations,
            rng: &mut self.rng,
            order: (0..observations.len()).collect(),
            next_epoch: 0,
            total_epochs: epochs,
            failed: false,
        })
    }

    /// Runs every epoch and collects the per-epoch RMSE.
    pub fn train(
        &mut self,
        model: &mut LatentFactorModel,
        observations: &[Observation],
        epochs: usize,
    ) -> Result<Vec<EpochRecord>> {
        self.epochs(model, observations, epochs)?.collect()
    }
}

/// Iterator over training epochs. Yields `Err` once on divergence, then stops.
pub struct Epochs<'a, R> {
    model: &'a mut LatentFactorModel,
    observations: &'a [Observation],
    sgd: Sgd,
    rng: &'a mut R,
    order: Vec<usize>,
    next_epoch: usize,
    total_epochs: usize,
    failed: bool,
}

impl<R: Rng> Epochs<'_, R> {
    fn run_epoch(&mut self) -> Result<EpochRecord> {
        let epoch = self.next_epoch;
        self.next_epoch += 1;

        self.order.shuffle(&mut *self.rng);
        for &idx in &self.order {
            apply_observation(self.model, &self.sgd, &self.observations[idx]);
        }

        if !self.model.is_finite() {
            return Err(LatentRecError::degenerate(format!(
                "parameters became non-finite during epoch {} (learning rate {})",
                epoch,
                self.sgd.learning_rate()
            )));
        }

        let rmse = metrics::rmse(self.model, self.observations)?;
        debug!("Epoch {} finished with rmse {:.4}", epoch, rmse);
        Ok(EpochRecord { epoch, rmse })
    }
}

impl<R: Rng> Iterator for Epochs<'_, R> {
    type Item = Result<EpochRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next_epoch >= self.total_epochs {
            return None;
        }

        let record = self.run_epoch();
        if record.is_err() {
            self.failed = true;
        }
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let remaining = self.total_epochs - self.next_epoch;
        (0, Some(remaining))
    }
}

impl<R: Rng> std::iter::FusedIterator for Epochs<'_, R> {}

/// One SGD step for a single observation.
///
/// The item-factor update reads the user row as it was before this step.
fn apply_observation(model: &mut LatentFactorModel, sgd: &Sgd, obs: &Observation) {
    let Observation { user, item, rating } = *obs;
    let error = rating - model.score(user, item);

    model.user_bias[user] = sgd.step_bias(model.user_bias[user], error);
    model.item_bias[item] = sgd.step_bias(model.item_bias[item], error);

    let previous_user_row = model.user_factors.row(user).to_owned();
    sgd.step_factors(
        model.user_factors.row_mut(user),
        model.item_factors.row(item),
        error,
    );
    sgd.step_factors(
        model.item_factors.row_mut(item),
        previous_user_row.view(),
        error,
    );
}
