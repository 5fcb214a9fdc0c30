use crate::models::Hyperparameters;
use ndarray::{ArrayView1, ArrayViewMut1, Zip};

/// Regularized SGD step shared by full training and cold-start fitting.
///
/// Both procedures build it from the model's own [`Hyperparameters`], so they
/// always apply the same learning rate and regularization.
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    alpha: f64,
    beta: f64,
}

impl Sgd {
    pub fn new(hyper: &Hyperparameters) -> Self {
        Self {
            alpha: hyper.alpha,
            beta: hyper.beta,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.alpha
    }

    pub fn regularization(&self) -> f64 {
        self.beta
    }

    /// `b + alpha * (2e - beta * b)`
    #[inline]
    pub fn step_bias(&self, bias: f64, error: f64) -> f64 {
        bias + self.alpha * (2.0 * error - self.beta * bias)
    }

    /// `p_k += alpha * (2e * q_k - beta * p_k)` for every dimension.
    ///
    /// `partner` is read only; callers pass a pre-update copy when the partner
    /// row was itself modified earlier in the same step.
    #[inline]
    pub fn step_factors(&self, target: ArrayViewMut1<f64>, partner: ArrayView1<f64>, error: f64) {
        let (alpha, beta) = (self.alpha, self.beta);
        Zip::from(target)
            .and(partner)
            .for_each(|p, &q| *p += alpha * (2.0 * error * q - beta * *p));
    }
}
