use crate::algorithms::LatentFactorModel;
use crate::error::{LatentRecError, Result};
use crate::models::Observation;
use serde::{Deserialize, Serialize};

/// Error summary of a model over a set of observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub count: usize,
}

/// Root-mean-square error of the model's predictions over `observations`.
pub fn rmse(model: &LatentFactorModel, observations: &[Observation]) -> Result<f64> {
    rmse_from_pairs(predicted_pairs(model, observations)?)
}

pub fn mae(model: &LatentFactorModel, observations: &[Observation]) -> Result<f64> {
    Ok(evaluate(model, observations)?.mae)
}

pub fn evaluate(model: &LatentFactorModel, observations: &[Observation]) -> Result<ErrorMetrics> {
    let pairs = predicted_pairs(model, observations)?;
    let count = pairs.len();
    let abs_total: f64 = pairs.iter().map(|(actual, predicted)| (actual - predicted).abs()).sum();
    let rmse = rmse_from_pairs(pairs)?;

    Ok(ErrorMetrics {
        rmse,
        mae: abs_total / count as f64,
        count,
    })
}

/// RMSE over `(actual, predicted)` pairs. Empty input or a non-finite result is degenerate.
pub fn rmse_from_pairs<I>(pairs: I) -> Result<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (sum_sq, n) = pairs
        .into_iter()
        .fold((0.0f64, 0usize), |(sum, n), (actual, predicted)| {
            let diff = actual - predicted;
            (sum + diff * diff, n + 1)
        });

    if n == 0 {
        return Err(LatentRecError::degenerate("RMSE over zero observations"));
    }

    let value = (sum_sq / n as f64).sqrt();
    if !value.is_finite() {
        return Err(LatentRecError::degenerate(format!(
            "RMSE is not finite over {} observations",
            n
        )));
    }
    Ok(value)
}

fn predicted_pairs(
    model: &LatentFactorModel,
    observations: &[Observation],
) -> Result<Vec<(f64, f64)>> {
    if observations.is_empty() {
        return Err(LatentRecError::degenerate("RMSE over zero observations"));
    }

    observations
        .iter()
        .map(|obs| model.predict(obs.user, obs.item).map(|predicted| (obs.rating, predicted)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelSnapshot;

    fn exact_model() -> LatentFactorModel {
        // predict(u, i) = 2 + u_bias + i_bias + <p_u, q_i>
        LatentFactorModel::from_snapshot(ModelSnapshot {
            k: 1,
            alpha: 0.1,
            beta: 0.01,
            global_bias: 2.0,
            user_bias: vec![0.5, -0.5],
            item_bias: vec![1.0, 0.0],
            user_factors: vec![vec![1.0], vec![2.0]],
            item_factors: vec![vec![0.5], vec![1.0]],
        })
        .unwrap()
    }

    #[test]
    fn test_rmse_zero_for_exact_predictions() {
        let model = exact_model();
        let observations = vec![
            Observation::new(0, 0, 4.0),
            Observation::new(1, 1, 3.5),
            Observation::new(0, 1, 3.5),
        ];
        assert_eq!(rmse(&model, &observations).unwrap(), 0.0);
    }

    #[test]
    fn test_rmse_and_mae_values() {
        let model = exact_model();
        // errors: +1.0 and -1.0
        let observations = vec![Observation::new(0, 0, 5.0), Observation::new(1, 1, 2.5)];
        assert!((rmse(&model, &observations).unwrap() - 1.0).abs() < 1e-12);
        assert!((mae(&model, &observations).unwrap() - 1.0).abs() < 1e-12);

        let metrics = evaluate(&model, &observations).unwrap();
        assert_eq!(metrics.count, 2);
        assert!(metrics.rmse >= 0.0);
    }

    #[test]
    fn test_empty_set_is_degenerate() {
        let model = exact_model();
        assert!(rmse(&model, &[]).unwrap_err().is_degenerate());
        assert!(rmse_from_pairs(Vec::new()).unwrap_err().is_degenerate());
    }

    #[test]
    fn test_out_of_range_observation_is_precondition() {
        let model = exact_model();
        let err = rmse(&model, &[Observation::new(5, 0, 3.0)]).unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn test_non_finite_is_degenerate() {
        assert!(rmse_from_pairs(vec![(1.0, f64::NAN)]).unwrap_err().is_degenerate());
    }
}
