use crate::error::{LatentRecError, Result};
use crate::models::{ModelSnapshot, NewUserRating, Observation};
use ndarray::Array2;
use std::collections::HashSet;

pub fn validate_index(kind: &str, index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(LatentRecError::precondition(format!(
            "{} index {} out of range (model has {})",
            kind, index, len
        )));
    }
    Ok(())
}

/// Cells must be finite and non-negative; `0` marks an unobserved cell.
pub fn validate_rating_matrix(matrix: &Array2<f64>) -> Result<()> {
    if let Some(((user, item), value)) = matrix
        .indexed_iter()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        return Err(LatentRecError::precondition(format!(
            "rating matrix cell ({}, {}) holds invalid value {}",
            user, item, value
        )));
    }
    Ok(())
}

pub fn validate_observations(
    observations: &[Observation],
    num_users: usize,
    num_items: usize,
) -> Result<()> {
    for obs in observations {
        validate_index("user", obs.user, num_users)?;
        validate_index("item", obs.item, num_items)?;
        if !obs.rating.is_finite() {
            return Err(LatentRecError::precondition(format!(
                "observation ({}, {}) has non-finite rating",
                obs.user, obs.item
            )));
        }
    }
    Ok(())
}

pub fn validate_new_user_ratings(ratings: &[NewUserRating], num_items: usize) -> Result<()> {
    if ratings.is_empty() {
        return Err(LatentRecError::precondition(
            "new user must supply at least one rating",
        ));
    }

    for rating in ratings {
        validate_index("item", rating.item, num_items)?;
        if !rating.rating.is_finite() {
            return Err(LatentRecError::precondition(format!(
                "rating for item {} is not finite",
                rating.item
            )));
        }
    }
    Ok(())
}

/// Items rated more than once; the service keeps only the last value.
pub fn duplicate_items(ratings: &[NewUserRating]) -> Vec<usize> {
    let mut seen = HashSet::new();
    let mut duplicates: Vec<usize> = ratings
        .iter()
        .filter(|r| !seen.insert(r.item))
        .map(|r| r.item)
        .collect();
    duplicates.sort_unstable();
    duplicates.dedup();
    duplicates
}

/// Dimensions must agree and every value must be finite.
pub fn validate_snapshot(snapshot: &ModelSnapshot) -> Result<()> {
    snapshot.hyperparameters().validate()?;

    if !snapshot.global_bias.is_finite() {
        return Err(LatentRecError::precondition("global bias is not finite"));
    }

    if snapshot.user_bias.len() != snapshot.user_factors.len() {
        return Err(LatentRecError::precondition(format!(
            "user bias length {} does not match user factor rows {}",
            snapshot.user_bias.len(),
            snapshot.user_factors.len()
        )));
    }

    if snapshot.item_bias.len() != snapshot.item_factors.len() {
        return Err(LatentRecError::precondition(format!(
            "item bias length {} does not match item factor rows {}",
            snapshot.item_bias.len(),
            snapshot.item_factors.len()
        )));
    }

    for (name, rows) in [
        ("user", &snapshot.user_factors),
        ("item", &snapshot.item_factors),
    ] {
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != snapshot.k {
                return Err(LatentRecError::precondition(format!(
                    "{} factor row {} has width {}, expected {}",
                    name,
                    idx,
                    row.len(),
                    snapshot.k
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(LatentRecError::precondition(format!(
                    "{} factor row {} contains invalid values (NaN or Infinity)",
                    name, idx
                )));
            }
        }
    }

    let mut biases = snapshot.user_bias.iter().chain(snapshot.item_bias.iter());
    if biases.any(|v| !v.is_finite()) {
        return Err(LatentRecError::precondition(
            "bias vectors contain invalid values (NaN or Infinity)",
        ));
    }

    Ok(())
}

/// A loaded model must cover the matrix it is evaluated against.
pub fn validate_matrix_matches_model(
    matrix: &Array2<f64>,
    num_users: usize,
    num_items: usize,
) -> Result<()> {
    if matrix.dim() != (num_users, num_items) {
        return Err(LatentRecError::precondition(format!(
            "rating matrix is {}x{} but model is {}x{}",
            matrix.nrows(),
            matrix.ncols(),
            num_users,
            num_items
        )));
    }
    Ok(())
}
