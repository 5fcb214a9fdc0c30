use crate::models::{NewUserRating, ScoredItem};
use std::cmp::Ordering;
use std::collections::HashSet;

pub mod metrics;
pub mod validation;

/// Indices of the `k` highest scores, best first. Ties keep the lower index first;
/// NaN scores rank last.
pub fn top_k_indices(scores: &[f64], k: usize) -> Vec<usize> {
    let mut indexed: Vec<(usize, f64)> = scores.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| descending(a.1, b.1).then(a.0.cmp(&b.0)));
    indexed.into_iter().take(k).map(|(i, _)| i).collect()
}

/// Highest-scoring `n` items whose index is not in `exclude`.
pub fn top_n_unseen(scores: &[f64], exclude: &HashSet<usize>, n: usize) -> Vec<ScoredItem> {
    let mut candidates: Vec<ScoredItem> = scores
        .iter()
        .enumerate()
        .filter(|(item, _)| !exclude.contains(item))
        .map(|(item, &score)| ScoredItem { item, score })
        .collect();

    candidates.sort_by(|a, b| descending(a.score, b.score).then(a.item.cmp(&b.item)));
    candidates.truncate(n);
    candidates
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Multiplies every rating by `scale`.
pub fn rescale_ratings(ratings: &[NewUserRating], scale: f64) -> Vec<NewUserRating> {
    ratings
        .iter()
        .map(|r| NewUserRating::new(r.item, r.rating * scale))
        .collect()
}

/// Keeps the last rating given for each item, in first-seen order.
pub fn dedup_ratings(ratings: &[NewUserRating]) -> Vec<NewUserRating> {
    let mut result: Vec<NewUserRating> = Vec::with_capacity(ratings.len());
    for rating in ratings {
        match result.iter_mut().find(|r| r.item == rating.item) {
            Some(existing) => existing.rating = rating.rating,
            None => result.push(*rating),
        }
    }
    result
}
