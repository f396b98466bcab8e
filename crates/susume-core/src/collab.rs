//! Collaborative candidate selection: predictor-driven ranking with a
//! popularity fallback for cold-start users.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::SusumeError;
use crate::filter::TypeFilter;
use crate::models::{Catalog, CollabRecommendation};

/// Raw rating scale ceiling; predictions are unit-normalized against it.
const RATING_SCALE_MAX: f64 = 10.0;

/// External collaborative model: estimates a user's rating for an item on
/// the 1-10 scale. Implementations must be safe for concurrent calls.
pub trait Predictor: Send + Sync {
    fn predict(&self, user_id: u64, item_id: i64) -> Result<f64, SusumeError>;
}

/// Read-only per-user rating history.
#[derive(Debug, Clone, Default)]
pub struct RatingsHistory {
    by_user: HashMap<u64, Vec<(i64, f64)>>,
}

impl RatingsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(user_id, item_id, rating)` rows.
    pub fn from_rows(rows: Vec<(u64, i64, f64)>) -> Self {
        let mut by_user: HashMap<u64, Vec<(i64, f64)>> = HashMap::new();
        for (user, item, rating) in rows {
            by_user.entry(user).or_default().push((item, rating));
        }
        Self { by_user }
    }

    /// Item ids the user has already rated.
    pub fn rated_items(&self, user_id: u64) -> HashSet<i64> {
        self.by_user
            .get(&user_id)
            .map(|rows| rows.iter().map(|(item, _)| *item).collect())
            .unwrap_or_default()
    }

    /// A cold-start user has no rating history at all.
    pub fn is_cold(&self, user_id: u64) -> bool {
        self.by_user
            .get(&user_id)
            .map(|rows| rows.is_empty())
            .unwrap_or(true)
    }

    pub fn users(&self) -> usize {
        self.by_user.len()
    }

    fn iter_all(&self) -> impl Iterator<Item = (u64, i64, f64)> + '_ {
        self.by_user
            .iter()
            .flat_map(|(user, rows)| rows.iter().map(move |(item, r)| (*user, *item, *r)))
    }
}

/// Baseline predictor: item mean rating plus the user's average offset
/// from the means of items they rated. No iterative training involved.
#[derive(Debug, Clone)]
pub struct MeanPredictor {
    global_mean: f64,
    item_means: HashMap<i64, f64>,
    user_bias: HashMap<u64, f64>,
}

impl MeanPredictor {
    pub fn from_history(history: &RatingsHistory) -> Self {
        let mut sums: HashMap<i64, (f64, usize)> = HashMap::new();
        let mut total = 0.0;
        let mut count = 0usize;
        for (_, item, rating) in history.iter_all() {
            let entry = sums.entry(item).or_insert((0.0, 0));
            entry.0 += rating;
            entry.1 += 1;
            total += rating;
            count += 1;
        }
        let global_mean = if count > 0 {
            total / count as f64
        } else {
            RATING_SCALE_MAX / 2.0
        };
        let item_means: HashMap<i64, f64> = sums
            .into_iter()
            .map(|(item, (sum, c))| (item, sum / c as f64))
            .collect();

        let mut user_bias = HashMap::new();
        for (user, rows) in &history.by_user {
            if rows.is_empty() {
                continue;
            }
            let offset: f64 = rows
                .iter()
                .map(|(item, rating)| {
                    rating - item_means.get(item).copied().unwrap_or(global_mean)
                })
                .sum::<f64>()
                / rows.len() as f64;
            user_bias.insert(*user, offset);
        }

        Self {
            global_mean,
            item_means,
            user_bias,
        }
    }
}

impl Predictor for MeanPredictor {
    fn predict(&self, user_id: u64, item_id: i64) -> Result<f64, SusumeError> {
        let base = self
            .item_means
            .get(&item_id)
            .copied()
            .unwrap_or(self.global_mean);
        let bias = self.user_bias.get(&user_id).copied().unwrap_or(0.0);
        Ok((base + bias).clamp(1.0, RATING_SCALE_MAX))
    }
}

/// Select up to `n` collaborative recommendations for a user.
///
/// Cold-start users get the most popular unrated items with a
/// rating-derived unit score and no predictor calls; everyone else gets
/// the top predicted items. A failed prediction skips that item only.
pub fn select_collab(
    user_id: u64,
    predictor: &dyn Predictor,
    catalog: &Catalog,
    history: &RatingsHistory,
    n: usize,
    filter: &TypeFilter,
) -> Vec<CollabRecommendation> {
    let pool: Vec<usize> = catalog
        .iter()
        .enumerate()
        .filter(|(_, item)| filter.matches(&item.kind))
        .map(|(i, _)| i)
        .collect();
    if pool.is_empty() {
        return Vec::new();
    }

    let rated = history.rated_items(user_id);
    let unrated: Vec<usize> = pool
        .into_iter()
        .filter(|&i| {
            catalog
                .get(i)
                .map(|item| !rated.contains(&item.id))
                .unwrap_or(false)
        })
        .collect();

    if history.is_cold(user_id) {
        debug!(user_id, "Cold-start user, falling back to popularity");
        let mut by_popularity = unrated;
        by_popularity.sort_by(|&a, &b| {
            let pop_a = catalog.get(a).map(|i| i.popularity).unwrap_or(0);
            let pop_b = catalog.get(b).map(|i| i.popularity).unwrap_or(0);
            pop_b.cmp(&pop_a).then(a.cmp(&b))
        });
        return by_popularity
            .into_iter()
            .take(n)
            .filter_map(|i| {
                let item = catalog.get(i)?;
                Some(CollabRecommendation {
                    id: item.id,
                    name: item.name.clone(),
                    predicted_rating: round2(item.rating),
                    genres: item.genres.clone(),
                    kind: item.kind.clone(),
                    collab_score: unit_score(item.rating),
                    cold_start: true,
                })
            })
            .collect();
    }

    // Predict for every remaining candidate; individual failures are
    // dropped, never escalated.
    let mut predictions: Vec<(usize, f64)> = Vec::with_capacity(unrated.len());
    for i in unrated {
        let item = match catalog.get(i) {
            Some(item) => item,
            None => continue,
        };
        match predictor.predict(user_id, item.id) {
            Ok(estimate) => predictions.push((i, estimate)),
            Err(e) => {
                debug!(user_id, item_id = item.id, error = %e, "Prediction failed, skipping item");
            }
        }
    }

    predictions.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    predictions
        .into_iter()
        .take(n)
        .filter_map(|(i, estimate)| {
            let item = catalog.get(i)?;
            Some(CollabRecommendation {
                id: item.id,
                name: item.name.clone(),
                predicted_rating: round2(estimate),
                genres: item.genres.clone(),
                kind: item.kind.clone(),
                collab_score: unit_score(estimate),
                cold_start: false,
            })
        })
        .collect()
}

/// Unit-normalize a 1-10 scale rating, capped at 1.0.
fn unit_score(rating: f64) -> f64 {
    (rating / RATING_SCALE_MAX).min(1.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
