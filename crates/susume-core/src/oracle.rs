//! Similarity oracle: a precomputed, symmetric item-to-item similarity
//! lookup over catalog indices.

use std::collections::BTreeSet;

use crate::models::Catalog;

/// Feature weights for the built-in similarity matrix.
const GENRE_WEIGHT: f64 = 0.5;
const RATING_WEIGHT: f64 = 0.3;
const POPULARITY_WEIGHT: f64 = 0.2;

/// Read-only similarity lookup over catalog indices.
///
/// Implementations must be symmetric with `sim(i, i) == 1.0` and values
/// in [0, 1]. Safe to share unsynchronized across concurrent requests;
/// a reload must publish a fresh value, never mutate in place.
pub trait SimilarityOracle: Send + Sync {
    fn sim(&self, a: usize, b: usize) -> f64;
}

/// Dense cosine-similarity matrix built once from weighted catalog
/// features: multi-hot genres, min-max-normalized rating and popularity.
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    n: usize,
    data: Vec<f64>,
}

impl SimilarityMatrix {
    /// Build the matrix from the catalog. O(n² · f); done once at load.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let n = catalog.len();

        // Genre vocabulary in a stable order.
        let vocab: Vec<String> = catalog
            .iter()
            .flat_map(|item| item.genres.iter().map(|g| g.to_lowercase()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let ratings: Vec<f64> = catalog.iter().map(|i| i.rating).collect();
        let popularity: Vec<f64> = catalog.iter().map(|i| i.popularity as f64).collect();
        let norm_rating = min_max_normalize(&ratings);
        let norm_popularity = min_max_normalize(&popularity);

        let features: Vec<Vec<f64>> = catalog
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let genres: BTreeSet<String> =
                    item.genres.iter().map(|g| g.to_lowercase()).collect();
                let mut row: Vec<f64> = vocab
                    .iter()
                    .map(|g| {
                        if genres.contains(g) {
                            GENRE_WEIGHT
                        } else {
                            0.0
                        }
                    })
                    .collect();
                row.push(norm_rating[i] * RATING_WEIGHT);
                row.push(norm_popularity[i] * POPULARITY_WEIGHT);
                row
            })
            .collect();

        let mut data = vec![0.0; n * n];
        for a in 0..n {
            data[a * n + a] = 1.0;
            for b in (a + 1)..n {
                let s = cosine(&features[a], &features[b]);
                data[a * n + b] = s;
                data[b * n + a] = s;
            }
        }

        Self { n, data }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}

impl SimilarityOracle for SimilarityMatrix {
    fn sim(&self, a: usize, b: usize) -> f64 {
        if a >= self.n || b >= self.n {
            return 0.0;
        }
        self.data[a * self.n + b]
    }
}

/// Scale values to [0, 1]; a constant column maps to 0.5.
fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    values
        .iter()
        .map(|&v| if range > 0.0 { (v - min) / range } else { 0.5 })
        .collect()
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}
