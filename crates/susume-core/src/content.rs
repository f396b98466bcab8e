//! Content-based candidate selection over the similarity oracle.

use std::collections::HashSet;

use tracing::debug;

use crate::filter::TypeFilter;
use crate::models::{Catalog, ContentRecommendation};
use crate::oracle::SimilarityOracle;
use crate::series::SeriesResolver;

/// Select up to `n` diverse, non-same-series content recommendations for
/// the resolved item.
///
/// Overfetches the top `3n` by oracle score, drops same-series entries,
/// then picks greedily: the first `n/2` slots go to raw similarity, the
/// rest require at least one genre not already covered. Remaining slots
/// are filled back in score order if the diversity rule starved the list.
pub fn select_content(
    item_index: usize,
    catalog: &Catalog,
    oracle: &dyn SimilarityOracle,
    series: &SeriesResolver,
    n: usize,
    filter: &TypeFilter,
) -> Vec<ContentRecommendation> {
    let target = match catalog.get(item_index) {
        Some(item) => item,
        None => return Vec::new(),
    };

    // Candidate pool under the type filter; the target itself is never a
    // candidate but stays reachable through the oracle regardless.
    let mut scored: Vec<(usize, f64)> = catalog
        .iter()
        .enumerate()
        .filter(|(i, item)| *i != item_index && filter.matches(&item.kind))
        .map(|(i, _)| (i, oracle.sim(item_index, i)))
        .collect();

    if scored.is_empty() {
        return Vec::new();
    }

    // Score descending; exact float ties fall back to catalog order.
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(n.saturating_mul(3));

    // Never recommend sequels/seasons of the query itself.
    let before = scored.len();
    scored.retain(|(i, _)| {
        let name = catalog.get(*i).map(|item| item.name.as_str()).unwrap_or("");
        !series.same_series(name, &target.name)
    });
    debug!(
        target = %target.name,
        dropped = before - scored.len(),
        remaining = scored.len(),
        "Same-series filter applied"
    );

    // Greedy diversity pass: first half by similarity, second half must
    // contribute a new genre.
    let mut selected: Vec<(usize, f64)> = Vec::with_capacity(n);
    let mut selected_indices: HashSet<usize> = HashSet::new();
    let mut seen_genres: HashSet<String> = HashSet::new();

    for &(i, score) in &scored {
        if selected.len() >= n {
            break;
        }
        let genres: HashSet<String> = catalog
            .get(i)
            .map(|item| item.genres.iter().map(|g| g.to_lowercase()).collect())
            .unwrap_or_default();
        if selected.len() < n / 2 || !genres.is_subset(&seen_genres) {
            selected.push((i, score));
            selected_indices.insert(i);
            seen_genres.extend(genres);
        }
    }

    // Fill remaining slots in score order, ignoring the diversity rule.
    if selected.len() < n {
        for &(i, score) in &scored {
            if selected.len() >= n {
                break;
            }
            if selected_indices.insert(i) {
                selected.push((i, score));
            }
        }
    }

    selected
        .into_iter()
        .filter_map(|(i, score)| {
            let item = catalog.get(i)?;
            Some(ContentRecommendation {
                id: item.id,
                name: item.name.clone(),
                similarity: round4(score),
                rating: item.rating,
                genres: item.genres.clone(),
                kind: item.kind.clone(),
                content_score: score,
            })
        })
        .collect()
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
