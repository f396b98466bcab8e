//! Score fusion: merges content and collaborative candidate lists into a
//! single ranking.
//!
//! Raw content similarity and raw predicted ratings live on incomparable
//! scales, so each method's positive scores are first replaced by their
//! percentile rank within that method. The weighted combination then
//! operates on unit-scale values regardless of distribution shape.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::config::FusionConfig;
use crate::models::{CollabRecommendation, ContentRecommendation, FusedRecommendation, Method};

/// Per-item partial scores accumulated in the first pass. One entry per
/// distinct catalog id appearing in either input list.
#[derive(Debug, Clone)]
struct PartialScores {
    name: String,
    genres: Vec<String>,
    kind: String,
    content_score: f64,
    collab_score: f64,
    similarity: Option<f64>,
    rating: Option<f64>,
    predicted_rating: Option<f64>,
}

/// Fuse two candidate lists into at most `target_n` ranked results.
///
/// Items are keyed by catalog id; percentiles are computed per method
/// over positive scores only. Assembly prefers hybrid entries, then
/// content-only, then collab-only, and a minimum collaborative quota of
/// `min(2, collab_only_available, target_n / 3)` is enforced before the
/// final truncation.
pub fn fuse(
    content: &[ContentRecommendation],
    collab: &[CollabRecommendation],
    target_n: usize,
    weights: &FusionConfig,
) -> Vec<FusedRecommendation> {
    if target_n == 0 || (content.is_empty() && collab.is_empty()) {
        return Vec::new();
    }

    // Pass one: an immutable keyed collection of partial scores.
    let partials = collect_partials(content, collab, weights.genre_bonus);

    let content_population = positive_scores(partials.values().map(|p| p.content_score));
    let collab_population = positive_scores(partials.values().map(|p| p.collab_score));

    // Pass two: map partials into fused results.
    let mut fused: Vec<FusedRecommendation> = partials
        .into_iter()
        .map(|(id, p)| {
            let content_pct = percentile(p.content_score, &content_population);
            let collab_pct = percentile(p.collab_score, &collab_population);
            let combined = round3(
                content_pct * weights.content_weight + collab_pct * weights.collab_weight,
            );
            let method = match (content_pct > 0.0, collab_pct > 0.0) {
                (true, true) => Method::Hybrid,
                (true, false) => Method::Content,
                _ => Method::Collab,
            };
            FusedRecommendation {
                id,
                name: p.name,
                combined_score: combined,
                method,
                genres: p.genres,
                kind: p.kind,
                similarity: p.similarity,
                rating: p.rating,
                predicted_rating: p.predicted_rating,
            }
        })
        .collect();

    sort_by_score(&mut fused);

    let mut assembled = assemble(fused, target_n);
    sort_by_score(&mut assembled);
    assembled.truncate(target_n);
    assembled
}

/// First fold pass. Content entries seed the map; collaborative entries
/// either merge in (with a genre-overlap bonus) or create collab-only
/// entries.
fn collect_partials(
    content: &[ContentRecommendation],
    collab: &[CollabRecommendation],
    genre_bonus: f64,
) -> BTreeMap<i64, PartialScores> {
    let mut partials: BTreeMap<i64, PartialScores> = BTreeMap::new();

    for rec in content {
        partials.insert(
            rec.id,
            PartialScores {
                name: rec.name.clone(),
                genres: rec.genres.clone(),
                kind: rec.kind.clone(),
                content_score: rec.content_score,
                collab_score: 0.0,
                similarity: Some(rec.similarity),
                rating: Some(rec.rating),
                predicted_rating: None,
            },
        );
    }

    for rec in collab {
        match partials.get_mut(&rec.id) {
            Some(entry) => {
                let bonus = genre_overlap(&entry.genres, &rec.genres) * genre_bonus;
                entry.collab_score = rec.collab_score + bonus;
                entry.predicted_rating = Some(rec.predicted_rating);
                if bonus > 0.0 {
                    debug!(id = rec.id, bonus, "Genre-overlap bonus applied");
                }
            }
            None => {
                partials.insert(
                    rec.id,
                    PartialScores {
                        name: rec.name.clone(),
                        genres: rec.genres.clone(),
                        kind: rec.kind.clone(),
                        content_score: 0.0,
                        collab_score: rec.collab_score,
                        similarity: None,
                        rating: None,
                        predicted_rating: Some(rec.predicted_rating),
                    },
                );
            }
        }
    }

    partials
}

/// Jaccard overlap between two genre lists; 0.0 when the union is empty.
fn genre_overlap(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}

/// Ascending sorted list of the strictly positive scores.
fn positive_scores(scores: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut population: Vec<f64> = scores.filter(|&s| s > 0.0).collect();
    population.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    population
}

/// Rank fraction of `score` within its method's positive population.
/// The lowest positive score still ranks above zero, so only absent or
/// zero scores map to percentile 0. Duplicate raw scores share the
/// percentile of their first occurrence, so equal inputs always get
/// equal ranks.
fn percentile(score: f64, population: &[f64]) -> f64 {
    if score <= 0.0 || population.is_empty() {
        return 0.0;
    }
    let index = population
        .iter()
        .position(|&s| s >= score)
        .unwrap_or(population.len() - 1);
    (index + 1) as f64 / population.len() as f64
}

/// Fill `target_n` slots preferring hybrid, then content-only, then
/// collab-only, and enforce the minimum collaborative quota.
fn assemble(fused: Vec<FusedRecommendation>, target_n: usize) -> Vec<FusedRecommendation> {
    let mut hybrid = Vec::new();
    let mut content_only = Vec::new();
    let mut collab_only = Vec::new();
    for rec in fused {
        match rec.method {
            Method::Hybrid => hybrid.push(rec),
            Method::Content => content_only.push(rec),
            Method::Collab => collab_only.push(rec),
        }
    }
    let collab_available = collab_only.len();

    let mut assembled: Vec<FusedRecommendation> = Vec::with_capacity(target_n);
    let mut seen: HashSet<i64> = HashSet::new();
    let mut collab_spill = collab_only.into_iter();
    for rec in hybrid.into_iter().chain(content_only) {
        if assembled.len() >= target_n {
            break;
        }
        if seen.insert(rec.id) {
            assembled.push(rec);
        }
    }
    while assembled.len() < target_n {
        match collab_spill.next() {
            Some(rec) => {
                if seen.insert(rec.id) {
                    assembled.push(rec);
                }
            }
            None => break,
        }
    }

    // Minimum collaborative representation. Evict the weakest non-collab
    // entry for each missing collab slot.
    let min_collab = 2.min(collab_available).min(target_n / 3);
    let mut collab_count = assembled
        .iter()
        .filter(|r| r.method == Method::Collab)
        .count();
    while collab_count < min_collab {
        let replacement = match collab_spill.next() {
            Some(rec) => rec,
            None => break,
        };
        if !seen.insert(replacement.id) {
            continue;
        }
        let evict = assembled
            .iter()
            .enumerate()
            .filter(|(_, r)| r.method != Method::Collab)
            .min_by(|(_, a), (_, b)| {
                a.combined_score
                    .partial_cmp(&b.combined_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i);
        match evict {
            Some(i) => {
                let evicted = assembled.remove(i);
                debug!(evicted = evicted.id, added = replacement.id, "Collab quota eviction");
                assembled.push(replacement);
                collab_count += 1;
            }
            None => break,
        }
    }

    assembled
}

fn sort_by_score(recs: &mut [FusedRecommendation]) {
    recs.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> FusionConfig {
        FusionConfig {
            content_weight: 0.6,
            collab_weight: 0.4,
            genre_bonus: 0.1,
        }
    }

    fn content_rec(id: i64, name: &str, score: f64, genres: &[&str]) -> ContentRecommendation {
        ContentRecommendation {
            id,
            name: name.to_string(),
            similarity: score,
            rating: 8.0,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            kind: "tv".into(),
            content_score: score,
        }
    }

    fn collab_rec(id: i64, name: &str, score: f64, genres: &[&str]) -> CollabRecommendation {
        CollabRecommendation {
            id,
            name: name.to_string(),
            predicted_rating: score * 10.0,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            kind: "tv".into(),
            collab_score: score,
            cold_start: false,
        }
    }

    #[test]
    fn overlap_becomes_hybrid_and_leads() {
        let content = vec![
            content_rec(1, "Steins;Gate", 0.9, &["Sci-Fi"]),
            content_rec(2, "Erased", 0.5, &["Mystery"]),
        ];
        let collab = vec![
            collab_rec(2, "Erased", 0.8, &["Mystery"]),
            collab_rec(3, "Another", 0.3, &["Horror"]),
        ];
        let fused = fuse(&content, &collab, 3, &weights());

        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].name, "Erased");
        assert_eq!(fused[0].method, Method::Hybrid);
        // Erased ranks 0.5 in content and, with the full-overlap bonus,
        // 1.0 in collab: combined 0.7 beats Steins;Gate's 0.6.
        assert_eq!(fused[0].combined_score, 0.7);
        assert!(fused.iter().any(|r| r.method == Method::Content));
        assert!(fused.iter().any(|r| r.method == Method::Collab));
    }

    #[test]
    fn hybrid_wins_when_topping_both_methods() {
        let content = vec![
            content_rec(1, "Monogatari", 0.5, &["Mystery"]),
            content_rec(2, "Bakemonogatari", 0.9, &["Mystery"]),
        ];
        let collab = vec![
            collab_rec(2, "Bakemonogatari", 0.8, &["Mystery"]),
            collab_rec(3, "Nisekoi", 0.3, &["Romance"]),
        ];
        let fused = fuse(&content, &collab, 3, &weights());

        // Item 2 has the max score in both populations.
        assert_eq!(fused[0].id, 2);
        assert_eq!(fused[0].method, Method::Hybrid);
        assert_eq!(fused[0].combined_score, 1.0);
    }

    #[test]
    fn percentile_population_excludes_zero_scores() {
        let content = vec![content_rec(1, "Gintama", 0.7, &["Comedy"])];
        let fused = fuse(&content, &[], 5, &weights());

        // Single positive content score ranks at percentile 1.0.
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].method, Method::Content);
        assert_eq!(fused[0].combined_score, 0.6);
    }

    #[test]
    fn duplicate_raw_scores_share_percentile() {
        let content = vec![
            content_rec(1, "Kino's Journey", 0.5, &["Adventure"]),
            content_rec(2, "Mushishi", 0.5, &["Adventure"]),
            content_rec(3, "Haibane Renmei", 0.9, &["Drama"]),
        ];
        let fused = fuse(&content, &[], 3, &weights());

        let score_of = |id: i64| {
            fused
                .iter()
                .find(|r| r.id == id)
                .map(|r| r.combined_score)
                .unwrap()
        };
        assert_eq!(score_of(1), score_of(2));
        assert!(score_of(3) > score_of(1));
    }

    #[test]
    fn genre_bonus_requires_overlap() {
        let content = vec![
            content_rec(1, "Hellsing", 0.9, &["Action"]),
            content_rec(2, "Berserk", 0.5, &["Action"]),
        ];
        // Same collab score, but only item 2 shares a genre with its
        // content entry.
        let disjoint = vec![collab_rec(1, "Hellsing", 0.6, &["Romance"])];
        let overlapping = vec![collab_rec(1, "Hellsing", 0.6, &["Action"])];

        let plain = collect_partials(&content, &disjoint, 0.1);
        let boosted = collect_partials(&content, &overlapping, 0.1);
        assert!((plain[&1].collab_score - 0.6).abs() < 1e-9);
        assert!((boosted[&1].collab_score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn collab_quota_evicts_weak_content() {
        // Six content entries fill target_n=6; quota demands
        // min(2, 2, 6/3) = 2 collab slots.
        let content: Vec<_> = (1..=6)
            .map(|i| content_rec(i, &format!("Show {i}"), 0.3 + i as f64 * 0.1, &["Action"]))
            .collect();
        let collab = vec![
            collab_rec(10, "Overlord", 0.9, &["Fantasy"]),
            collab_rec(11, "Re:Zero", 0.7, &["Fantasy"]),
        ];
        let fused = fuse(&content, &collab, 6, &weights());

        assert_eq!(fused.len(), 6);
        let collab_count = fused.iter().filter(|r| r.method == Method::Collab).count();
        assert_eq!(collab_count, 2);
        // The two weakest content entries were evicted.
        assert!(fused.iter().all(|r| r.id != 1 && r.id != 2));
    }

    #[test]
    fn quota_capped_by_available_collab() {
        let content: Vec<_> = (1..=6)
            .map(|i| content_rec(i, &format!("Show {i}"), 0.3 + i as f64 * 0.1, &["Action"]))
            .collect();
        let collab = vec![collab_rec(10, "Overlord", 0.9, &["Fantasy"])];
        let fused = fuse(&content, &collab, 6, &weights());

        let collab_count = fused.iter().filter(|r| r.method == Method::Collab).count();
        assert_eq!(collab_count, 1);
        assert_eq!(fused.len(), 6);
    }

    #[test]
    fn small_target_skips_quota() {
        // target_n=2 gives quota min(2, 2, 0) = 0.
        let content = vec![
            content_rec(1, "Show 1", 0.9, &["Action"]),
            content_rec(2, "Show 2", 0.8, &["Action"]),
        ];
        let collab = vec![
            collab_rec(10, "Overlord", 0.9, &["Fantasy"]),
            collab_rec(11, "Re:Zero", 0.7, &["Fantasy"]),
        ];
        let fused = fuse(&content, &collab, 2, &weights());

        assert_eq!(fused.len(), 2);
        assert!(fused.iter().all(|r| r.method == Method::Content));
    }

    #[test]
    fn output_sorted_and_truncated() {
        let content: Vec<_> = (1..=10)
            .map(|i| content_rec(i, &format!("Show {i}"), i as f64 / 10.0, &["Action"]))
            .collect();
        let fused = fuse(&content, &[], 4, &weights());

        assert_eq!(fused.len(), 4);
        for pair in fused.windows(2) {
            assert!(pair[0].combined_score >= pair[1].combined_score);
        }
    }

    #[test]
    fn empty_inputs_empty_output() {
        assert!(fuse(&[], &[], 5, &weights()).is_empty());
        let content = vec![content_rec(1, "Show", 0.5, &["Action"])];
        assert!(fuse(&content, &[], 0, &weights()).is_empty());
    }

    #[test]
    fn combined_score_three_decimals() {
        let content = vec![
            content_rec(1, "Show 1", 0.31, &["Action"]),
            content_rec(2, "Show 2", 0.62, &["Action"]),
            content_rec(3, "Show 3", 0.93, &["Action"]),
        ];
        let fused = fuse(&content, &[], 3, &weights());
        for rec in &fused {
            assert_eq!((rec.combined_score * 1000.0).round() / 1000.0, rec.combined_score);
        }
    }
}
