//! Resolves a free-text query to a catalog index.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::models::Catalog;
use crate::normalize::clean_title;

/// Result of resolving a query against the catalog.
///
/// Strategy: exact normalized equality → best fuzzy above cutoff → NotFound.
#[derive(Debug, Clone, PartialEq)]
pub enum TitleMatch {
    /// Normalized title matched exactly; catalog order breaks ties.
    Exact(usize),
    /// Fuzzy match with confidence (0.0-1.0).
    Fuzzy(usize, f64),
    /// No catalog entry cleared the cutoff.
    NotFound,
}

impl TitleMatch {
    /// The resolved catalog index, if the match succeeded.
    pub fn index(&self) -> Option<usize> {
        match self {
            TitleMatch::Exact(i) | TitleMatch::Fuzzy(i, _) => Some(*i),
            TitleMatch::NotFound => None,
        }
    }
}

/// Resolve a query to a catalog index.
///
/// `cutoff` is the minimum fuzzy confidence; `max_candidates` bounds how
/// many fuzzy hits are considered before the best one is taken.
pub fn resolve(query: &str, catalog: &Catalog, cutoff: f64, max_candidates: usize) -> TitleMatch {
    if catalog.is_empty() {
        return TitleMatch::NotFound;
    }

    let cleaned = clean_title(query);
    if cleaned.is_empty() {
        return TitleMatch::NotFound;
    }

    // Pass 1: exact normalized match, first hit wins.
    for (i, item) in catalog.iter().enumerate() {
        if clean_title(&item.name) == cleaned {
            return TitleMatch::Exact(i);
        }
    }

    // Pass 2: fuzzy. Collect everything above the cutoff, keep the top few,
    // take the single best.
    let matcher = SkimMatcherV2::default();
    let max_possible = matcher.fuzzy_match(&cleaned, &cleaned).unwrap_or(1).max(1);

    let mut candidates: Vec<(usize, f64)> = catalog
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let name = clean_title(&item.name);
            let score = matcher
                .fuzzy_match(&name, &cleaned)
                .or_else(|| matcher.fuzzy_match(&cleaned, &name))?;
            let confidence = score as f64 / max_possible as f64;
            (confidence >= cutoff).then_some((i, confidence))
        })
        .collect();

    // Score descending, catalog order on ties.
    candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    candidates.truncate(max_candidates);

    match candidates.first() {
        Some(&(i, confidence)) => TitleMatch::Fuzzy(i, confidence),
        None => TitleMatch::NotFound,
    }
}
