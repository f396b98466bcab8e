//! Request-level orchestration: validation, title resolution, candidate
//! selection, and fusion behind one facade.

use tracing::{debug, info};

use crate::collab::{select_collab, Predictor, RatingsHistory};
use crate::config::RecommendConfig;
use crate::content::select_content;
use crate::error::SusumeError;
use crate::filter::TypeFilter;
use crate::fusion::fuse;
use crate::matcher::{self, TitleMatch};
use crate::models::{Catalog, CollabRecommendation, ContentRecommendation, HybridResponse};
use crate::oracle::SimilarityOracle;
use crate::series::{SeriesFamilies, SeriesResolver};

/// Read-only recommendation engine over a loaded catalog snapshot.
///
/// All operations are pure with respect to the catalog, oracle, and
/// predictor, so one instance can serve any number of concurrent
/// requests. Swapping in fresh data means building a new `Recommender`,
/// never mutating a live one.
pub struct Recommender {
    catalog: Catalog,
    oracle: Box<dyn SimilarityOracle>,
    predictor: Box<dyn Predictor>,
    history: RatingsHistory,
    series: SeriesResolver,
    config: RecommendConfig,
}

impl Recommender {
    pub fn new(
        catalog: Catalog,
        oracle: Box<dyn SimilarityOracle>,
        predictor: Box<dyn Predictor>,
        history: RatingsHistory,
        config: RecommendConfig,
    ) -> Self {
        let series = SeriesResolver::new(
            SeriesFamilies::curated(),
            config.matching.series_threshold,
        );
        Self {
            catalog,
            oracle,
            predictor,
            history,
            series,
            config,
        }
    }

    /// Replace the curated series family table, mainly for tests.
    pub fn with_series_resolver(mut self, series: SeriesResolver) -> Self {
        self.series = series;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Content recommendations for a free-text title query.
    ///
    /// Fails with `NotFound` when the query resolves to nothing; an empty
    /// result under a narrow type filter is a success, not an error.
    #[tracing::instrument(name = "recommend_content", skip(self), fields(title = %title))]
    pub fn recommend_content(
        &self,
        title: &str,
        n: usize,
        filter: &TypeFilter,
    ) -> Result<Vec<ContentRecommendation>, SusumeError> {
        validate_title(title)?;
        let n = self.config.clamp_n(n);
        let index = self.resolve_title(title)?;
        let recs = select_content(index, &self.catalog, self.oracle.as_ref(), &self.series, n, filter);
        info!(resolved = index, count = recs.len(), "Content recommendations ready");
        Ok(recs)
    }

    /// Collaborative recommendations for a user.
    #[tracing::instrument(name = "recommend_collab", skip(self))]
    pub fn recommend_collab(
        &self,
        user_id: u64,
        n: usize,
        filter: &TypeFilter,
    ) -> Result<Vec<CollabRecommendation>, SusumeError> {
        validate_user(user_id)?;
        let n = self.config.clamp_n(n);
        let recs = select_collab(
            user_id,
            self.predictor.as_ref(),
            &self.catalog,
            &self.history,
            n,
            filter,
        );
        info!(count = recs.len(), "Collaborative recommendations ready");
        Ok(recs)
    }

    /// Blended recommendations for a title and user pair.
    ///
    /// Both branches overfetch beyond `n` so the fused ranking still has
    /// material after deduplication and quota enforcement. A title that
    /// fails resolution degrades to an empty content branch instead of
    /// failing the whole request.
    #[tracing::instrument(name = "recommend_hybrid", skip(self), fields(title = %title))]
    pub fn recommend_hybrid(
        &self,
        title: &str,
        user_id: u64,
        n: usize,
        filter: &TypeFilter,
    ) -> Result<HybridResponse, SusumeError> {
        validate_title(title)?;
        validate_user(user_id)?;
        let n = self.config.clamp_n(n);
        let fetch = self.overfetch(n);

        let content = match self.resolve_title(title) {
            Ok(index) => {
                select_content(index, &self.catalog, self.oracle.as_ref(), &self.series, fetch, filter)
            }
            Err(SusumeError::NotFound(_)) => {
                debug!("Title unresolved, hybrid proceeds on collaborative branch only");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let collab = select_collab(
            user_id,
            self.predictor.as_ref(),
            &self.catalog,
            &self.history,
            fetch,
            filter,
        );

        let hybrid = fuse(&content, &collab, n, &self.config.fusion);
        info!(
            content = content.len(),
            collab = collab.len(),
            fused = hybrid.len(),
            "Hybrid recommendations ready"
        );
        Ok(HybridResponse {
            content_based: content.into_iter().take(n).collect(),
            collaborative: collab.into_iter().take(n).collect(),
            hybrid,
        })
    }

    fn resolve_title(&self, title: &str) -> Result<usize, SusumeError> {
        let matched = matcher::resolve(
            title,
            &self.catalog,
            self.config.matching.fuzzy_cutoff,
            self.config.matching.max_fuzzy_candidates,
        );
        match matched {
            TitleMatch::Exact(index) => Ok(index),
            TitleMatch::Fuzzy(index, confidence) => {
                debug!(index, confidence, "Fuzzy title resolution");
                Ok(index)
            }
            TitleMatch::NotFound => Err(SusumeError::NotFound(format!(
                "no catalog entry matches '{title}'"
            ))),
        }
    }

    /// Working-set size for each hybrid branch before fusing.
    fn overfetch(&self, n: usize) -> usize {
        (n * 2.max(n / 2)).min(self.config.limits.overfetch_cap)
    }
}

fn validate_title(title: &str) -> Result<(), SusumeError> {
    if title.trim().chars().count() < 2 {
        return Err(SusumeError::Validation(
            "title must be at least 2 characters".into(),
        ));
    }
    Ok(())
}

fn validate_user(user_id: u64) -> Result<(), SusumeError> {
    if user_id == 0 {
        return Err(SusumeError::Validation(
            "user_id must be a positive integer".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::MeanPredictor;
    use crate::models::CatalogItem;
    use crate::oracle::SimilarityMatrix;

    fn item(id: i64, name: &str, genres: &[&str], rating: f64, popularity: u64) -> CatalogItem {
        CatalogItem {
            id,
            name: name.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            rating,
            popularity,
            kind: "tv".into(),
        }
    }

    fn engine() -> Recommender {
        let catalog = Catalog::new(vec![
            item(1, "Naruto", &["Action", "Adventure"], 7.9, 9000),
            item(2, "Bleach", &["Action", "Supernatural"], 7.8, 7000),
            item(3, "One Piece", &["Action", "Adventure"], 8.6, 9500),
            item(4, "Mushishi", &["Mystery", "Slice of Life"], 8.7, 2000),
            item(5, "Toradora", &["Romance", "Comedy"], 8.1, 5000),
        ]);
        let oracle = SimilarityMatrix::from_catalog(&catalog);
        let history = RatingsHistory::from_rows(vec![(7, 4, 9.0), (8, 1, 8.0), (8, 4, 9.0)]);
        let predictor = MeanPredictor::from_history(&history);
        Recommender::new(
            catalog,
            Box::new(oracle),
            Box::new(predictor),
            history,
            RecommendConfig::default(),
        )
    }

    #[test]
    fn rejects_short_title() {
        let err = engine().recommend_content("x", 5, &TypeFilter::All);
        assert!(matches!(err, Err(SusumeError::Validation(_))));
    }

    #[test]
    fn rejects_zero_user() {
        let err = engine().recommend_collab(0, 5, &TypeFilter::All);
        assert!(matches!(err, Err(SusumeError::Validation(_))));
    }

    #[test]
    fn unresolved_title_is_not_found() {
        let err = engine().recommend_content("zzzzqqqq", 5, &TypeFilter::All);
        assert!(matches!(err, Err(SusumeError::NotFound(_))));
    }

    #[test]
    fn content_excludes_the_query_item() {
        let recs = engine()
            .recommend_content("Naruto", 3, &TypeFilter::All)
            .unwrap();
        assert!(!recs.is_empty());
        assert!(recs.iter().all(|r| r.name != "Naruto"));
    }

    #[test]
    fn n_is_clamped_not_rejected() {
        let recs = engine()
            .recommend_content("Naruto", 0, &TypeFilter::All)
            .unwrap();
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn collab_works_for_cold_user() {
        let recs = engine().recommend_collab(999, 3, &TypeFilter::All).unwrap();
        assert_eq!(recs.len(), 3);
        assert!(recs.iter().all(|r| r.cold_start));
    }

    #[test]
    fn hybrid_returns_all_three_branches() {
        let resp = engine()
            .recommend_hybrid("Naruto", 7, 3, &TypeFilter::All)
            .unwrap();
        assert!(resp.content_based.len() <= 3);
        assert!(resp.collaborative.len() <= 3);
        assert!(resp.hybrid.len() <= 3);
        assert!(!resp.hybrid.is_empty());
        for pair in resp.hybrid.windows(2) {
            assert!(pair[0].combined_score >= pair[1].combined_score);
        }
    }

    #[test]
    fn hybrid_survives_unresolved_title() {
        let resp = engine()
            .recommend_hybrid("zzzzqqqq", 7, 3, &TypeFilter::All)
            .unwrap();
        assert!(resp.content_based.is_empty());
        assert!(!resp.collaborative.is_empty());
        assert!(!resp.hybrid.is_empty());
    }

    #[test]
    fn empty_filter_pool_is_empty_result_not_error() {
        let resp = engine()
            .recommend_hybrid("Naruto", 7, 3, &TypeFilter::parse("movie,ova"))
            .unwrap();
        assert!(resp.content_based.is_empty());
        assert!(resp.collaborative.is_empty());
        assert!(resp.hybrid.is_empty());
    }
}
