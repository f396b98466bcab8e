use serde::{Deserialize, Serialize};

/// A single catalog entry. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
    pub genres: Vec<String>,
    /// Mean community rating on a 1-10 scale.
    pub rating: f64,
    /// Member/viewer count used for popularity ranking.
    pub popularity: u64,
    /// Media kind ("tv", "movie", "ova", ...), lowercase.
    pub kind: String,
}

/// The loaded, read-only catalog. Items are addressed by index; the
/// index order is the tie-break everywhere scores collide.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Build a catalog, lowercasing each item's kind for consistent filtering.
    pub fn new(mut items: Vec<CatalogItem>) -> Self {
        for item in &mut items {
            item.kind = item.kind.to_lowercase();
        }
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CatalogItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogItem> {
        self.items.iter()
    }
}

/// Which method(s) produced a fused recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Content,
    Collab,
    Hybrid,
}

/// One content-based recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecommendation {
    pub id: i64,
    pub name: String,
    /// Similarity rounded to 4 decimals for display.
    pub similarity: f64,
    pub rating: f64,
    pub genres: Vec<String>,
    pub kind: String,
    /// Raw, unrounded oracle score; fusion input.
    pub content_score: f64,
}

/// One collaborative recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollabRecommendation {
    pub id: i64,
    pub name: String,
    /// Predicted rating on the 1-10 scale, rounded to 2 decimals.
    pub predicted_rating: f64,
    pub genres: Vec<String>,
    pub kind: String,
    /// Unit-normalized collaborative score (predicted_rating / 10, capped at 1).
    pub collab_score: f64,
    /// True when the user had no rating history and the entry came from
    /// the popularity fallback rather than the predictor.
    pub cold_start: bool,
}

/// One fused recommendation. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedRecommendation {
    pub id: i64,
    pub name: String,
    /// Weighted percentile combination, rounded to 3 decimals.
    pub combined_score: f64,
    pub method: Method,
    pub genres: Vec<String>,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_rating: Option<f64>,
}

/// Response for the hybrid operation: both branches plus the fused list,
/// each truncated to the requested size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridResponse {
    pub content_based: Vec<ContentRecommendation>,
    pub collaborative: Vec<CollabRecommendation>,
    pub hybrid: Vec<FusedRecommendation>,
}
