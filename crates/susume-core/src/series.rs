//! Series-identity detection: decides whether two titles belong to the
//! same logical series (sequels, seasons, spin-offs) so the content
//! selector can exclude them.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::normalize::extract_series_name;

/// Curated series families: family name → known name variants. Lookup is
/// substring containment in either direction, not exact match.
#[derive(Debug, Clone)]
pub struct SeriesFamilies {
    families: Vec<(String, Vec<String>)>,
}

impl SeriesFamilies {
    /// Build a custom family table.
    pub fn new(table: Vec<(String, Vec<String>)>) -> Self {
        Self { families: table }
    }

    /// The built-in, hand-curated family table.
    pub fn curated() -> Self {
        let table: &[(&str, &[&str])] = &[
            (
                "naruto",
                &["naruto", "naruto shippuden", "naruto shippuuden", "boruto"],
            ),
            (
                "dragon ball",
                &["dragon ball", "dragonball", "dragon ball z", "dragon ball gt", "dragon ball super", "dragon ball kai"],
            ),
            ("jojo", &["jojo", "jojos bizarre adventure", "jojo no kimyou na bouken"]),
            (
                "fate",
                &["fate stay night", "fate zero", "fate grand order", "fate apocrypha", "fate extra", "fate kaleid"],
            ),
            (
                "fullmetal alchemist",
                &["fullmetal alchemist", "fullmetal alchemist brotherhood", "hagane no renkinjutsushi"],
            ),
            ("hunter x hunter", &["hunter x hunter", "hunter hunter"]),
            ("one piece", &["one piece", "wan pisu"]),
            ("attack on titan", &["attack on titan", "shingeki no kyojin"]),
            (
                "mobile suit gundam",
                &["gundam", "mobile suit gundam", "kidou senshi gundam"],
            ),
            ("code geass", &["code geass", "code geass hangyaku no lelouch"]),
            (
                "evangelion",
                &["neon genesis evangelion", "evangelion", "shin evangelion"],
            ),
            ("bleach", &["bleach", "bleach sennen kessen hen"]),
            ("pokemon", &["pokemon", "pocket monsters"]),
            ("sailor moon", &["sailor moon", "bishoujo senshi sailor moon"]),
            (
                "detective conan",
                &["detective conan", "meitantei conan", "case closed"],
            ),
        ];

        Self::new(
            table
                .iter()
                .map(|(family, variants)| {
                    (
                        family.to_string(),
                        variants.iter().map(|v| v.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }

    /// Resolve a series key to its family name, if any variant contains the
    /// key or the key contains the variant.
    pub fn family_of(&self, series_key: &str) -> Option<&str> {
        if series_key.is_empty() {
            return None;
        }
        for (family, variants) in &self.families {
            for variant in variants {
                if variant.contains(series_key) || series_key.contains(variant.as_str()) {
                    return Some(family);
                }
            }
        }
        None
    }
}

impl Default for SeriesFamilies {
    fn default() -> Self {
        Self::curated()
    }
}

/// Immutable series-identity resolver, safe to share across requests.
#[derive(Debug, Clone)]
pub struct SeriesResolver {
    families: SeriesFamilies,
    threshold: f64,
}

impl SeriesResolver {
    pub fn new(families: SeriesFamilies, threshold: f64) -> Self {
        Self {
            families,
            threshold,
        }
    }

    /// Whether two titles belong to the same logical series.
    ///
    /// Order: empty-key short circuit → family table → exact key →
    /// fuzzy ratio / substring containment.
    pub fn same_series(&self, title_a: &str, title_b: &str) -> bool {
        let key_a = extract_series_name(title_a);
        let key_b = extract_series_name(title_b);
        if key_a.is_empty() || key_b.is_empty() {
            return false;
        }

        if let (Some(fam_a), Some(fam_b)) =
            (self.families.family_of(&key_a), self.families.family_of(&key_b))
        {
            if fam_a == fam_b {
                return true;
            }
        }

        if key_a == key_b {
            return true;
        }

        let contains = key_a.contains(&key_b) || key_b.contains(&key_a);
        contains || similarity_ratio(&key_a, &key_b) >= self.threshold
    }
}

/// Normalized edit-similarity between two strings in [0, 1]: the fuzzy
/// match score divided by the pattern's self-match score, best of both
/// directions.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let matcher = SkimMatcherV2::default();
    let forward = ratio_one_way(&matcher, a, b);
    let backward = ratio_one_way(&matcher, b, a);
    forward.max(backward)
}

fn ratio_one_way(matcher: &SkimMatcherV2, choice: &str, pattern: &str) -> f64 {
    let max_possible = matcher.fuzzy_match(pattern, pattern).unwrap_or(1).max(1);
    match matcher.fuzzy_match(choice, pattern) {
        Some(score) => score as f64 / max_possible as f64,
        None => 0.0,
    }
}
