/// A parsed media-kind filter: "all" (or empty) passes everything,
/// otherwise a case-insensitive set of kinds like "movie,ova".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFilter {
    All,
    Kinds(Vec<String>),
}

impl TypeFilter {
    /// Parse a filter expression. Empty strings, "all", and lists that
    /// reduce to nothing all mean no restriction.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return TypeFilter::All;
        }
        let kinds: Vec<String> = trimmed
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if kinds.is_empty() {
            TypeFilter::All
        } else {
            TypeFilter::Kinds(kinds)
        }
    }

    /// Whether an item of the given kind passes the filter.
    pub fn matches(&self, kind: &str) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Kinds(kinds) => {
                let kind = kind.to_lowercase();
                kinds.iter().any(|k| *k == kind)
            }
        }
    }
}

impl Default for TypeFilter {
    fn default() -> Self {
        TypeFilter::All
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_variants() {
        assert_eq!(TypeFilter::parse(""), TypeFilter::All);
        assert_eq!(TypeFilter::parse("all"), TypeFilter::All);
        assert_eq!(TypeFilter::parse("  ALL "), TypeFilter::All);
        assert_eq!(TypeFilter::parse(" , ,"), TypeFilter::All);
    }

    #[test]
    fn test_single_kind() {
        let filter = TypeFilter::parse("Movie");
        assert!(filter.matches("movie"));
        assert!(filter.matches("MOVIE"));
        assert!(!filter.matches("tv"));
    }

    #[test]
    fn test_comma_list() {
        let filter = TypeFilter::parse("Movie, OVA");
        assert!(filter.matches("movie"));
        assert!(filter.matches("ova"));
        assert!(!filter.matches("tv"));
    }
}
