//! Title normalization for catalog matching and series-identity keys.
//!
//! Two levels: `clean_title` canonicalizes a title for equality and fuzzy
//! comparison; `extract_series_name` additionally strips season, part,
//! special-edition, sequel, and episode markers to derive the series key.
//! The strip passes are order-sensitive: colon/dash clause removal must run
//! after the more specific markers, or it would eat the text those markers
//! need to see.

use unicode_normalization::UnicodeNormalization;

/// Canonicalize a title: NFKC + lowercase, drop `:` and `!`, turn `-` into a
/// space, collapse whitespace.
pub fn clean_title(title: &str) -> String {
    let folded = title.nfkc().collect::<String>().to_lowercase();
    let replaced: String = folded
        .chars()
        .filter_map(|c| match c {
            ':' | '!' => None,
            '-' => Some(' '),
            c => Some(c),
        })
        .collect();
    collapse_whitespace(&replaced)
}

/// Derive the series identity key for a title.
///
/// Returns the title unchanged (lowercased, trimmed) when no marker applies;
/// returns an empty string when a marker sits at the very start
/// (e.g. "OVA Special").
pub fn extract_series_name(title: &str) -> String {
    let s = title.nfkc().collect::<String>().to_lowercase();
    let s = strip_season_markers(&s);
    let s = strip_part_markers(&s);
    let s = strip_special_markers(&s);
    let s = strip_sequel_suffixes(&s);
    let s = strip_trailing_clause(&s);
    let s = strip_bracketed(&s);
    let s = strip_episode_markers(&s);
    collapse_whitespace(&s)
}

/// Truncate `s` before the first word the predicate flags as a marker.
///
/// The predicate sees punctuation-trimmed words; the output preserves the
/// original words before the cut.
fn truncate_at_marker(s: &str, marker: impl Fn(&[String], usize) -> bool) -> String {
    let words: Vec<&str> = s.split_whitespace().collect();
    let cleaned: Vec<String> = words
        .iter()
        .map(|w| {
            w.trim_matches(|c: char| c.is_ascii_punctuation())
                .to_string()
        })
        .collect();

    for i in 0..cleaned.len() {
        if marker(&cleaned, i) {
            return words[..i].join(" ");
        }
    }
    s.to_string()
}

// ── Season markers ────────────────────────────────────────────────────

/// Cut at "season N", "seasonN", "sN", "2nd season", "final season", etc.
fn strip_season_markers(s: &str) -> String {
    truncate_at_marker(s, |words, i| {
        let w = &words[i];
        let next = words.get(i + 1);

        if w == "season" {
            return matches!(next, Some(n) if is_digits(n));
        }
        if let Some(digits) = w.strip_prefix("season") {
            if is_digits(digits) {
                return true;
            }
        }
        // Standalone "s2", "s3", ...
        if w.len() > 1 && w.starts_with('s') && is_digits(&w[1..]) {
            return true;
        }
        // "2nd season", "second season", "final season"
        let next_is_season = matches!(next, Some(n) if n == "season");
        if next_is_season && (is_ordinal(w) || matches!(w.as_str(), "first" | "second" | "third" | "final")) {
            return true;
        }
        false
    })
}

// ── Part / cour / arc markers ─────────────────────────────────────────

fn strip_part_markers(s: &str) -> String {
    truncate_at_marker(s, |words, i| {
        let w = &words[i];
        let next = words.get(i + 1);

        if w == "part" {
            return matches!(next, Some(n) if is_digits(n) || is_roman(n));
        }
        if let Some(digits) = w.strip_prefix("part") {
            if is_digits(digits) {
                return true;
            }
        }
        if matches!(w.as_str(), "cour" | "arc") {
            return matches!(next, Some(n) if is_digits(n));
        }
        false
    })
}

// ── Special-edition markers ───────────────────────────────────────────

const SPECIAL_MARKERS: &[&str] = &[
    "ova", "ona", "special", "specials", "movie", "film", "recap", "extra", "bonus", "omake",
];

fn strip_special_markers(s: &str) -> String {
    truncate_at_marker(s, |words, i| SPECIAL_MARKERS.contains(&words[i].as_str()))
}

// ── Known sequel-naming suffixes ──────────────────────────────────────

const SEQUEL_SUFFIXES: &[&str] = &[
    "shippuden",
    "shippuuden",
    "kai",
    "brotherhood",
    "revolution",
    "evolution",
    "gt",
    "super",
    "zero",
    "origin",
    "prequel",
];

fn strip_sequel_suffixes(s: &str) -> String {
    truncate_at_marker(s, |words, i| {
        if SEQUEL_SUFFIXES.contains(&words[i].as_str()) {
            return true;
        }
        // "next generations" (Boruto subtitle)
        words[i] == "next" && matches!(words.get(i + 1), Some(n) if n == "generations")
    })
}

// ── Trailing colon/dash clauses ───────────────────────────────────────

/// Cut at the first `:` or at a `-` adjacent to whitespace. Intra-word
/// hyphens ("x-men") are left alone.
fn strip_trailing_clause(s: &str) -> String {
    let cut = s.char_indices().find_map(|(i, c)| match c {
        ':' => Some(i),
        '-' => {
            let before_ws = i == 0 || s[..i].ends_with(char::is_whitespace);
            let after_ws = i + c.len_utf8() == s.len()
                || s[i + c.len_utf8()..].starts_with(char::is_whitespace);
            (before_ws || after_ws).then_some(i)
        }
        _ => None,
    });
    match cut {
        Some(i) => s[..i].to_string(),
        None => s.to_string(),
    }
}

// ── Bracketed / parenthesized suffixes ────────────────────────────────

/// Cut at the first `[` and at parenthesized runs of digits like "(2017)".
/// Non-numeric parentheses are kept.
fn strip_bracketed(s: &str) -> String {
    let mut result = s.to_string();
    if let Some(i) = result.find('[') {
        result.truncate(i);
    }
    if let Some(open) = result.find('(') {
        if let Some(close_rel) = result[open..].find(')') {
            let inner = &result[open + 1..open + close_rel];
            if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
                result.truncate(open);
            }
        }
    }
    result
}

// ── Episode / volume markers ──────────────────────────────────────────

fn strip_episode_markers(s: &str) -> String {
    truncate_at_marker(s, |words, i| {
        let w = &words[i];
        let next = words.get(i + 1);
        let next_is_digits = matches!(next, Some(n) if is_digits(n));

        if matches!(w.as_str(), "episode" | "ep" | "vol" | "volume") {
            return next_is_digits;
        }
        if let Some(digits) = w.strip_prefix("ep") {
            if is_digits(digits) {
                return true;
            }
        }
        false
    })
}

// ── Word helpers ──────────────────────────────────────────────────────

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// "1st", "2nd", "3rd", "4th", ...: digits plus an ordinal suffix.
fn is_ordinal(s: &str) -> bool {
    s.strip_suffix("st")
        .or_else(|| s.strip_suffix("nd"))
        .or_else(|| s.strip_suffix("rd"))
        .or_else(|| s.strip_suffix("th"))
        .map(is_digits)
        .unwrap_or(false)
}

/// Roman numerals as used in part markers ("Part II", "Part IV").
fn is_roman(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| matches!(c, 'i' | 'v' | 'x'))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── clean_title ───────────────────────────────────────────────────

    #[test]
    fn clean_strips_colon_and_bang() {
        assert_eq!(
            clean_title("Fullmetal Alchemist: Brotherhood"),
            "fullmetal alchemist brotherhood"
        );
        assert_eq!(clean_title("Keion!"), "keion");
    }

    #[test]
    fn clean_dash_becomes_space() {
        assert_eq!(clean_title("Ping Pong-The Animation"), "ping pong the animation");
    }

    #[test]
    fn clean_collapses_whitespace() {
        assert_eq!(clean_title("  Cowboy   Bebop "), "cowboy bebop");
    }

    #[test]
    fn clean_fullwidth_input() {
        assert_eq!(clean_title("ＮＡＲＵＴＯ"), "naruto");
    }

    #[test]
    fn clean_empty() {
        assert_eq!(clean_title(""), "");
    }

    // ── extract_series_name ───────────────────────────────────────────

    #[test]
    fn series_season_number() {
        assert_eq!(extract_series_name("Attack on Titan Season 2"), "attack on titan");
        assert_eq!(extract_series_name("My Hero Academia S3"), "my hero academia");
    }

    #[test]
    fn series_ordinal_season() {
        assert_eq!(
            extract_series_name("Mushishi Zoku Shou 2nd Season"),
            "mushishi zoku shou"
        );
        assert_eq!(
            extract_series_name("Shingeki no Kyojin Final Season"),
            "shingeki no kyojin"
        );
    }

    #[test]
    fn series_part_marker() {
        assert_eq!(extract_series_name("JoJo Part 5"), "jojo");
        assert_eq!(extract_series_name("JoJo Part IV"), "jojo");
    }

    #[test]
    fn series_special_marker() {
        assert_eq!(extract_series_name("One Piece Movie 4"), "one piece");
        assert_eq!(extract_series_name("Hellsing OVA"), "hellsing");
    }

    #[test]
    fn series_sequel_suffix() {
        assert_eq!(extract_series_name("Naruto Shippuden"), "naruto");
        assert_eq!(extract_series_name("Dragon Ball GT"), "dragon ball");
        assert_eq!(extract_series_name("Dragon Ball Super"), "dragon ball");
    }

    #[test]
    fn series_colon_clause() {
        assert_eq!(
            extract_series_name("Code Geass: Hangyaku no Lelouch"),
            "code geass"
        );
    }

    #[test]
    fn series_dash_clause() {
        assert_eq!(extract_series_name("Clannad - After Story"), "clannad");
    }

    #[test]
    fn series_intra_word_hyphen_kept() {
        assert_eq!(extract_series_name("Saiki Kusuo no Psi-nan"), "saiki kusuo no psi-nan");
    }

    #[test]
    fn series_year_parens() {
        assert_eq!(extract_series_name("Gintama (2017)"), "gintama");
        assert_eq!(extract_series_name("Hunter x Hunter (2011)"), "hunter x hunter");
    }

    #[test]
    fn series_bracket_suffix() {
        assert_eq!(extract_series_name("Initial D [First Stage]"), "initial d");
    }

    #[test]
    fn series_episode_marker() {
        assert_eq!(extract_series_name("One Piece Episode 1000"), "one piece");
    }

    #[test]
    fn series_marker_at_start_yields_empty() {
        assert_eq!(extract_series_name("OVA Special"), "");
    }

    #[test]
    fn series_no_marker_unchanged() {
        assert_eq!(extract_series_name("Cowboy Bebop"), "cowboy bebop");
        assert_eq!(extract_series_name("Mononoke"), "mononoke");
    }

    #[test]
    fn series_empty() {
        assert_eq!(extract_series_name(""), "");
    }

    #[test]
    fn series_hawaii_style_safety() {
        // "super"/"kai" must only match as standalone words.
        assert_eq!(extract_series_name("Superior Days"), "superior days");
        assert_eq!(extract_series_name("Kaiji"), "kaiji");
    }
}
