/// Tag classification: maps free text plus categorical hints to a mode set
/// and a single derived focus. Pure functions, no external state.
use std::collections::BTreeSet;

use crate::models::{ContentType, Focus, Mode};

/// Maximum length of a normalized tag.
const MAX_TAG_LEN: usize = 50;

/// Per-mode keyword dictionaries. Matching is case-insensitive substring
/// search over one combined haystack, deliberately permissive: an item can
/// carry several modes.
const MODE_KEYWORDS: &[(Mode, &[&str])] = &[
    (
        Mode::Comfort,
        &[
            "cozy", "comfort", "gentle", "warm", "soothing", "family", "friendship",
            "heartwarming", "wholesome", "kind",
        ],
    ),
    (
        Mode::Beauty,
        &[
            "beauty", "beautiful", "art", "nature", "landscape", "photography", "poetry",
            "stunning", "aesthetic", "visual",
        ],
    ),
    (
        Mode::Logic,
        &[
            "puzzle", "mystery", "science", "history", "documentary", "strategy", "analysis",
            "chess", "detective", "brain",
        ],
    ),
    (
        Mode::Energy,
        &[
            "adventure", "action", "upbeat", "dance", "workout", "sport", "thrill", "exciting",
            "fast-paced", "energetic",
        ],
    ),
    (
        Mode::Calm,
        &[
            "calm", "meditation", "ambient", "slow", "quiet", "peaceful", "mindful", "breathing",
            "relax", "stillness",
        ],
    ),
    (
        Mode::Reflect,
        &[
            "memoir", "reflection", "philosophy", "meaning", "journal", "grief", "essay",
            "spiritual", "introspect", "contemplat",
        ],
    ),
];

/// Result of classifying one item: every inferred mode, the single derived
/// focus, and the normalized topical tags that informed the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagResult {
    pub modes: Vec<Mode>,
    pub focus: Focus,
    pub topics: Vec<String>,
}

/// Manually curated labels to merge into an automatic classification.
#[derive(Debug, Clone, Default)]
pub struct TagOverrides {
    pub modes: Vec<Mode>,
    pub focuses: Vec<Focus>,
}

/// Fixed provider-content-type → focus mapping.
pub fn infer_focus(content_type: ContentType) -> Focus {
    match content_type {
        ContentType::Watch => Focus::Watch,
        ContentType::Read => Focus::Read,
        ContentType::Listen => Focus::Music,
        ContentType::Event => Focus::Move,
    }
}

/// Collects every mode whose keyword dictionary hits the combined text; if
/// none match, returns the single default mode so the set is never empty.
pub fn infer_modes(
    title: &str,
    description: Option<&str>,
    genres: &[String],
    categories: &[String],
) -> Vec<Mode> {
    let mut haystack = String::with_capacity(
        title.len() + description.map(str::len).unwrap_or(0) + genres.len() + categories.len(),
    );
    haystack.push_str(title);
    if let Some(desc) = description {
        haystack.push(' ');
        haystack.push_str(desc);
    }
    for chunk in genres.iter().chain(categories.iter()) {
        haystack.push(' ');
        haystack.push_str(chunk);
    }
    let haystack = haystack.to_lowercase();

    let mut modes: Vec<Mode> = MODE_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| haystack.contains(kw)))
        .map(|(mode, _)| *mode)
        .collect();

    if modes.is_empty() {
        modes.push(Mode::DEFAULT);
    }
    modes
}

/// Merges manual overrides into an automatic classification. Overrides are
/// additive: the result is the set union, so curation can add labels but
/// never silently remove an automatically detected one.
pub fn merge_with_overrides(auto: TagResult, overrides: &TagOverrides) -> TagResult {
    let modes: BTreeSet<Mode> = auto
        .modes
        .iter()
        .chain(overrides.modes.iter())
        .copied()
        .collect();

    TagResult {
        modes: modes.into_iter().collect(),
        focus: auto.focus,
        topics: auto.topics,
    }
}

/// Every focus in a merged result: the derived one plus curated additions.
pub fn merged_focuses(auto_focus: Focus, overrides: &TagOverrides) -> Vec<Focus> {
    let mut focuses: BTreeSet<Focus> = overrides.focuses.iter().copied().collect();
    focuses.insert(auto_focus);
    focuses.into_iter().collect()
}

/// Normalizes a tag string: lowercase, whitespace/underscore runs collapsed
/// to a single hyphen, characters outside `[a-z0-9-.]` stripped, leading and
/// trailing hyphens/dots trimmed. Returns None for results shorter than two
/// characters; longer than 50 are truncated. Idempotent.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let lower = raw.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut pending_hyphen = false;

    for ch in lower.chars() {
        if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_hyphen = true;
            continue;
        }
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '.' {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch);
        }
        // Anything else is stripped without introducing a separator.
    }

    let mut tag: String = out.trim_matches(|c| c == '-' || c == '.').to_string();
    if tag.len() > MAX_TAG_LEN {
        tag.truncate(MAX_TAG_LEN);
        // Truncation may expose a trailing separator; trim again so
        // normalizing twice yields the same string.
        tag = tag.trim_end_matches(|c| c == '-' || c == '.').to_string();
    }

    if tag.len() < 2 {
        None
    } else {
        Some(tag)
    }
}

/// Normalizes and dedupes a list of raw tag strings, preserving first-seen
/// order. Dedup is exact string equality after normalization.
pub fn normalize_tags(raw: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for tag in raw {
        if let Some(normalized) = normalize_tag(tag) {
            if seen.insert(normalized.clone()) {
                out.push(normalized);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_focus_mapping() {
        assert_eq!(infer_focus(ContentType::Watch), Focus::Watch);
        assert_eq!(infer_focus(ContentType::Read), Focus::Read);
        assert_eq!(infer_focus(ContentType::Listen), Focus::Music);
        assert_eq!(infer_focus(ContentType::Event), Focus::Move);
    }

    #[test]
    fn test_infer_modes_multiple_hits() {
        let modes = infer_modes(
            "A gentle documentary about nature",
            Some("Slow, peaceful landscapes"),
            &[],
            &[],
        );
        assert!(modes.contains(&Mode::Comfort)); // "gentle"
        assert!(modes.contains(&Mode::Logic)); // "documentary"
        assert!(modes.contains(&Mode::Beauty)); // "nature", "landscape"
        assert!(modes.contains(&Mode::Calm)); // "slow", "peaceful"
    }

    #[test]
    fn test_infer_modes_case_insensitive() {
        let modes = infer_modes("MEDITATION Basics", None, &[], &[]);
        assert_eq!(modes, vec![Mode::Calm]);
    }

    #[test]
    fn test_infer_modes_from_genres() {
        let modes = infer_modes(
            "Untitled",
            None,
            &["Mystery".to_string()],
            &["adventure".to_string()],
        );
        assert!(modes.contains(&Mode::Logic));
        assert!(modes.contains(&Mode::Energy));
    }

    #[test]
    fn test_infer_modes_falls_back_to_default() {
        let modes = infer_modes("xyzzy", None, &[], &[]);
        assert_eq!(modes, vec![Mode::DEFAULT]);
    }

    #[test]
    fn test_merge_with_overrides_is_additive() {
        let auto = TagResult {
            modes: vec![Mode::Calm],
            focus: Focus::Read,
            topics: vec!["poetry".to_string()],
        };
        let overrides = TagOverrides {
            modes: vec![Mode::Beauty, Mode::Calm],
            focuses: vec![],
        };
        let merged = merge_with_overrides(auto, &overrides);
        assert_eq!(merged.modes, vec![Mode::Beauty, Mode::Calm]);
        assert_eq!(merged.focus, Focus::Read);
    }

    #[test]
    fn test_merge_never_removes_auto_labels() {
        let auto = TagResult {
            modes: vec![Mode::Logic, Mode::Energy],
            focus: Focus::Watch,
            topics: vec![],
        };
        let merged = merge_with_overrides(auto.clone(), &TagOverrides::default());
        assert_eq!(merged.modes, vec![Mode::Logic, Mode::Energy]);
    }

    #[test]
    fn test_merged_focuses_includes_derived() {
        let overrides = TagOverrides {
            modes: vec![],
            focuses: vec![Focus::Reflect],
        };
        assert_eq!(
            merged_focuses(Focus::Read, &overrides),
            vec![Focus::Read, Focus::Reflect]
        );
    }

    #[test]
    fn test_normalize_tag_basic() {
        assert_eq!(normalize_tag("Science Fiction"), Some("science-fiction".to_string()));
        assert_eq!(normalize_tag("snake_case_tag"), Some("snake-case-tag".to_string()));
    }

    #[test]
    fn test_normalize_tag_strips_invalid_chars() {
        assert_eq!(normalize_tag("rock&roll!"), Some("rockroll".to_string()));
        assert_eq!(normalize_tag("v2.0"), Some("v2.0".to_string()));
    }

    #[test]
    fn test_normalize_tag_trims_edges() {
        assert_eq!(normalize_tag("--hello--"), Some("hello".to_string()));
        assert_eq!(normalize_tag("...dots..."), Some("dots".to_string()));
    }

    #[test]
    fn test_normalize_tag_rejects_short() {
        assert_eq!(normalize_tag("a"), None);
        assert_eq!(normalize_tag("!!"), None);
        assert_eq!(normalize_tag(""), None);
    }

    #[test]
    fn test_normalize_tag_truncates_long() {
        let long = "x".repeat(80);
        let tag = normalize_tag(&long).unwrap();
        assert_eq!(tag.len(), 50);
    }

    #[test]
    fn test_normalize_tag_idempotent() {
        for raw in [
            "Science Fiction",
            "--Hello_World--",
            "rock&roll",
            "v2.0",
            &"ab-".repeat(30),
        ] {
            if let Some(once) = normalize_tag(raw) {
                let twice = normalize_tag(&once).unwrap();
                assert_eq!(once, twice, "not idempotent for {:?}", raw);
                assert!(once.len() >= 2 && once.len() <= 50);
                assert!(once
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.'));
            }
        }
    }

    #[test]
    fn test_normalize_tags_dedupes_after_normalization() {
        let raw = vec![
            "Sci Fi".to_string(),
            "sci_fi".to_string(),
            "SCI-FI".to_string(),
            "poetry".to_string(),
        ];
        assert_eq!(
            normalize_tags(&raw),
            vec!["sci-fi".to_string(), "poetry".to_string()]
        );
    }
}
