/// Fallback keyword extraction: derives topical tags from title/summary text
/// when categorical sources (genres, categories, subjects) come up short.
use std::collections::HashMap;

use crate::services::{sanitize, tagging};

/// Default number of keywords to extract.
pub const DEFAULT_KEYWORD_COUNT: usize = 5;

/// Minimum token length considered a keyword.
const MIN_TOKEN_LEN: usize = 3;

/// Common function words excluded from keyword extraction.
const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "also", "and", "any", "are", "aren",
    "because", "been", "before", "being", "below", "between", "both", "but", "can", "cannot",
    "could", "did", "didn", "does", "doesn", "doing", "don", "down", "during", "each", "few",
    "for", "from", "further", "get", "got", "had", "has", "have", "having", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "into", "its", "itself", "just", "like", "more",
    "most", "much", "myself", "new", "nor", "not", "now", "off", "once", "one", "only", "other",
    "our", "ours", "ourselves", "out", "over", "own", "per", "same", "she", "should", "some",
    "such", "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
    "these", "they", "this", "those", "through", "too", "under", "until", "upon", "very", "was",
    "wasn", "were", "weren", "what", "when", "where", "which", "while", "who", "whom", "why",
    "will", "with", "won", "would", "you", "your", "yours", "yourself", "yourselves",
];

/// Extracts up to `max` topical tags from free text: strip markup, lowercase,
/// split on whitespace, drop short tokens and stopwords, count frequency,
/// rank by (frequency descending, then alphabetical ascending) so ties are
/// deterministic, then normalize and dedupe.
pub fn extract(text: &str, max: usize) -> Vec<String> {
    let cleaned = sanitize::clean(text).to_lowercase();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in cleaned.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric());
        if token.len() < MIN_TOKEN_LEN || STOPWORDS.contains(&token) {
            continue;
        }
        *counts.entry(token.to_string()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let raw: Vec<String> = ranked.into_iter().take(max).map(|(token, _)| token).collect();
    tagging::normalize_tags(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_counts_frequency() {
        let tags = extract("river river river stone stone moss", 2);
        assert_eq!(tags, vec!["river".to_string(), "stone".to_string()]);
    }

    #[test]
    fn test_extract_breaks_ties_alphabetically() {
        let tags = extract("zebra apple mango", 3);
        assert_eq!(
            tags,
            vec!["apple".to_string(), "mango".to_string(), "zebra".to_string()]
        );
    }

    #[test]
    fn test_extract_filters_stopwords_and_short_tokens() {
        let tags = extract("the cat and a dog were in orbit", 5);
        assert!(!tags.contains(&"the".to_string()));
        assert!(!tags.contains(&"and".to_string()));
        assert!(!tags.contains(&"in".to_string()));
        assert!(tags.contains(&"cat".to_string()));
        assert!(tags.contains(&"orbit".to_string()));
    }

    #[test]
    fn test_extract_strips_markup_first() {
        let tags = extract("<p>quiet <b>quiet</b> garden</p>", 2);
        assert_eq!(tags, vec!["quiet".to_string(), "garden".to_string()]);
    }

    #[test]
    fn test_extract_respects_max() {
        let tags = extract("alpha beta gamma delta epsilon zeta eta", 3);
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn test_extract_output_is_normalized() {
        let tags = extract("Rock&Roll rock&roll music", 5);
        for tag in &tags {
            assert!(tag
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.'));
        }
    }
}
