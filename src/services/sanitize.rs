use regex::Regex;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static DEC_ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#(\d+);").unwrap());
static HEX_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#[xX]([0-9a-fA-F]+);").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Named entities that show up in feed payloads often enough to matter.
const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&nbsp;", " "),
    ("&mdash;", "\u{2014}"),
    ("&ndash;", "\u{2013}"),
    ("&hellip;", "\u{2026}"),
    ("&lsquo;", "\u{2018}"),
    ("&rsquo;", "\u{2019}"),
    ("&ldquo;", "\u{201C}"),
    ("&rdquo;", "\u{201D}"),
];

/// UTF-8-read-as-Latin-1 sequences seen in the wild.
const MOJIBAKE: &[(&str, &str)] = &[
    ("\u{00E2}\u{20AC}\u{2122}", "'"),
    ("\u{00E2}\u{20AC}\u{0153}", "\""),
    ("\u{00E2}\u{20AC}\u{9D}", "\""),
    ("\u{00E2}\u{20AC}\u{201C}", "-"),
    ("\u{00E2}\u{20AC}\u{201D}", "-"),
    ("\u{00E2}\u{20AC}\u{00A6}", "..."),
    ("\u{00C2}\u{00A0}", " "),
];

/// Strips markup and common character-encoding artifacts from a text field
/// before it is stored: HTML tags, decimal/hex and named entities, control
/// characters, zero-width and bidi marks, and mojibake sequences. Runs of
/// whitespace collapse to a single space.
pub fn clean(input: &str) -> String {
    let mut text = TAG_RE.replace_all(input, " ").into_owned();

    text = DEC_ENTITY_RE
        .replace_all(&text, |caps: &regex::Captures| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned();

    text = HEX_ENTITY_RE
        .replace_all(&text, |caps: &regex::Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned();

    for (entity, replacement) in NAMED_ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }

    for (sequence, replacement) in MOJIBAKE {
        if text.contains(sequence) {
            text = text.replace(sequence, replacement);
        }
    }

    let filtered: String = text
        .chars()
        .filter(|c| !is_invisible(*c))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    WHITESPACE_RE.replace_all(&filtered, " ").trim().to_string()
}

/// Same as clean, but empty output becomes None.
pub fn clean_opt(input: &str) -> Option<String> {
    let cleaned = clean(input);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}'   // zero-width + directional marks
        | '\u{202A}'..='\u{202E}' // bidi embedding/override
        | '\u{2066}'..='\u{2069}' // bidi isolates
        | '\u{FEFF}' // BOM
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_tags() {
        assert_eq!(
            clean("<p>Hello <b>world</b></p>"),
            "Hello world".to_string()
        );
    }

    #[test]
    fn test_clean_decodes_decimal_entities() {
        assert_eq!(clean("caf&#233;"), "café");
    }

    #[test]
    fn test_clean_decodes_hex_entities() {
        assert_eq!(clean("caf&#xE9;"), "café");
    }

    #[test]
    fn test_clean_decodes_named_entities() {
        assert_eq!(clean("fish &amp; chips"), "fish & chips");
        assert_eq!(clean("it&rsquo;s"), "it\u{2019}s");
    }

    #[test]
    fn test_clean_removes_zero_width_and_bidi() {
        assert_eq!(clean("he\u{200B}llo \u{202E}world\u{202C}"), "hello world");
    }

    #[test]
    fn test_clean_replaces_mojibake() {
        assert_eq!(clean("it\u{00E2}\u{20AC}\u{2122}s fine"), "it's fine");
    }

    #[test]
    fn test_clean_collapses_whitespace_and_control_chars() {
        assert_eq!(clean("a\u{0007}b\n\n   c"), "a b c");
    }

    #[test]
    fn test_clean_opt_empty_is_none() {
        assert_eq!(clean_opt("<br/>"), None);
        assert_eq!(clean_opt("  "), None);
        assert_eq!(clean_opt("x"), Some("x".to_string()));
    }
}
