use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Activity-type label derived from provider content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    Watch,
    Read,
    Music,
    Move,
    Create,
    Reflect,
}

impl Focus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Focus::Watch => "watch",
            Focus::Read => "read",
            Focus::Music => "music",
            Focus::Move => "move",
            Focus::Create => "create",
            Focus::Reflect => "reflect",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "watch" => Some(Focus::Watch),
            "read" => Some(Focus::Read),
            "music" => Some(Focus::Music),
            "move" => Some(Focus::Move),
            "create" => Some(Focus::Create),
            "reflect" => Some(Focus::Reflect),
            _ => None,
        }
    }
}

impl Display for Focus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Emotional/use-case label attached to content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Comfort,
    Beauty,
    Logic,
    Energy,
    Calm,
    Reflect,
}

impl Mode {
    /// Fallback label applied when no keyword dictionary matches.
    pub const DEFAULT: Mode = Mode::Comfort;

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Comfort => "comfort",
            Mode::Beauty => "beauty",
            Mode::Logic => "logic",
            Mode::Energy => "energy",
            Mode::Calm => "calm",
            Mode::Reflect => "reflect",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "comfort" => Some(Mode::Comfort),
            "beauty" => Some(Mode::Beauty),
            "logic" => Some(Mode::Logic),
            "energy" => Some(Mode::Energy),
            "calm" => Some(Mode::Calm),
            "reflect" => Some(Mode::Reflect),
            _ => None,
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The user's self-reported condition. Blank is a valid, distinct value with
/// its own scoring treatment, never penalized for missing state tags.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    #[default]
    Blank,
    Anxious,
    Sad,
    Tired,
    Restless,
    Numb,
}

impl UserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::Blank => "blank",
            UserState::Anxious => "anxious",
            UserState::Sad => "sad",
            UserState::Tired => "tired",
            UserState::Restless => "restless",
            UserState::Numb => "numb",
        }
    }

    /// Empty and "blank" both map to the blank state.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "blank" => Some(UserState::Blank),
            "anxious" => Some(UserState::Anxious),
            "sad" => Some(UserState::Sad),
            "tired" => Some(UserState::Tired),
            "restless" => Some(UserState::Restless),
            "numb" => Some(UserState::Numb),
            _ => None,
        }
    }
}

impl Display for UserState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider-side content kind of a normalized item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Watch,
    Read,
    Listen,
    Event,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Watch => "watch",
            ContentType::Read => "read",
            ContentType::Listen => "listen",
            ContentType::Event => "event",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "watch" => Some(ContentType::Watch),
            "read" => Some(ContentType::Read),
            "listen" => Some(ContentType::Listen),
            "event" => Some(ContentType::Event),
            _ => None,
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Normalized content
// ============================================================================

/// Identity of a cached item: unique per provider, globally unique once
/// namespaced through Display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentKey {
    pub provider: String,
    pub provider_id: String,
}

impl Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.provider, self.provider_id)
    }
}

/// One item in the shared schema every provider adapter normalizes into.
/// Immutable once produced; re-ingestion replaces the record via upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedContentItem {
    pub provider: String,
    pub provider_id: String,
    pub content_type: ContentType,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub url: Option<String>,
    /// Opaque original payload, kept for provider-specific signals
    /// (popularity, publish dates) and debugging.
    pub raw: serde_json::Value,
}

impl NormalizedContentItem {
    pub fn key(&self) -> ContentKey {
        ContentKey {
            provider: self.provider.clone(),
            provider_id: self.provider_id.clone(),
        }
    }
}

/// A cached item as persisted in the external cache store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedItem {
    pub id: Uuid,
    pub item: NormalizedContentItem,
    pub fetched_at: DateTime<Utc>,
}

/// One (mode, focus) pair attached to a cached item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentTag {
    pub mode: Mode,
    pub focus: Focus,
}

/// A cached item together with its tag rows.
#[derive(Debug, Clone)]
pub struct TaggedItem {
    pub item: CachedItem,
    pub tags: Vec<ContentTag>,
}

// ============================================================================
// Internal catalog
// ============================================================================

/// A curated item from the internal catalog. Empty `states` means the item
/// is universal and matches any user state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub modes: Vec<Mode>,
    pub focuses: Vec<Focus>,
    pub states: Vec<UserState>,
    pub created_at: DateTime<Utc>,
}

/// A configured syndicated feed source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: Uuid,
    pub url: String,
    pub name: String,
    pub enabled: bool,
    pub curated_modes: Vec<Mode>,
}

// ============================================================================
// Recommendation types
// ============================================================================

/// Caller-supplied context a recommendation is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationContext {
    pub state: UserState,
    pub mode: Mode,
    pub focus: Focus,
}

/// Rating scale a provider reports popularity on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingScale {
    ZeroToTen,
    ZeroToFive,
}

/// Provider-reported popularity signal, prior to normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopularitySignal {
    pub rating: f64,
    pub scale: RatingScale,
    pub count: u64,
}

/// A unified candidate from either pool, ready for scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Categorical partition key used by the diversity selector.
    pub kind: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub modes: Vec<Mode>,
    pub focuses: Vec<Focus>,
    /// Empty means universal.
    pub states: Vec<UserState>,
    pub timestamp: Option<DateTime<Utc>>,
    pub popularity: Option<PopularitySignal>,
}

/// Per-component scoring breakdown; total is the sum of the other fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub mode_match: f64,
    pub focus_match: f64,
    pub state_weight: f64,
    pub freshness: f64,
    pub popularity: f64,
    pub total: f64,
}

/// A candidate plus its computed score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub breakdown: ScoreBreakdown,
}

impl From<CatalogItem> for Candidate {
    fn from(item: CatalogItem) -> Self {
        Candidate {
            id: item.id.to_string(),
            title: item.title,
            description: item.description,
            kind: item.kind,
            url: item.url,
            image_url: item.image_url,
            modes: item.modes,
            focuses: item.focuses,
            states: item.states,
            timestamp: Some(item.created_at),
            popularity: None,
        }
    }
}

impl From<TaggedItem> for Candidate {
    fn from(tagged: TaggedItem) -> Self {
        let TaggedItem { item, tags } = tagged;
        let mut modes: Vec<Mode> = tags.iter().map(|t| t.mode).collect();
        modes.sort();
        modes.dedup();
        let mut focuses: Vec<Focus> = tags.iter().map(|t| t.focus).collect();
        focuses.sort();
        focuses.dedup();

        let popularity = popularity_signal(&item.item.provider, &item.item.raw);
        let timestamp = published_from_raw(&item.item.raw).or(Some(item.fetched_at));

        Candidate {
            id: item.item.key().to_string(),
            title: item.item.title,
            description: item.item.description,
            kind: item.item.content_type.as_str().to_string(),
            url: item.item.url,
            image_url: item.item.image_url,
            modes,
            focuses,
            // Cached items carry no state tags; they are universal.
            states: Vec::new(),
            timestamp,
            popularity,
        }
    }
}

/// Extracts the provider-specific popularity signal from a raw payload.
/// Providers with no signal yield None.
pub fn popularity_signal(provider: &str, raw: &serde_json::Value) -> Option<PopularitySignal> {
    match provider {
        "tmdb" => {
            let rating = raw.get("vote_average")?.as_f64()?;
            let count = raw.get("vote_count").and_then(|v| v.as_u64()).unwrap_or(0);
            Some(PopularitySignal {
                rating,
                scale: RatingScale::ZeroToTen,
                count,
            })
        }
        "openlibrary" => {
            let rating = raw.get("ratings_average")?.as_f64()?;
            let count = raw
                .get("ratings_count")
                .and_then(|v| v.as_u64())
                .unwrap_or(0);
            Some(PopularitySignal {
                rating,
                scale: RatingScale::ZeroToFive,
                count,
            })
        }
        _ => None,
    }
}

/// Extracts a validated publish timestamp from a raw payload, if present.
/// Unparseable values yield None rather than "now".
pub fn published_from_raw(raw: &serde_json::Value) -> Option<DateTime<Utc>> {
    if let Some(published) = raw.get("published").and_then(|v| v.as_str()) {
        if let Ok(ts) = DateTime::parse_from_rfc3339(published) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    // TMDB reports a bare release date.
    let date = raw
        .get("release_date")
        .or_else(|| raw.get("first_air_date"))?
        .as_str()?;
    let parsed = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let midnight = parsed.and_hms_opt(0, 0, 0)?;
    Some(DateTime::from_naive_utc_and_offset(midnight, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_key_display_namespaces_provider() {
        let key = ContentKey {
            provider: "tmdb".to_string(),
            provider_id: "550".to_string(),
        };
        assert_eq!(format!("{}", key), "tmdb_550");
    }

    #[test]
    fn test_enum_round_trips() {
        for focus in [
            Focus::Watch,
            Focus::Read,
            Focus::Music,
            Focus::Move,
            Focus::Create,
            Focus::Reflect,
        ] {
            assert_eq!(Focus::parse(focus.as_str()), Some(focus));
        }
        for mode in [
            Mode::Comfort,
            Mode::Beauty,
            Mode::Logic,
            Mode::Energy,
            Mode::Calm,
            Mode::Reflect,
        ] {
            assert_eq!(Mode::parse(mode.as_str()), Some(mode));
        }
    }

    #[test]
    fn test_user_state_blank_from_empty_string() {
        assert_eq!(UserState::parse(""), Some(UserState::Blank));
        assert_eq!(UserState::parse("blank"), Some(UserState::Blank));
        assert_eq!(UserState::parse("furious"), None);
    }

    #[test]
    fn test_state_serde_lowercase() {
        let json = serde_json::to_string(&UserState::Anxious).unwrap();
        assert_eq!(json, r#""anxious""#);
    }

    #[test]
    fn test_popularity_signal_tmdb() {
        let raw = json!({ "vote_average": 8.4, "vote_count": 1500 });
        let signal = popularity_signal("tmdb", &raw).unwrap();
        assert_eq!(signal.rating, 8.4);
        assert_eq!(signal.scale, RatingScale::ZeroToTen);
        assert_eq!(signal.count, 1500);
    }

    #[test]
    fn test_popularity_signal_openlibrary_scale() {
        let raw = json!({ "ratings_average": 4.2, "ratings_count": 120 });
        let signal = popularity_signal("openlibrary", &raw).unwrap();
        assert_eq!(signal.scale, RatingScale::ZeroToFive);
    }

    #[test]
    fn test_popularity_signal_unknown_provider() {
        let raw = json!({ "vote_average": 9.0 });
        assert_eq!(popularity_signal("feed", &raw), None);
    }

    #[test]
    fn test_published_from_raw_rfc3339() {
        let raw = json!({ "published": "2026-08-20T12:00:00Z" });
        let ts = published_from_raw(&raw).unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-08-20T12:00:00+00:00");
    }

    #[test]
    fn test_published_from_raw_release_date() {
        let raw = json!({ "release_date": "2026-01-15" });
        assert!(published_from_raw(&raw).is_some());
    }

    #[test]
    fn test_published_from_raw_garbage_is_none() {
        let raw = json!({ "published": "not a date" });
        assert_eq!(published_from_raw(&raw), None);
    }

    #[test]
    fn test_tagged_item_candidate_dedups_modes() {
        let item = CachedItem {
            id: Uuid::new_v4(),
            item: NormalizedContentItem {
                provider: "feed".to_string(),
                provider_id: "https://example.com/a".to_string(),
                content_type: ContentType::Read,
                title: "A quiet essay".to_string(),
                description: None,
                image_url: None,
                url: Some("https://example.com/a".to_string()),
                raw: json!({}),
            },
            fetched_at: Utc::now(),
        };
        let tags = vec![
            ContentTag {
                mode: Mode::Calm,
                focus: Focus::Read,
            },
            ContentTag {
                mode: Mode::Comfort,
                focus: Focus::Read,
            },
            ContentTag {
                mode: Mode::Calm,
                focus: Focus::Reflect,
            },
        ];
        let candidate: Candidate = TaggedItem { item, tags }.into();
        assert_eq!(candidate.modes, vec![Mode::Comfort, Mode::Calm]);
        assert_eq!(candidate.focuses, vec![Focus::Read, Focus::Reflect]);
        assert_eq!(candidate.kind, "read");
        assert!(candidate.states.is_empty());
        // No publish date in raw: fetched_at stands in.
        assert!(candidate.timestamp.is_some());
    }
}
