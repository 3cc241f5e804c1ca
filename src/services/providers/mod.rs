/// Content provider abstraction
///
/// Pluggable sources of external content (trending film/TV, book search,
/// syndicated feeds). Each provider fetches raw entries from its upstream
/// API and normalizes them to the common item shape before anything else
/// sees them.
use crate::models::{ContentType, NormalizedContentItem};

pub mod feeds;
pub mod openlibrary;
pub mod tmdb;

pub use feeds::FeedFetcher;
pub use openlibrary::OpenLibraryProvider;
pub use tmdb::TmdbProvider;

/// Upper bound on a single provider fetch.
pub const MAX_FETCH_LIMIT: usize = 40;

/// Clamps a requested fetch size into the supported range.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_FETCH_LIMIT)
}

/// Result of one provider fetch. A disabled provider and a failed fetch are
/// distinct, inspectable outcomes rather than an empty list, so callers can
/// report them differently.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Provider is not configured (for example, no API key).
    Disabled,
    /// Upstream call failed; the fetch yields nothing but the reason is kept.
    Error { message: String },
    /// Fetch succeeded with zero or more normalized items.
    Success { items: Vec<NormalizedContentItem> },
}

/// Trait for external content providers
///
/// Providers fetch from their upstream API and return normalized items.
/// Failures are carried in the [`FetchOutcome`], never raised: one broken
/// provider must not take down a refresh that spans several.
#[async_trait::async_trait]
pub trait ContentProvider: Send + Sync {
    /// Stable provider name, used as the namespace of item identities.
    fn name(&self) -> &'static str;

    /// The kind of content this provider yields.
    fn content_type(&self) -> ContentType;

    /// Fetch up to `limit` items. `query` overrides the provider's default
    /// query where one applies; providers without a query concept ignore it.
    async fn fetch(&self, query: Option<&str>, limit: usize) -> FetchOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit_bounds() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(20), 20);
        assert_eq!(clamp_limit(500), MAX_FETCH_LIMIT);
    }
}
