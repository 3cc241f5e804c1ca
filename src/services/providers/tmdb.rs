/// TMDB trending provider
///
/// Pulls the weekly trending film/TV list and normalizes each entry into the
/// shared item shape. Identity is the TMDB numeric id namespaced under
/// "tmdb"; popularity signals (vote average on a 0-10 scale plus vote count)
/// ride along in the raw payload.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{ContentType, NormalizedContentItem},
    services::providers::{clamp_limit, ContentProvider, FetchOutcome},
    services::sanitize,
};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

const TRENDING_CACHE_TTL: u64 = 3600; // 1 hour

const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

/// One entry of the trending response. Movies carry `title`/`release_date`,
/// TV shows carry `name`/`first_air_date`; both are accepted.
#[derive(Debug, Deserialize)]
struct TmdbEntry {
    id: i64,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    vote_average: Option<f64>,
    vote_count: Option<i64>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrendingResponse {
    results: Vec<TmdbEntry>,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            cache,
        }
    }

    fn enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn fetch_trending(&self, limit: usize) -> AppResult<Vec<NormalizedContentItem>> {
        cached!(
            self.cache,
            CacheKey::ProviderFetch("tmdb".to_string(), "trending".to_string(), limit),
            TRENDING_CACHE_TTL,
            async move {
                let url = format!("{}/3/trending/all/week", self.api_url);

                let response = self
                    .http_client
                    .get(&url)
                    .query(&[("api_key", self.api_key.as_str())])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::Provider(format!(
                        "TMDB API returned status {}: {}",
                        status, body
                    )));
                }

                let trending: TrendingResponse = response.json().await?;

                let items: Vec<NormalizedContentItem> = trending
                    .results
                    .into_iter()
                    .filter_map(normalize_entry)
                    .take(limit)
                    .collect();

                tracing::info!(
                    items = items.len(),
                    provider = "tmdb",
                    "Trending fetch completed"
                );

                Ok(items)
            }
        )
    }
}

/// Converts one trending entry. Entries with neither a title nor a name are
/// dropped.
fn normalize_entry(entry: TmdbEntry) -> Option<NormalizedContentItem> {
    let title = entry.title.or(entry.name)?;
    let title = sanitize::clean(&title);
    if title.is_empty() {
        return None;
    }

    let media_type = entry.media_type.unwrap_or_else(|| "movie".to_string());

    Some(NormalizedContentItem {
        provider: "tmdb".to_string(),
        provider_id: entry.id.to_string(),
        content_type: ContentType::Watch,
        title,
        description: entry.overview.as_deref().and_then(sanitize::clean_opt),
        image_url: entry
            .poster_path
            .as_deref()
            .map(|path| format!("{}{}", POSTER_BASE_URL, path)),
        url: Some(format!("https://www.themoviedb.org/{}/{}", media_type, entry.id)),
        raw: json!({
            "vote_average": entry.vote_average,
            "vote_count": entry.vote_count,
            "release_date": entry.release_date,
            "first_air_date": entry.first_air_date,
            "media_type": media_type,
        }),
    })
}

#[async_trait::async_trait]
impl ContentProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn content_type(&self) -> ContentType {
        ContentType::Watch
    }

    async fn fetch(&self, _query: Option<&str>, limit: usize) -> FetchOutcome {
        if !self.enabled() {
            return FetchOutcome::Disabled;
        }

        match self.fetch_trending(clamp_limit(limit)).await {
            Ok(items) => FetchOutcome::Success { items },
            Err(e) => FetchOutcome::Error {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_json(media_type: &str) -> TmdbEntry {
        serde_json::from_value(json!({
            "id": 27205,
            "title": if media_type == "movie" { Some("Inception") } else { None },
            "name": if media_type == "tv" { Some("Severance") } else { None },
            "overview": "A mind-bending story.",
            "poster_path": "/abc123.jpg",
            "vote_average": 8.4,
            "vote_count": 36000,
            "release_date": "2010-07-16",
            "media_type": media_type,
        }))
        .unwrap()
    }

    #[test]
    fn test_normalize_movie_entry() {
        let item = normalize_entry(entry_json("movie")).unwrap();
        assert_eq!(item.provider, "tmdb");
        assert_eq!(item.provider_id, "27205");
        assert_eq!(item.content_type, ContentType::Watch);
        assert_eq!(item.title, "Inception");
        assert_eq!(
            item.image_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc123.jpg")
        );
        assert_eq!(
            item.url.as_deref(),
            Some("https://www.themoviedb.org/movie/27205")
        );
        assert_eq!(item.raw["vote_average"], json!(8.4));
        assert_eq!(item.raw["vote_count"], json!(36000));
    }

    #[test]
    fn test_normalize_tv_entry_uses_name() {
        let item = normalize_entry(entry_json("tv")).unwrap();
        assert_eq!(item.title, "Severance");
        assert_eq!(item.url.as_deref(), Some("https://www.themoviedb.org/tv/27205"));
    }

    #[test]
    fn test_normalize_drops_untitled_entry() {
        let entry: TmdbEntry = serde_json::from_value(json!({ "id": 1 })).unwrap();
        assert!(normalize_entry(entry).is_none());
    }

    #[test]
    fn test_normalize_strips_markup_from_overview() {
        let entry: TmdbEntry = serde_json::from_value(json!({
            "id": 2,
            "title": "Test",
            "overview": "<b>Bold</b> claim",
        }))
        .unwrap();
        let item = normalize_entry(entry).unwrap();
        assert_eq!(item.description.as_deref(), Some("Bold claim"));
    }
}
