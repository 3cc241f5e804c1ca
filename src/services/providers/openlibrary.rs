/// Open Library search provider
///
/// Runs a subject search against the Open Library API and normalizes each
/// doc into the shared item shape. Identity is the work key namespaced under
/// "openlibrary"; reader ratings (0-5 scale) ride along in the raw payload.
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

const SEARCH_CACHE_TTL: u64 = 21600; // 6 hours

const COVER_BASE_URL: &str = "https://covers.openlibrary.org/b/id";

#[derive(Clone)]
pub struct OpenLibraryProvider {
    http_client: HttpClient,
    api_url: String,
    default_query: String,
    enabled: bool,
    cache: Cache,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    docs: Vec<OpenLibraryDoc>,
}

#[derive(Debug, Deserialize)]
struct OpenLibraryDoc {
    key: Option<String>,
    title: Option<String>,
    author_name: Option<Vec<String>>,
    cover_i: Option<i64>,
    first_sentence: Option<Vec<String>>,
    subject: Option<Vec<String>>,
    first_publish_year: Option<i32>,
    ratings_average: Option<f64>,
    ratings_count: Option<i64>,
}

impl OpenLibraryProvider {
    pub fn new(cache: Cache, api_url: String, default_query: String, enabled: bool) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
            default_query,
            enabled,
            cache,
        }
    }

    async fn search(&self, query: &str, limit: usize) -> AppResult<Vec<NormalizedContentItem>> {
        cached!(
            self.cache,
            CacheKey::ProviderFetch("openlibrary".to_string(), query.to_string(), limit),
            SEARCH_CACHE_TTL,
            async move {
                let url = format!("{}/search.json", self.api_url);

                let response = self
                    .http_client
                    .get(&url)
                    .query(&[("q", query), ("limit", &limit.to_string())])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::Provider(format!(
                        "Open Library API returned status {}: {}",
                        status, body
                    )));
                }

                let search: SearchResponse = response.json().await?;

                let items: Vec<NormalizedContentItem> = search
                    .docs
                    .into_iter()
                    .filter_map(normalize_doc)
                    .take(limit)
                    .collect();

                tracing::info!(
                    query = %query,
                    items = items.len(),
                    provider = "openlibrary",
                    "Book search completed"
                );

                Ok(items)
            }
        )
    }
}

/// Converts one search doc. Docs without a work key or a title carry no
/// usable identity and are dropped.
fn normalize_doc(doc: OpenLibraryDoc) -> Option<NormalizedContentItem> {
    let key = doc.key?;
    let title = sanitize::clean(&doc.title?);
    if title.is_empty() {
        return None;
    }

    let author = doc
        .author_name
        .as_ref()
        .and_then(|names| names.first())
        .cloned();

    let description = doc
        .first_sentence
        .as_ref()
        .and_then(|sentences| sentences.first())
        .and_then(|s| sanitize::clean_opt(s));

    Some(NormalizedContentItem {
        provider: "openlibrary".to_string(),
        provider_id: key.trim_start_matches("/works/").to_string(),
        content_type: ContentType::Read,
        title,
        description,
        image_url: doc
            .cover_i
            .map(|cover| format!("{}/{}-M.jpg", COVER_BASE_URL, cover)),
        url: Some(format!("https://openlibrary.org{}", key)),
        raw: json!({
            "author": author,
            "subjects": doc.subject.unwrap_or_default(),
            "first_publish_year": doc.first_publish_year,
            "ratings_average": doc.ratings_average,
            "ratings_count": doc.ratings_count,
        }),
    })
}

#[async_trait::async_trait]
impl ContentProvider for OpenLibraryProvider {
    fn name(&self) -> &'static str {
        "openlibrary"
    }

    fn content_type(&self) -> ContentType {
        ContentType::Read
    }

    async fn fetch(&self, query: Option<&str>, limit: usize) -> FetchOutcome {
        if !self.enabled {
            return FetchOutcome::Disabled;
        }

        let query = query.unwrap_or(&self.default_query);
        match self.search(query, clamp_limit(limit)).await {
            Ok(items) => FetchOutcome::Success { items },
            Err(e) => FetchOutcome::Error {
                message: e.to_string(),
            },
        }
    }
}
