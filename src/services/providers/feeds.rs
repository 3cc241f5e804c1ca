/// Syndicated feed fetcher
///
/// Downloads and parses RSS/Atom feeds and normalizes entries into the
/// shared item shape under the "feed" provider namespace. Parsing is strict
/// about identity and time: entries without an id or link, or without a
/// published/updated timestamp, are dropped rather than guessed at.
use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use reqwest::Client as HttpClient;
use serde_json::json;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::models::{ContentType, NormalizedContentItem};
use crate::services::sanitize;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct FeedFetcher {
    http_client: HttpClient,
}

impl Default for FeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedFetcher {
    pub fn new() -> Self {
        Self {
            http_client: HttpClient::builder()
                .timeout(FETCH_TIMEOUT)
                .user_agent("solace-api/0.1")
                .build()
                .unwrap_or_default(),
        }
    }

    /// Downloads one feed and returns its normalized entries, newest first.
    pub async fn fetch_feed(&self, url: &str) -> AppResult<Vec<NormalizedContentItem>> {
        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "Feed {} returned status {}",
                url,
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        let feed = feed_rs::parser::parse(&bytes[..])
            .map_err(|e| AppError::Provider(format!("Failed to parse feed {}: {}", url, e)))?;

        let mut items: Vec<NormalizedContentItem> = feed
            .entries
            .into_iter()
            .filter_map(normalize_entry)
            .collect();

        items.sort_by(|a, b| published(b).cmp(&published(a)));

        tracing::debug!(url = %url, items = items.len(), "Feed fetched");
        Ok(items)
    }
}

fn published(item: &NormalizedContentItem) -> Option<DateTime<Utc>> {
    item.raw["published"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Converts one feed entry. Identity is the entry id, falling back to the
/// first link; entries with neither, without a title, or without any
/// timestamp are dropped.
pub fn normalize_entry(entry: Entry) -> Option<NormalizedContentItem> {
    let link = entry.links.first().map(|l| l.href.clone());

    let provider_id = if entry.id.trim().is_empty() {
        link.clone()?
    } else {
        entry.id.clone()
    };

    let title = sanitize::clean(&entry.title.as_ref()?.content);
    if title.is_empty() {
        return None;
    }

    let timestamp = entry.published.or(entry.updated)?;

    let summary = entry
        .summary
        .as_ref()
        .and_then(|text| sanitize::clean_opt(&text.content));

    let author = entry.authors.first().map(|person| person.name.clone());

    let categories: Vec<String> = entry
        .categories
        .iter()
        .map(|c| c.term.clone())
        .filter(|term| !term.trim().is_empty())
        .collect();

    let image_url = entry
        .media
        .iter()
        .flat_map(|media| media.thumbnails.iter())
        .map(|thumb| thumb.image.uri.clone())
        .next();

    Some(NormalizedContentItem {
        provider: "feed".to_string(),
        provider_id,
        content_type: ContentType::Read,
        title,
        description: summary.clone(),
        image_url,
        url: link.clone(),
        raw: json!({
            "link": link,
            "published": timestamp.to_rfc3339(),
            "author": author,
            "categories": categories,
            "summary": summary,
        }),
    })
}
