/// Ingestion pipeline: pulls syndicated feeds and catalog providers,
/// classifies the results, and writes them to the content store. Sources are
/// isolated from each other; one broken feed is reported in the outcome
/// list, never propagated.
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::db::ContentStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    published_from_raw, ContentKey, ContentTag, Mode, NormalizedContentItem,
};
use crate::services::providers::{clamp_limit, ContentProvider, FeedFetcher, FetchOutcome};
use crate::services::{keywords, tagging};

const DEFAULT_MAX_FEEDS: usize = 25;
const MAX_FEEDS_CAP: usize = 50;
const DEFAULT_PER_FEED_LIMIT: usize = 100;
const MIN_PER_FEED_LIMIT: usize = 25;
const MAX_PER_FEED_LIMIT: usize = 200;

/// Feed entries older than this are dropped at ingestion time.
const FRESHNESS_WINDOW_DAYS: i64 = 7;

/// Minimum number of categorical tags before keyword extraction kicks in.
const MIN_CATEGORICAL_TAGS: usize = 3;

/// Caller-supplied knobs for one feed-ingestion run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestOptions {
    /// Explicit feed URLs; when absent, enabled sources from the store.
    pub sources: Option<Vec<String>>,
    pub max_feeds: Option<usize>,
    pub per_feed_limit: Option<usize>,
}

/// What happened to one source during a run.
#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub source: String,
    pub fetched: usize,
    pub kept: usize,
    pub upserted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceOutcome {
    fn failed(source: String, error: String) -> Self {
        Self {
            source,
            fetched: 0,
            kept: 0,
            upserted: 0,
            error: Some(error),
        }
    }
}

/// Aggregate report for one run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub sources: Vec<SourceOutcome>,
    pub total_upserted: usize,
}

impl IngestReport {
    fn from_outcomes(sources: Vec<SourceOutcome>) -> Self {
        let total_upserted = sources.iter().map(|s| s.upserted).sum();
        Self {
            sources,
            total_upserted,
        }
    }
}

#[derive(Debug, Clone)]
struct SourceSpec {
    url: String,
    name: String,
    curated_modes: Vec<Mode>,
}

pub struct IngestionPipeline {
    store: Arc<dyn ContentStore>,
    fetcher: FeedFetcher,
    providers: Vec<Arc<dyn ContentProvider>>,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn ContentStore>,
        fetcher: FeedFetcher,
        providers: Vec<Arc<dyn ContentProvider>>,
    ) -> Self {
        Self {
            store,
            fetcher,
            providers,
        }
    }

    /// Ingests syndicated feeds. Each source runs in its own task; a failed
    /// source produces a failed outcome while the rest continue.
    pub async fn ingest_feeds(&self, options: IngestOptions) -> AppResult<IngestReport> {
        let max_feeds = options
            .max_feeds
            .unwrap_or(DEFAULT_MAX_FEEDS)
            .clamp(1, MAX_FEEDS_CAP);
        let per_feed_limit = options
            .per_feed_limit
            .unwrap_or(DEFAULT_PER_FEED_LIMIT)
            .clamp(MIN_PER_FEED_LIMIT, MAX_PER_FEED_LIMIT);

        let mut specs: Vec<SourceSpec> = match options.sources {
            Some(urls) => urls
                .into_iter()
                .map(|url| SourceSpec {
                    name: url.clone(),
                    url,
                    curated_modes: Vec::new(),
                })
                .collect(),
            None => self
                .store
                .enabled_feed_sources()
                .await?
                .into_iter()
                .map(|source| SourceSpec {
                    url: source.url,
                    name: source.name,
                    curated_modes: source.curated_modes,
                })
                .collect(),
        };
        specs.truncate(max_feeds);

        let mut tasks = Vec::with_capacity(specs.len());
        for spec in specs {
            let store = Arc::clone(&self.store);
            let fetcher = self.fetcher.clone();
            tasks.push(tokio::spawn(async move {
                Self::ingest_one_feed(store, fetcher, spec, per_feed_limit).await
            }));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!(error = %e, "Feed ingestion task panicked");
                    outcomes.push(SourceOutcome::failed("<unknown>".to_string(), e.to_string()));
                }
            }
        }

        let report = IngestReport::from_outcomes(outcomes);
        tracing::info!(
            sources = report.sources.len(),
            upserted = report.total_upserted,
            "Feed ingestion completed"
        );
        Ok(report)
    }

    async fn ingest_one_feed(
        store: Arc<dyn ContentStore>,
        fetcher: FeedFetcher,
        spec: SourceSpec,
        per_feed_limit: usize,
    ) -> SourceOutcome {
        let items = match fetcher.fetch_feed(&spec.url).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(source = %spec.name, error = %e, "Feed fetch failed");
                return SourceOutcome::failed(spec.name, e.to_string());
            }
        };
        let fetched = items.len();

        let cutoff = Utc::now() - Duration::days(FRESHNESS_WINDOW_DAYS);
        let recent: Vec<NormalizedContentItem> = items
            .into_iter()
            .filter(|item| matches!(published_from_raw(&item.raw), Some(ts) if ts >= cutoff))
            .take(per_feed_limit)
            .collect();
        let kept = recent.len();

        let overrides = tagging::TagOverrides {
            modes: spec.curated_modes.clone(),
            focuses: Vec::new(),
        };

        match Self::classify_and_store(store, recent, &overrides).await {
            Ok(upserted) => SourceOutcome {
                source: spec.name,
                fetched,
                kept,
                upserted,
                error: None,
            },
            Err(e) => {
                tracing::error!(source = %spec.name, error = %e, "Feed store write failed");
                SourceOutcome::failed(spec.name, e.to_string())
            }
        }
    }

    /// Refreshes every configured catalog provider. Disabled and failed
    /// providers yield empty outcomes; successes are tagged and upserted
    /// without a freshness window.
    pub async fn refresh_providers(&self, limit: usize) -> AppResult<IngestReport> {
        let limit = clamp_limit(limit);
        let mut outcomes = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let name = provider.name().to_string();
            let outcome = match provider.fetch(None, limit).await {
                FetchOutcome::Disabled => {
                    tracing::warn!(provider = %name, "Provider disabled, skipping refresh");
                    SourceOutcome {
                        source: name,
                        fetched: 0,
                        kept: 0,
                        upserted: 0,
                        error: None,
                    }
                }
                FetchOutcome::Error { message } => {
                    tracing::error!(provider = %name, error = %message, "Provider refresh failed");
                    SourceOutcome::failed(name, message)
                }
                FetchOutcome::Success { items } => {
                    let fetched = items.len();
                    let store = Arc::clone(&self.store);
                    match Self::classify_and_store(store, items, &tagging::TagOverrides::default())
                        .await
                    {
                        Ok(upserted) => SourceOutcome {
                            source: name,
                            fetched,
                            kept: fetched,
                            upserted,
                            error: None,
                        },
                        Err(e) => {
                            tracing::error!(provider = %name, error = %e, "Provider store write failed");
                            SourceOutcome::failed(name, e.to_string())
                        }
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(IngestReport::from_outcomes(outcomes))
    }

    /// Tags a batch, annotates quality, dedups within the batch, and writes
    /// items plus their tag rows to the store.
    async fn classify_and_store(
        store: Arc<dyn ContentStore>,
        items: Vec<NormalizedContentItem>,
        overrides: &tagging::TagOverrides,
    ) -> AppResult<usize> {
        let mut deduped: HashMap<ContentKey, (NormalizedContentItem, Vec<ContentTag>)> =
            HashMap::new();

        for mut item in items {
            let tags = derive_tags(&item, overrides);
            let quality = quality_score(&item);
            if let Some(raw) = item.raw.as_object_mut() {
                raw.insert("quality".to_string(), quality.into());
            }

            let key = item.key();
            match deduped.get(&key) {
                // Keep the variant with a usable timestamp.
                Some((existing, _))
                    if published_from_raw(&existing.raw).is_some()
                        && published_from_raw(&item.raw).is_none() => {}
                _ => {
                    deduped.insert(key, (item, tags));
                }
            }
        }

        let (batch, tag_sets): (Vec<NormalizedContentItem>, Vec<Vec<ContentTag>>) =
            deduped.into_values().unzip();
        if batch.is_empty() {
            return Ok(0);
        }

        let ids = store.upsert_items(&batch).await?;
        if ids.len() != batch.len() {
            return Err(AppError::Ingestion(format!(
                "Store returned {} ids for {} items",
                ids.len(),
                batch.len()
            )));
        }
        for (id, tags) in ids.iter().zip(tag_sets) {
            store.replace_tags(*id, &tags).await?;
        }
        Ok(ids.len())
    }
}

/// Derives the full tag set for one item: categorical tags from the raw
/// payload, keyword extraction when those come up short, mode inference over
/// the combined text, curated overrides merged additively, and finally the
/// cartesian product of modes and focuses.
pub fn derive_tags(item: &NormalizedContentItem, overrides: &tagging::TagOverrides) -> Vec<ContentTag> {
    let categories = categorical_tags(item);

    let mut topics = tagging::normalize_tags(&categories);
    if topics.len() < MIN_CATEGORICAL_TAGS {
        let text = match &item.description {
            Some(desc) => format!("{} {}", item.title, desc),
            None => item.title.clone(),
        };
        for keyword in keywords::extract(&text, keywords::DEFAULT_KEYWORD_COUNT) {
            if !topics.contains(&keyword) {
                topics.push(keyword);
            }
        }
    }

    let auto = tagging::TagResult {
        modes: tagging::infer_modes(
            &item.title,
            item.description.as_deref(),
            &categories,
            &topics,
        ),
        focus: tagging::infer_focus(item.content_type),
        topics,
    };
    let merged = tagging::merge_with_overrides(auto, overrides);
    let focuses = tagging::merged_focuses(merged.focus, overrides);

    let mut tags = Vec::with_capacity(merged.modes.len() * focuses.len());
    for mode in &merged.modes {
        for focus in &focuses {
            tags.push(ContentTag {
                mode: *mode,
                focus: *focus,
            });
        }
    }
    tags
}

/// Categorical labels embedded in the raw payload: feed categories or
/// provider subject lists.
fn categorical_tags(item: &NormalizedContentItem) -> Vec<String> {
    ["categories", "subjects"]
        .iter()
        .filter_map(|field| item.raw[*field].as_array())
        .flatten()
        .filter_map(|value| value.as_str())
        .map(|s| s.to_string())
        .collect()
}

/// Completeness heuristic stored alongside the item: base 1.0, plus bonuses
/// for an image, a substantive description, an author, a valid timestamp,
/// and any categorical tag.
pub fn quality_score(item: &NormalizedContentItem) -> f64 {
    let mut score = 1.0;
    if item.image_url.is_some() {
        score += 0.3;
    }
    if item.description.as_deref().map(str::len).unwrap_or(0) > 120 {
        score += 0.2;
    }
    if item.raw["author"].as_str().is_some() {
        score += 0.1;
    }
    if published_from_raw(&item.raw).is_some() {
        score += 0.2;
    }
    if !categorical_tags(item).is_empty() {
        score += 0.2;
    }
    score
}
