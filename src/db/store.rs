use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    CachedItem, CatalogItem, ContentKey, ContentTag, ContentType, FeedSource, Focus, Mode,
    NormalizedContentItem, TaggedItem, UserState,
};

/// Read/write interface over the content store: the external cache of
/// normalized items plus their tags, the internal catalog, and feed-source
/// configuration. The store is an opaque keyed table with upsert-by-unique-
/// key semantics; persistence details stay behind this trait.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upserts normalized items keyed on (provider, provider_id). The
    /// conflict policy is full-record replace of the non-key fields.
    /// Returns the stored row ids in input order.
    async fn upsert_items(&self, items: &[NormalizedContentItem]) -> AppResult<Vec<Uuid>>;

    /// Replaces the tag rows of one cached item: delete-then-insert inside a
    /// single transaction so no partial tag set is observable.
    async fn replace_tags(&self, cache_id: Uuid, tags: &[ContentTag]) -> AppResult<()>;

    /// Returns cached items whose tag rows match the filter. AND semantics
    /// when both are supplied; omit either to widen the match.
    async fn items_by_tag_filter(
        &self,
        mode: Option<Mode>,
        focus: Option<Focus>,
    ) -> AppResult<Vec<TaggedItem>>;

    /// Internal catalog items of the given kinds, newest first.
    async fn catalog_by_kinds(&self, kinds: &[&str]) -> AppResult<Vec<CatalogItem>>;

    /// Catalog items of the given kinds with no state tags (universal),
    /// newest first, excluding the given ids.
    async fn universal_catalog_by_kinds(
        &self,
        kinds: &[&str],
        exclude: &[Uuid],
    ) -> AppResult<Vec<CatalogItem>>;

    /// Enabled syndicated feed sources.
    async fn enabled_feed_sources(&self) -> AppResult<Vec<FeedSource>>;
}

// ============================================================================
// Postgres implementation
// ============================================================================

pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn tags_for(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<ContentTag>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<TagRow> = sqlx::query_as(
            "SELECT cache_id, mode, focus FROM content_tags WHERE cache_id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<ContentTag>> = HashMap::new();
        for row in rows {
            if let Some(tag) = row.tag() {
                grouped.entry(row.cache_id).or_default().push(tag);
            }
        }
        Ok(grouped)
    }
}

#[derive(sqlx::FromRow)]
struct CacheRow {
    id: Uuid,
    provider: String,
    provider_id: String,
    content_type: String,
    title: String,
    description: Option<String>,
    image_url: Option<String>,
    url: Option<String>,
    raw: serde_json::Value,
    fetched_at: DateTime<Utc>,
}

impl CacheRow {
    fn into_item(self) -> Option<CachedItem> {
        let Some(content_type) = ContentType::parse(&self.content_type) else {
            tracing::warn!(
                content_type = %self.content_type,
                id = %self.id,
                "Unknown content type in cache row, skipping"
            );
            return None;
        };
        Some(CachedItem {
            id: self.id,
            item: NormalizedContentItem {
                provider: self.provider,
                provider_id: self.provider_id,
                content_type,
                title: self.title,
                description: self.description,
                image_url: self.image_url,
                url: self.url,
                raw: self.raw,
            },
            fetched_at: self.fetched_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TagRow {
    cache_id: Uuid,
    mode: String,
    focus: String,
}

impl TagRow {
    fn tag(&self) -> Option<ContentTag> {
        let mode = Mode::parse(&self.mode)?;
        let focus = Focus::parse(&self.focus)?;
        Some(ContentTag { mode, focus })
    }
}

#[derive(sqlx::FromRow)]
struct CatalogRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    kind: String,
    url: Option<String>,
    image_url: Option<String>,
    modes: Vec<String>,
    focuses: Vec<String>,
    states: Vec<String>,
    created_at: DateTime<Utc>,
}

impl CatalogRow {
    fn into_item(self) -> CatalogItem {
        CatalogItem {
            id: self.id,
            title: self.title,
            description: self.description,
            kind: self.kind,
            url: self.url,
            image_url: self.image_url,
            modes: self.modes.iter().filter_map(|m| Mode::parse(m)).collect(),
            focuses: self.focuses.iter().filter_map(|f| Focus::parse(f)).collect(),
            states: self.states.iter().filter_map(|s| UserState::parse(s)).collect(),
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FeedSourceRow {
    id: Uuid,
    url: String,
    name: String,
    enabled: bool,
    curated_modes: Vec<String>,
}

const CACHE_COLUMNS: &str =
    "id, provider, provider_id, content_type, title, description, image_url, url, raw, fetched_at";

const CATALOG_COLUMNS: &str =
    "id, title, description, kind, url, image_url, modes, focuses, states, created_at";

#[async_trait]
impl ContentStore for PgContentStore {
    async fn upsert_items(&self, items: &[NormalizedContentItem]) -> AppResult<Vec<Uuid>> {
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO content_cache
                    (id, provider, provider_id, content_type, title, description,
                     image_url, url, raw, fetched_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
                ON CONFLICT (provider, provider_id) DO UPDATE SET
                    content_type = EXCLUDED.content_type,
                    title = EXCLUDED.title,
                    description = EXCLUDED.description,
                    image_url = EXCLUDED.image_url,
                    url = EXCLUDED.url,
                    raw = EXCLUDED.raw,
                    fetched_at = EXCLUDED.fetched_at
                RETURNING id
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&item.provider)
            .bind(&item.provider_id)
            .bind(item.content_type.as_str())
            .bind(&item.title)
            .bind(&item.description)
            .bind(&item.image_url)
            .bind(&item.url)
            .bind(&item.raw)
            .fetch_one(&self.pool)
            .await?;
            ids.push(id);
        }
        Ok(ids)
    }

    async fn replace_tags(&self, cache_id: Uuid, tags: &[ContentTag]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM content_tags WHERE cache_id = $1")
            .bind(cache_id)
            .execute(&mut *tx)
            .await?;
        for tag in tags {
            sqlx::query(
                "INSERT INTO content_tags (cache_id, mode, focus) VALUES ($1, $2, $3)
                 ON CONFLICT DO NOTHING",
            )
            .bind(cache_id)
            .bind(tag.mode.as_str())
            .bind(tag.focus.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn items_by_tag_filter(
        &self,
        mode: Option<Mode>,
        focus: Option<Focus>,
    ) -> AppResult<Vec<TaggedItem>> {
        let rows: Vec<CacheRow> = sqlx::query_as(&format!(
            r#"
            SELECT {CACHE_COLUMNS} FROM content_cache c
            WHERE EXISTS (
                SELECT 1 FROM content_tags t
                WHERE t.cache_id = c.id
                  AND ($1::text IS NULL OR t.mode = $1)
                  AND ($2::text IS NULL OR t.focus = $2)
            )
            ORDER BY c.fetched_at DESC
            "#
        ))
        .bind(mode.map(|m| m.as_str().to_string()))
        .bind(focus.map(|f| f.as_str().to_string()))
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<CachedItem> = rows.into_iter().filter_map(CacheRow::into_item).collect();
        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let mut tags = self.tags_for(&ids).await?;

        Ok(items
            .into_iter()
            .map(|item| {
                let item_tags = tags.remove(&item.id).unwrap_or_default();
                TaggedItem {
                    item,
                    tags: item_tags,
                }
            })
            .collect())
    }

    async fn catalog_by_kinds(&self, kinds: &[&str]) -> AppResult<Vec<CatalogItem>> {
        let kinds: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
        let rows: Vec<CatalogRow> = sqlx::query_as(&format!(
            "SELECT {CATALOG_COLUMNS} FROM catalog_items
             WHERE kind = ANY($1) ORDER BY created_at DESC",
        ))
        .bind(kinds)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CatalogRow::into_item).collect())
    }

    async fn universal_catalog_by_kinds(
        &self,
        kinds: &[&str],
        exclude: &[Uuid],
    ) -> AppResult<Vec<CatalogItem>> {
        let kinds: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
        let rows: Vec<CatalogRow> = sqlx::query_as(&format!(
            "SELECT {CATALOG_COLUMNS} FROM catalog_items
             WHERE kind = ANY($1)
               AND cardinality(states) = 0
               AND NOT (id = ANY($2))
             ORDER BY created_at DESC",
        ))
        .bind(kinds)
        .bind(exclude.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CatalogRow::into_item).collect())
    }

    async fn enabled_feed_sources(&self) -> AppResult<Vec<FeedSource>> {
        let rows: Vec<FeedSourceRow> = sqlx::query_as(
            "SELECT id, url, name, enabled, curated_modes FROM feed_sources
             WHERE enabled ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| FeedSource {
                id: row.id,
                url: row.url,
                name: row.name,
                enabled: row.enabled,
                curated_modes: row
                    .curated_modes
                    .iter()
                    .filter_map(|m| Mode::parse(m))
                    .collect(),
            })
            .collect())
    }
}

// ============================================================================
// In-memory implementation (tests and local development)
// ============================================================================

#[derive(Default)]
struct MemoryInner {
    items: HashMap<ContentKey, CachedItem>,
    tags: HashMap<Uuid, Vec<ContentTag>>,
    catalog: Vec<CatalogItem>,
    sources: Vec<FeedSource>,
}

/// ContentStore backed by process memory. Used by tests and as a reference
/// for the upsert/replace semantics the Postgres store must honor.
#[derive(Default)]
pub struct MemoryStore {
    inner: std::sync::Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_catalog(&self, items: Vec<CatalogItem>) {
        self.inner.lock().unwrap().catalog.extend(items);
    }

    pub fn seed_feed_sources(&self, sources: Vec<FeedSource>) {
        self.inner.lock().unwrap().sources.extend(sources);
    }

    pub fn cached_count(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn upsert_items(&self, items: &[NormalizedContentItem]) -> AppResult<Vec<Uuid>> {
        let mut inner = self.inner.lock().unwrap();
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let key = item.key();
            let id = inner.items.get(&key).map(|existing| existing.id).unwrap_or_else(Uuid::new_v4);
            inner.items.insert(
                key,
                CachedItem {
                    id,
                    item: item.clone(),
                    fetched_at: Utc::now(),
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    async fn replace_tags(&self, cache_id: Uuid, tags: &[ContentTag]) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.tags.insert(cache_id, tags.to_vec());
        Ok(())
    }

    async fn items_by_tag_filter(
        &self,
        mode: Option<Mode>,
        focus: Option<Focus>,
    ) -> AppResult<Vec<TaggedItem>> {
        let inner = self.inner.lock().unwrap();
        let mut matched: Vec<TaggedItem> = inner
            .items
            .values()
            .filter_map(|cached| {
                let tags = inner.tags.get(&cached.id).cloned().unwrap_or_default();
                let hit = tags.iter().any(|tag| {
                    mode.map(|m| tag.mode == m).unwrap_or(true)
                        && focus.map(|f| tag.focus == f).unwrap_or(true)
                });
                hit.then(|| TaggedItem {
                    item: cached.clone(),
                    tags,
                })
            })
            .collect();
        matched.sort_by(|a, b| b.item.fetched_at.cmp(&a.item.fetched_at));
        Ok(matched)
    }

    async fn catalog_by_kinds(&self, kinds: &[&str]) -> AppResult<Vec<CatalogItem>> {
        let inner = self.inner.lock().unwrap();
        let mut items: Vec<CatalogItem> = inner
            .catalog
            .iter()
            .filter(|item| kinds.contains(&item.kind.as_str()))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn universal_catalog_by_kinds(
        &self,
        kinds: &[&str],
        exclude: &[Uuid],
    ) -> AppResult<Vec<CatalogItem>> {
        let inner = self.inner.lock().unwrap();
        let mut items: Vec<CatalogItem> = inner
            .catalog
            .iter()
            .filter(|item| {
                kinds.contains(&item.kind.as_str())
                    && item.states.is_empty()
                    && !exclude.contains(&item.id)
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn enabled_feed_sources(&self) -> AppResult<Vec<FeedSource>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.sources.iter().filter(|s| s.enabled).cloned().collect())
    }
}
