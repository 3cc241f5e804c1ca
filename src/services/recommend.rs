/// Unified recommender: merges the internal catalog pool and the external
/// cache pool into one scored, diversity-balanced, deduplicated result.
use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::db::ContentStore;
use crate::error::AppResult;
use crate::models::{Candidate, Focus, RecommendationContext, ScoredCandidate, UserState};
use crate::services::{diversity, scoring::ScoringEngine};

/// Content kinds served per focus. A focus outside this table yields an
/// empty result rather than unrelated fallback content.
fn allowed_kinds(focus: Focus) -> &'static [&'static str] {
    match focus {
        Focus::Watch => &["film", "video"],
        Focus::Read => &["article", "book"],
        Focus::Music => &["audio", "playlist"],
        Focus::Move => &["activity", "event"],
        Focus::Create => &["activity", "prompt"],
        Focus::Reflect => &["article", "prompt"],
    }
}

pub struct Recommender {
    store: Arc<dyn ContentStore>,
    engine: ScoringEngine,
}

impl Recommender {
    pub fn new(store: Arc<dyn ContentStore>, engine: ScoringEngine) -> Self {
        Self { store, engine }
    }

    /// Computes up to `limit` recommendations for the context:
    /// internal catalog (state-filtered, scored, diversity-selected), a
    /// universal-items cascade when under-filled, then the external cache
    /// pool merged in, deduplicated, and re-ranked by score.
    pub async fn recommend(
        &self,
        ctx: &RecommendationContext,
        limit: usize,
    ) -> AppResult<Vec<ScoredCandidate>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let kinds = allowed_kinds(ctx.focus);

        // Internal pool.
        let catalog = self.store.catalog_by_kinds(kinds).await?;
        let eligible: Vec<Candidate> = catalog
            .into_iter()
            .filter(|item| {
                ctx.state == UserState::Blank
                    || item.states.is_empty()
                    || item.states.contains(&ctx.state)
            })
            .map(Candidate::from)
            .collect();

        let scored = self.engine.score_all(eligible, ctx);
        let mut selected = diversity::select_diverse(scored, limit);

        // Cascade: top up from universal items of the same kinds, newest
        // first, excluding what is already selected.
        if selected.len() < limit {
            let exclude: Vec<Uuid> = selected
                .iter()
                .filter_map(|s| Uuid::parse_str(&s.candidate.id).ok())
                .collect();
            let universal = self
                .store
                .universal_catalog_by_kinds(kinds, &exclude)
                .await?;
            let extra: Vec<Candidate> = universal
                .into_iter()
                .take(limit - selected.len())
                .map(Candidate::from)
                .collect();
            selected.extend(self.engine.score_all(extra, ctx));
        }

        // External pool. Errors degrade to internal-only results.
        let external = self.external_candidates(ctx).await;
        let external_scored = self.engine.score_all(external, ctx);

        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut merged: Vec<ScoredCandidate> = Vec::new();
        for scored in selected.into_iter().chain(external_scored) {
            if !seen_ids.insert(scored.candidate.id.clone()) {
                continue;
            }
            if let Some(url) = &scored.candidate.url {
                if !seen_urls.insert(url.clone()) {
                    continue;
                }
            }
            merged.push(scored);
        }

        merged.sort_by(|a, b| {
            b.breakdown
                .total
                .partial_cmp(&a.breakdown.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.candidate.timestamp.cmp(&a.candidate.timestamp))
        });
        merged.truncate(limit);

        Ok(merged)
    }

    /// Cached external items matching the context: (mode, focus) first,
    /// focus-only when that finds nothing. Store failures are logged and
    /// treated as an empty pool.
    async fn external_candidates(&self, ctx: &RecommendationContext) -> Vec<Candidate> {
        let narrow = self
            .store
            .items_by_tag_filter(Some(ctx.mode), Some(ctx.focus))
            .await;

        let items = match narrow {
            Ok(items) if !items.is_empty() => Ok(items),
            Ok(_) => self.store.items_by_tag_filter(None, Some(ctx.focus)).await,
            Err(e) => Err(e),
        };

        match items {
            Ok(items) => items.into_iter().map(Candidate::from).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "External pool unavailable, serving internal-only");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{CatalogItem, ContentTag, ContentType, Mode, NormalizedContentItem};
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn catalog_item(title: &str, kind: &str, modes: Vec<Mode>, states: Vec<UserState>) -> CatalogItem {
        CatalogItem {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            kind: kind.to_string(),
            url: None,
            image_url: None,
            modes,
            focuses: vec![Focus::Read],
            states,
            created_at: Utc::now() - Duration::days(1),
        }
    }

    fn ctx(state: UserState, mode: Mode, focus: Focus) -> RecommendationContext {
        RecommendationContext { state, mode, focus }
    }

    fn recommender(store: Arc<MemoryStore>) -> Recommender {
        Recommender::new(store, ScoringEngine::default())
    }

    #[tokio::test]
    async fn test_empty_store_yields_empty_result() {
        let store = Arc::new(MemoryStore::new());
        let r = recommender(store);
        let out = r
            .recommend(&ctx(UserState::Blank, Mode::Calm, Focus::Read), 10)
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_state_filter_keeps_universal_and_matching() {
        let store = Arc::new(MemoryStore::new());
        store.seed_catalog(vec![
            catalog_item("For the anxious", "article", vec![Mode::Calm], vec![UserState::Anxious]),
            catalog_item("Universal", "article", vec![Mode::Calm], vec![]),
            catalog_item("For the sad", "article", vec![Mode::Calm], vec![UserState::Sad]),
        ]);
        let r = recommender(store);
        let out = r
            .recommend(&ctx(UserState::Anxious, Mode::Calm, Focus::Read), 10)
            .await
            .unwrap();
        let titles: Vec<&str> = out.iter().map(|s| s.candidate.title.as_str()).collect();
        assert!(titles.contains(&"For the anxious"));
        assert!(titles.contains(&"Universal"));
        assert!(!titles.contains(&"For the sad"));
    }

    #[tokio::test]
    async fn test_blank_state_keeps_everything() {
        let store = Arc::new(MemoryStore::new());
        store.seed_catalog(vec![
            catalog_item("A", "article", vec![Mode::Calm], vec![UserState::Anxious]),
            catalog_item("B", "article", vec![Mode::Calm], vec![]),
        ]);
        let r = recommender(store);
        let out = r
            .recommend(&ctx(UserState::Blank, Mode::Calm, Focus::Read), 10)
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn test_mode_match_ranks_first() {
        let store = Arc::new(MemoryStore::new());
        store.seed_catalog(vec![
            catalog_item("Off mode", "article", vec![Mode::Energy], vec![]),
            catalog_item("On mode", "article", vec![Mode::Calm], vec![]),
        ]);
        let r = recommender(store);
        let out = r
            .recommend(&ctx(UserState::Blank, Mode::Calm, Focus::Read), 10)
            .await
            .unwrap();
        assert_eq!(out[0].candidate.title, "On mode");
        assert!(out[0].breakdown.mode_match > 0.0);
    }

    #[tokio::test]
    async fn test_external_pool_merges_and_dedups_by_url() {
        let store = Arc::new(MemoryStore::new());
        store.seed_catalog(vec![CatalogItem {
            url: Some("https://example.com/shared".to_string()),
            ..catalog_item("Internal copy", "article", vec![Mode::Calm], vec![])
        }]);

        let items = vec![
            NormalizedContentItem {
                provider: "feed".to_string(),
                provider_id: "ext-1".to_string(),
                content_type: ContentType::Read,
                title: "External only".to_string(),
                description: None,
                image_url: None,
                url: Some("https://example.com/unique".to_string()),
                raw: json!({}),
            },
            NormalizedContentItem {
                provider: "feed".to_string(),
                provider_id: "ext-2".to_string(),
                content_type: ContentType::Read,
                title: "External duplicate".to_string(),
                description: None,
                image_url: None,
                url: Some("https://example.com/shared".to_string()),
                raw: json!({}),
            },
        ];
        let ids = store.upsert_items(&items).await.unwrap();
        for id in &ids {
            store
                .replace_tags(
                    *id,
                    &[ContentTag {
                        mode: Mode::Calm,
                        focus: Focus::Read,
                    }],
                )
                .await
                .unwrap();
        }

        let r = recommender(store);
        let out = r
            .recommend(&ctx(UserState::Blank, Mode::Calm, Focus::Read), 10)
            .await
            .unwrap();
        let titles: Vec<&str> = out.iter().map(|s| s.candidate.title.as_str()).collect();
        assert!(titles.contains(&"Internal copy"));
        assert!(titles.contains(&"External only"));
        // Same URL as the internal item, so the external copy is dropped.
        assert!(!titles.contains(&"External duplicate"));
    }

    #[tokio::test]
    async fn test_limit_is_respected() {
        let store = Arc::new(MemoryStore::new());
        let items: Vec<CatalogItem> = (0..10)
            .map(|i| catalog_item(&format!("Item {i}"), "article", vec![Mode::Calm], vec![]))
            .collect();
        store.seed_catalog(items);
        let r = recommender(store);
        let out = r
            .recommend(&ctx(UserState::Blank, Mode::Calm, Focus::Read), 3)
            .await
            .unwrap();
        assert_eq!(out.len(), 3);
    }

    #[tokio::test]
    async fn test_focus_without_matching_kinds_is_empty() {
        let store = Arc::new(MemoryStore::new());
        store.seed_catalog(vec![catalog_item("Article", "article", vec![Mode::Calm], vec![])]);
        let r = recommender(store);
        let out = r
            .recommend(&ctx(UserState::Blank, Mode::Calm, Focus::Music), 10)
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_universal_cascade_fills_under_limit() {
        let store = Arc::new(MemoryStore::new());
        store.seed_catalog(vec![
            catalog_item("Stateful", "article", vec![Mode::Calm], vec![UserState::Anxious]),
            catalog_item("Universal backfill", "article", vec![Mode::Energy], vec![]),
        ]);
        let r = recommender(store);
        let out = r
            .recommend(&ctx(UserState::Anxious, Mode::Calm, Focus::Read), 5)
            .await
            .unwrap();
        let titles: Vec<&str> = out.iter().map(|s| s.candidate.title.as_str()).collect();
        assert!(titles.contains(&"Stateful"));
        assert!(titles.contains(&"Universal backfill"));
    }
}
