use std::sync::Arc;

use crate::db::{ContentStore, MemoryStore};
use crate::services::ingest::IngestionPipeline;
use crate::services::providers::FeedFetcher;
use crate::services::recommend::Recommender;
use crate::services::scoring::ScoringEngine;

/// Shared application state handed to every handler. The store itself stays
/// behind the recommender and the pipeline; handlers never touch it directly.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub pipeline: Arc<IngestionPipeline>,
}

impl AppState {
    pub fn new(recommender: Arc<Recommender>, pipeline: Arc<IngestionPipeline>) -> Self {
        Self {
            recommender,
            pipeline,
        }
    }

    /// State over an in-memory store with no catalog providers. Used by
    /// integration tests; also handy for local experiments without
    /// Postgres/Redis.
    pub fn in_memory() -> (Self, Arc<MemoryStore>) {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn ContentStore> = Arc::clone(&memory) as Arc<dyn ContentStore>;
        let recommender = Arc::new(Recommender::new(
            Arc::clone(&store),
            ScoringEngine::default(),
        ));
        let pipeline = Arc::new(IngestionPipeline::new(
            store,
            FeedFetcher::new(),
            Vec::new(),
        ));
        (Self::new(recommender, pipeline), memory)
    }
}
