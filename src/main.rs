use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use solace_api::api::{create_router, AppState};
use solace_api::config::Config;
use solace_api::db::{self, ContentStore, PgContentStore};
use solace_api::services::ingest::IngestionPipeline;
use solace_api::services::providers::{
    ContentProvider, FeedFetcher, OpenLibraryProvider, TmdbProvider,
};
use solace_api::services::recommend::Recommender;
use solace_api::services::scoring::ScoringEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let redis_client = db::create_redis_client(&config.redis_url)?;
    let (cache, _cache_writer) = db::Cache::new(redis_client).await;

    let store: Arc<dyn ContentStore> = Arc::new(PgContentStore::new(pool));

    let providers: Vec<Arc<dyn ContentProvider>> = vec![
        Arc::new(TmdbProvider::new(
            cache.clone(),
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
        )),
        Arc::new(OpenLibraryProvider::new(
            cache.clone(),
            config.openlibrary_api_url.clone(),
            config.openlibrary_default_query.clone(),
            config.openlibrary_enabled,
        )),
    ];

    let recommender = Arc::new(Recommender::new(
        Arc::clone(&store),
        ScoringEngine::default(),
    ));
    let pipeline = Arc::new(IngestionPipeline::new(store, FeedFetcher::new(), providers));

    let state = AppState::new(recommender, pipeline);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server started");
    axum::serve(listener, app).await?;

    Ok(())
}
