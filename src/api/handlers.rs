use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::models::{
    Focus, Mode, RecommendationContext, ScoreBreakdown, ScoredCandidate, UserState,
};
use crate::services::ingest::{IngestOptions, IngestReport};

use super::AppState;

const DEFAULT_LIMIT: usize = 12;
const MAX_LIMIT: usize = 50;

const DEFAULT_PROVIDER_LIMIT: usize = 20;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendationsQuery {
    #[serde(default)]
    pub state: UserState,
    #[serde(default = "default_mode")]
    pub mode: Mode,
    pub focus: Focus,
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_breakdown: bool,
}

fn default_mode() -> Mode {
    Mode::DEFAULT
}

#[derive(Debug, Serialize)]
pub struct RecommendationItem {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}

impl RecommendationItem {
    fn from_scored(scored: ScoredCandidate, include_breakdown: bool) -> Self {
        Self {
            id: scored.candidate.id,
            title: scored.candidate.title,
            description: scored.candidate.description,
            kind: scored.candidate.kind,
            url: scored.candidate.url,
            image_url: scored.candidate.image_url,
            score: scored.breakdown.total,
            breakdown: include_breakdown.then_some(scored.breakdown),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshProvidersRequest {
    pub limit: Option<usize>,
}

// Handlers

pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// GET /api/v1/recommendations
pub async fn recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendationsQuery>,
) -> AppResult<Json<Vec<RecommendationItem>>> {
    let ctx = RecommendationContext {
        state: query.state,
        mode: query.mode,
        focus: query.focus,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let scored = state.recommender.recommend(&ctx, limit).await?;

    tracing::info!(
        state = %ctx.state,
        mode = %ctx.mode,
        focus = %ctx.focus,
        results = scored.len(),
        "Recommendations served"
    );

    Ok(Json(
        scored
            .into_iter()
            .map(|s| RecommendationItem::from_scored(s, query.include_breakdown))
            .collect(),
    ))
}

/// POST /api/v1/ingest
pub async fn ingest_feeds(
    State(state): State<AppState>,
    body: Option<Json<IngestOptions>>,
) -> AppResult<Json<IngestReport>> {
    let options = body.map(|Json(options)| options).unwrap_or_default();
    let report = state.pipeline.ingest_feeds(options).await?;
    Ok(Json(report))
}

/// POST /api/v1/ingest/providers
pub async fn refresh_providers(
    State(state): State<AppState>,
    body: Option<Json<RefreshProvidersRequest>>,
) -> AppResult<Json<IngestReport>> {
    let limit = body
        .and_then(|Json(request)| request.limit)
        .unwrap_or(DEFAULT_PROVIDER_LIMIT);
    let report = state.pipeline.refresh_providers(limit).await?;
    Ok(Json(report))
}
