use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::AppState;
use sentiment_scraper::{MarketSummary, OutputRecord, SourceHealth};

const SUCCESS_MESSAGE: &str = "Market sentiment data retrieved successfully";
const FAILURE_MESSAGE: &str = "Failed to retrieve sentiment data";

/// Latest record: redis first when configured, then the JSON file
async fn load_latest(state: &AppState) -> sentiment_scraper::Result<OutputRecord> {
    if let Some(ref cache) = state.cache {
        match cache.get_latest().await {
            Ok(Some(record)) => {
                debug!("Serving sentiment record from cache");
                return Ok(record);
            }
            Ok(None) => {}
            Err(e) => warn!("Cache read failed, falling back to file: {}", e),
        }
    }

    state.store.load().await
}

/// GET /api/sentiment - Latest sentiment record
pub async fn get_sentiment(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SentimentResponse>) {
    match load_latest(&state).await {
        Ok(record) => (
            StatusCode::OK,
            Json(SentimentResponse {
                success: true,
                data: Some(record),
                message: SUCCESS_MESSAGE.to_string(),
            }),
        ),
        Err(e) => {
            warn!("Error in sentiment API: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SentimentResponse {
                    success: false,
                    data: None,
                    message: FAILURE_MESSAGE.to_string(),
                }),
            )
        }
    }
}

/// GET /api/sentiment/summary - Dashboard reading of the latest record
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SummaryResponse>, (StatusCode, String)> {
    let record = load_latest(&state).await.map_err(|e| {
        warn!("Error in summary API: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_MESSAGE.to_string())
    })?;

    Ok(Json(SummaryResponse {
        datetime: record.datetime.clone(),
        summary: MarketSummary::from_metrics(&record.metrics()),
    }))
}

/// GET /health - Snapshot source health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let source_health = state.pipeline.health_check().await;

    Json(HealthResponse {
        status: if source_health.is_healthy {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        sources: vec![source_health],
    })
}

// Response types
#[derive(Debug, serde::Serialize)]
pub struct SentimentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<OutputRecord>,
    pub message: String,
}

#[derive(Debug, serde::Serialize)]
pub struct SummaryResponse {
    pub datetime: String,
    #[serde(flatten)]
    pub summary: MarketSummary,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub sources: Vec<SourceHealth>,
}
