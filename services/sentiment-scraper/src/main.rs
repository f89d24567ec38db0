use axum::{routing::get, Router};
use sentiment_scraper::{JsonFileStore, RedisCache, ScraperConfig, SentimentPipeline};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
pub struct AppState {
    pub pipeline: SentimentPipeline,
    pub store: JsonFileStore,
    pub cache: Option<RedisCache>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path =
        std::env::var("SENTIMENT_CONFIG").unwrap_or_else(|_| "sentiment".to_string());
    let cfg = ScraperConfig::load(&config_path)?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "scrape".to_string());
    info!(mode = %mode, source = ?cfg.source.kind, "Starting Sentiment Scraper...");

    let pipeline = SentimentPipeline::from_config(&cfg)?;
    let store = JsonFileStore::new(&cfg.output.path);

    // Redis is optional; the JSON file is the record of truth
    let cache = match cfg.redis_url.as_deref() {
        Some(url) => match RedisCache::new(url, cfg.output.cache_ttl_secs).await {
            Ok(cache) => {
                info!("✓ Redis cache connected");
                Some(cache)
            }
            Err(e) => {
                warn!("⚠ Redis unavailable ({}), continuing without cache", e);
                None
            }
        },
        None => None,
    };

    match mode.as_str() {
        "scrape" => {
            match pipeline.run_and_store(&store, cache.as_ref()).await {
                Ok(record) => {
                    info!(
                        quadrant = %record.quadrant,
                        datetime = %record.datetime,
                        "Market sentiment scrape completed successfully"
                    );
                    Ok(())
                }
                Err(e) => {
                    error!("Market sentiment scrape failed: {}", e);
                    Err(e.into())
                }
            }
        }
        "serve" => serve(cfg.server.port, pipeline, store, cache).await,
        other => Err(anyhow::anyhow!(
            "Unknown mode {:?}, expected \"scrape\" or \"serve\"",
            other
        )),
    }
}

async fn serve(
    port: u16,
    pipeline: SentimentPipeline,
    store: JsonFileStore,
    cache: Option<RedisCache>,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        pipeline,
        store,
        cache,
    });

    let app = Router::new()
        .route("/api/sentiment", get(handlers::get_sentiment))
        .route("/api/sentiment/summary", get(handlers::get_summary))
        .route("/health", get(handlers::health_check))
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("🚀 Sentiment API listening on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

mod handlers;
