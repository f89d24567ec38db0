pub mod types;
pub mod sources {
    pub mod file;
    pub mod http;
    pub mod snapshot;
}
pub mod config;
pub mod decoder;
pub mod metrics;
pub mod store;

pub use types::*;
pub use crate::config::{ScraperConfig, SourceKind};
pub use decoder::{decode, DecodeError};
pub use metrics::{compute, MarketSummary, SigmaWeights};
pub use sources::file::FileSnapshotSource;
pub use sources::http::HttpSnapshotSource;
pub use store::{JsonFileStore, RedisCache};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Snapshot -> chart data -> metrics -> record, for one source
pub struct SentimentPipeline {
    source: Arc<dyn SnapshotSource>,
    weights: Arc<SigmaWeights>,
}

impl SentimentPipeline {
    pub fn new(source: Arc<dyn SnapshotSource>, weights: Arc<SigmaWeights>) -> Self {
        Self { source, weights }
    }

    /// Build the snapshot source described by the configuration
    pub fn from_config(cfg: &ScraperConfig) -> Result<Self> {
        let source: Arc<dyn SnapshotSource> = match cfg.source.kind {
            SourceKind::Http => Arc::new(HttpSnapshotSource::new(
                &cfg.source.url,
                &cfg.source.user_agent,
                cfg.source.timeout(),
            )?),
            SourceKind::File => {
                let path = cfg.source.path.as_ref().ok_or_else(|| {
                    SentimentError::ConfigError("source.path is required for file snapshots".to_string())
                })?;
                Arc::new(FileSnapshotSource::new(path))
            }
        };

        Ok(Self::new(source, Arc::new(cfg.sigma_weights())))
    }

    /// Fetch a fresh snapshot and turn it into a record
    pub async fn run(&self) -> Result<OutputRecord> {
        let html = self.source.fetch_snapshot().await?;
        self.process(&html, Utc::now())
    }

    /// Decode an already captured snapshot. `now` stamps the record.
    pub fn process(&self, html: &str, now: DateTime<Utc>) -> Result<OutputRecord> {
        let regions = sources::snapshot::extract_regions(html)?;

        let data = decoder::try_decode(&regions).map_err(|e| {
            warn!(reason = %e, regions = regions.len(), "Failed to extract chart data");
            SentimentError::ExtractionFailed {
                stage: "decode",
                reason: e.to_string(),
            }
        })?;
        info!(buckets = data.len(), "Extracted return bucket chart");

        let metrics = metrics::compute(&data, &self.weights).ok_or_else(|| {
            SentimentError::ExtractionFailed {
                stage: "metrics",
                reason: "no chart data to aggregate".to_string(),
            }
        })?;
        info!(
            strategic_bias = metrics.strategic_bias,
            directional_bias = metrics.directional_bias,
            quadrant = %metrics.quadrant,
            "Computed sentiment metrics"
        );

        Ok(OutputRecord::assemble(metrics, data, now))
    }

    /// Run once and persist; nothing is written when any stage fails
    pub async fn run_and_store(
        &self,
        store: &JsonFileStore,
        cache: Option<&RedisCache>,
    ) -> Result<OutputRecord> {
        let record = self.run().await?;
        store.save(&record).await?;

        if let Some(cache) = cache {
            if let Err(e) = cache.set_latest(&record).await {
                warn!("Failed to cache sentiment record: {}", e);
            }
        }

        Ok(record)
    }

    pub async fn health_check(&self) -> SourceHealth {
        self.source.health().await
    }
}
