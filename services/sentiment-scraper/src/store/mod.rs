// Persistence of the latest sentiment record
use crate::types::*;
use redis::AsyncCommands;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes the record as pretty JSON, the file the dashboard API serves
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the record, creating the parent directory if needed
    pub async fn save(&self, record: &OutputRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SentimentError::StoreError(format!("{}: {}", parent.display(), e)))?;
        }

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| SentimentError::StoreError(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| SentimentError::StoreError(format!("{}: {}", self.path.display(), e)))?;

        info!(path = %self.path.display(), "Sentiment record saved");
        Ok(())
    }

    /// Read back the last saved record
    pub async fn load(&self) -> Result<OutputRecord> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SentimentError::StoreError(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&json).map_err(|e| SentimentError::InvalidResponse(e.to_string()))
    }
}

const LATEST_KEY: &str = "sentiment:latest";

/// Redis copy of the latest record
pub struct RedisCache {
    client: redis::aio::MultiplexedConnection,
    ttl_secs: u64,
}

impl RedisCache {
    pub async fn new(redis_url: &str, ttl_secs: u64) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;

        Ok(Self {
            client: conn,
            ttl_secs,
        })
    }

    /// Get cached record
    pub async fn get_latest(&self) -> anyhow::Result<Option<OutputRecord>> {
        let value: Option<String> = self.client.clone().get(LATEST_KEY).await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Cache record with TTL
    pub async fn set_latest(&self, record: &OutputRecord) -> anyhow::Result<()> {
        let json = serde_json::to_string(record)?;

        // explicit type annotation to avoid never type fallback
        let _: () = self
            .client
            .clone()
            .set_ex(LATEST_KEY, json, self.ttl_secs)
            .await?;

        Ok(())
    }
}
