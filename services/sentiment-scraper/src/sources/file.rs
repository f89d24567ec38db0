use crate::types::*;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Reads a snapshot that a headless browser already dumped to disk
pub struct FileSnapshotSource {
    path: PathBuf,
    last_result: Mutex<Option<std::result::Result<chrono::DateTime<Utc>, String>>>,
}

impl FileSnapshotSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            last_result: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl SnapshotSource for FileSnapshotSource {
    async fn fetch_snapshot(&self) -> Result<String> {
        let outcome = tokio::fs::read_to_string(&self.path).await;
        let mut last = self.last_result.lock().await;

        match outcome {
            Ok(html) => {
                debug!(path = %self.path.display(), bytes = html.len(), "Loaded snapshot file");
                *last = Some(Ok(Utc::now()));
                Ok(html)
            }
            Err(e) => {
                let msg = format!("{}: {}", self.path.display(), e);
                *last = Some(Err(msg.clone()));
                Err(SentimentError::SnapshotError(msg))
            }
        }
    }

    async fn health(&self) -> SourceHealth {
        let last = self.last_result.lock().await;
        let (is_healthy, last_success, last_error) = match last.as_ref() {
            Some(Ok(at)) => (true, Some(*at), None),
            Some(Err(e)) => (false, None, Some(e.clone())),
            None => (self.path.exists(), None, None),
        };

        SourceHealth {
            source: self.name().to_string(),
            is_healthy,
            last_success,
            last_error,
            success_rate_24h: if is_healthy { 1.0 } else { 0.0 },
            avg_latency_ms: 0,
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}
