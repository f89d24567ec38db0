use crate::types::*;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default market page carrying the 1d return bucket chart
pub const DEFAULT_MARKET_URL: &str = "https://velo.xyz/market";

#[derive(Default)]
struct FetchStats {
    last_ok_ms: AtomicU64,
    last_err_ms: AtomicU64,
    ok: AtomicU64,
    err: AtomicU64,
    latency_ms: AtomicU64,
}

impl FetchStats {
    fn stamp(slot: &AtomicU64) {
        slot.store(
            u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0),
            Ordering::Relaxed,
        );
    }

    fn ok(&self, latency_ms: u64) {
        Self::stamp(&self.last_ok_ms);
        self.latency_ms.store(latency_ms, Ordering::Relaxed);
        self.ok.fetch_add(1, Ordering::Relaxed);
    }

    fn err(&self) {
        Self::stamp(&self.last_err_ms);
        self.err.fetch_add(1, Ordering::Relaxed);
    }

    /// The most recent fetch succeeded
    fn is_healthy(&self) -> bool {
        let last_ok = self.last_ok_ms.load(Ordering::Relaxed);
        last_ok > 0 && last_ok >= self.last_err_ms.load(Ordering::Relaxed)
    }

    fn success_rate(&self) -> f64 {
        let ok = self.ok.load(Ordering::Relaxed);
        match ok + self.err.load(Ordering::Relaxed) {
            0 => 1.0,
            total => ok as f64 / total as f64,
        }
    }
}

/// Fetches the rendered market page over HTTP.
///
/// The page is client-rendered, so `url` normally points at a prerendering
/// endpoint or a headless-browser bridge that returns the settled DOM.
pub struct HttpSnapshotSource {
    client: Client,
    url: String,
    request_timeout: Duration,
    stats: FetchStats,
}

impl HttpSnapshotSource {
    /// Longest wait honoured from a `retry-after` header
    const MAX_RETRY_WAIT_SECS: u64 = 120;

    pub fn new(url: &str, user_agent: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout + Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SentimentError::ApiError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
            request_timeout,
            stats: FetchStats::default(),
        })
    }

    /// One retry on 429, bounded by `retry-after`
    async fn fetch_page(&self) -> Result<String> {
        let request_start = Instant::now();

        for attempt in 0..2 {
            let request_future = self.client.get(&self.url).send();
            let response = match tokio::time::timeout(self.request_timeout, request_future).await {
                Ok(Ok(resp)) => resp,
                Ok(Err(e)) => {
                    self.stats.err();
                    return Err(SentimentError::ApiError(e.to_string()));
                }
                Err(_) => {
                    self.stats.err();
                    return Err(SentimentError::ApiError(format!(
                        "Request to {} timed out after {}s",
                        self.url,
                        self.request_timeout.as_secs()
                    )));
                }
            };

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());

                if attempt == 0 {
                    let wait_secs = retry_after.unwrap_or(60).min(Self::MAX_RETRY_WAIT_SECS);
                    warn!(wait_secs, "Market page rate limited, waiting before retry");
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                    continue;
                }

                self.stats.err();
                return Err(SentimentError::RateLimit {
                    source_name: self.name().to_string(),
                    retry_after,
                });
            }

            if !status.is_success() {
                self.stats.err();
                let text = response.text().await.unwrap_or_default();
                return Err(SentimentError::ApiError(format!(
                    "Market page error ({}): {}",
                    status, text
                )));
            }

            let body = response.text().await.map_err(|e| {
                self.stats.err();
                SentimentError::InvalidResponse(e.to_string())
            })?;

            let latency_ms = u64::try_from(request_start.elapsed().as_millis()).unwrap_or(u64::MAX);
            self.stats.ok(latency_ms);
            debug!(bytes = body.len(), latency_ms, "Fetched market page snapshot");

            return Ok(body);
        }

        Err(SentimentError::ApiError(
            "Unexpected retry loop exit".to_string(),
        ))
    }

    /// Health from past fetches, no request made
    pub fn health_snapshot(&self) -> SourceHealth {
        let last_success_ms = self.stats.last_ok_ms.load(Ordering::Relaxed);
        let last_success = if last_success_ms > 0 {
            i64::try_from(last_success_ms)
                .ok()
                .and_then(DateTime::from_timestamp_millis)
        } else {
            None
        };

        let is_healthy = self.stats.is_healthy();

        SourceHealth {
            source: self.name().to_string(),
            is_healthy,
            last_success,
            last_error: if is_healthy {
                None
            } else {
                Some("Recent failures detected".to_string())
            },
            success_rate_24h: self.stats.success_rate(),
            avg_latency_ms: self.stats.latency_ms.load(Ordering::Relaxed),
        }
    }
}

#[async_trait::async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_snapshot(&self) -> Result<String> {
        self.fetch_page().await
    }

    async fn health(&self) -> SourceHealth {
        self.health_snapshot()
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer) -> HttpSnapshotSource {
        HttpSnapshotSource::new(
            &format!("{}/market", server.uri()),
            "sentiment-scraper-test",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_snapshot_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/market"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>chart</html>"))
            .mount(&server)
            .await;

        let source = source_for(&server);
        let body = source.fetch_snapshot().await.unwrap();

        assert_eq!(body, "<html>chart</html>");
        let health = source.health().await;
        assert!(health.is_healthy);
        assert!(health.last_success.is_some());
        assert_eq!(health.success_rate_24h, 1.0);
    }

    #[tokio::test]
    async fn test_server_error_marks_unhealthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/market"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let source = source_for(&server);
        let err = source.fetch_snapshot().await.unwrap_err();

        assert!(matches!(err, SentimentError::ApiError(ref msg) if msg.contains("maintenance")));
        let health = source.health().await;
        assert!(!health.is_healthy);
        assert_eq!(health.success_rate_24h, 0.0);
    }

    #[tokio::test]
    async fn test_rate_limit_after_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/market"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .expect(2)
            .mount(&server)
            .await;

        let source = source_for(&server);
        let err = source.fetch_snapshot().await.unwrap_err();

        assert!(matches!(
            err,
            SentimentError::RateLimit { retry_after: Some(0), .. }
        ));
    }
}
