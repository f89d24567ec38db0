use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Bucket labels as rendered on the 1d return histogram, left to right
pub const BUCKET_LABELS: [&str; 8] = ["-9%", "-6%", "-3%", "<0%", ">0%", "+3%", "+6%", "+9%"];

/// Return-range category label, e.g. "+3%"
pub type BucketLabel = String;

/// One rendered element of a chart region
#[derive(Debug, Clone, PartialEq)]
pub enum VisualPrimitive {
    /// A `rect` with a parsed height and its raw fill attribute
    Bar { height: f64, fill: String },
    /// A `text` element's content, untrimmed
    Label { text: String },
}

impl VisualPrimitive {
    pub fn bar(height: f64, fill: impl Into<String>) -> Self {
        VisualPrimitive::Bar {
            height,
            fill: fill.into(),
        }
    }

    pub fn label(text: impl Into<String>) -> Self {
        VisualPrimitive::Label { text: text.into() }
    }
}

/// Candidate chart container found in a page snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartRegion {
    /// Full text content of the container
    pub text: String,
    /// Bars and labels in document order
    pub primitives: Vec<VisualPrimitive>,
}

impl ChartRegion {
    /// Build a region whose text content is the concatenation of its labels
    pub fn from_primitives(primitives: Vec<VisualPrimitive>) -> Self {
        let text = primitives
            .iter()
            .filter_map(|p| match p {
                VisualPrimitive::Label { text } => Some(text.as_str()),
                VisualPrimitive::Bar { .. } => None,
            })
            .collect::<String>();

        Self { text, primitives }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketColor {
    Green,
    Red,
}

/// Decoded value of one histogram bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketEntry {
    pub value: f64,
    pub color: BucketColor,
    pub is_positive: bool,
}

impl BucketEntry {
    pub fn new(value: f64, is_positive: bool) -> Self {
        Self {
            value,
            color: if is_positive {
                BucketColor::Green
            } else {
                BucketColor::Red
            },
            is_positive,
        }
    }
}

/// Bucket label -> decoded entry
pub type ChartData = BTreeMap<BucketLabel, BucketEntry>;

/// Market regime derived from strategic and directional bias
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quadrant {
    #[serde(rename = "Momentum Long Only")]
    MomentumLongOnly,
    #[serde(rename = "Momentum Short Only")]
    MomentumShortOnly,
    #[serde(rename = "Mean Reversion Long Only")]
    MeanReversionLongOnly,
    #[serde(rename = "Mean Reversion Short Only")]
    MeanReversionShortOnly,
}

impl Quadrant {
    /// Both thresholds are inclusive on the momentum / long side
    pub fn classify(strategic_bias: f64, directional_bias: f64) -> Self {
        match (strategic_bias >= 50.0, directional_bias >= 0.0) {
            (true, true) => Quadrant::MomentumLongOnly,
            (true, false) => Quadrant::MomentumShortOnly,
            (false, true) => Quadrant::MeanReversionLongOnly,
            (false, false) => Quadrant::MeanReversionShortOnly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quadrant::MomentumLongOnly => "Momentum Long Only",
            Quadrant::MomentumShortOnly => "Momentum Short Only",
            Quadrant::MeanReversionLongOnly => "Mean Reversion Long Only",
            Quadrant::MeanReversionShortOnly => "Mean Reversion Short Only",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary statistics over one decoded histogram
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub strategic_bias: f64,
    pub directional_bias: f64,
    /// Same value as `strategic_bias`, kept for the output schema
    pub green_percentage: f64,
    pub quadrant: Quadrant,
}

/// Persisted result of one successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub timestamp: i64,
    pub datetime: String,
    pub strategic_bias: f64,
    pub directional_bias: f64,
    pub green_percentage: f64,
    pub quadrant: Quadrant,
    pub data: ChartData,
}

impl OutputRecord {
    /// Assemble a record from a single clock sample
    pub fn assemble(metrics: Metrics, data: ChartData, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now.timestamp_millis(),
            datetime: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            strategic_bias: metrics.strategic_bias,
            directional_bias: metrics.directional_bias,
            green_percentage: metrics.green_percentage,
            quadrant: metrics.quadrant,
            data,
        }
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            strategic_bias: self.strategic_bias,
            directional_bias: self.directional_bias,
            green_percentage: self.green_percentage,
            quadrant: self.quadrant,
        }
    }
}

/// Snapshot source health/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHealth {
    pub source: String,
    pub is_healthy: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub success_rate_24h: f64,
    pub avg_latency_ms: u64,
}

/// Error types for the scraper's I/O collaborators
#[derive(Debug, thiserror::Error)]
pub enum SentimentError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded for {source_name}")]
    RateLimit {
        source_name: String,
        retry_after: Option<u64>,
    },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Snapshot unavailable: {0}")]
    SnapshotError(String),

    #[error("Extraction failed at {stage}: {reason}")]
    ExtractionFailed { stage: &'static str, reason: String },

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for scraper operations
pub type Result<T> = std::result::Result<T, SentimentError>;

/// Trait for anything that can hand over a rendered page snapshot
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Get the rendered HTML of the market page
    async fn fetch_snapshot(&self) -> Result<String>;

    /// Get source health status
    async fn health(&self) -> SourceHealth;

    /// Source name
    fn name(&self) -> &str;
}
