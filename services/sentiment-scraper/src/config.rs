//! Scraper configuration
//!
//! Loaded from an optional `sentiment.toml` (or any format the `config` crate
//! understands) with `SENTIMENT__*` environment overrides, e.g.
//! `SENTIMENT__SOURCE__KIND=file`, `SENTIMENT__OUTPUT__PATH=/srv/data.json`.

use crate::metrics::SigmaWeights;
use crate::sources::http::DEFAULT_MARKET_URL;
use crate::types::{Result, SentimentError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub redis_url: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-bucket overrides of the sigma weight table
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            output: OutputConfig::default(),
            server: ServerConfig::default(),
            redis_url: None,
            log_level: default_log_level(),
            weights: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Http,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default = "default_url")]
    pub url: String,
    /// Snapshot file, required when `kind = "file"`
    pub path: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            url: default_url(),
            path: None,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_MARKET_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    concat!("sentiment-scraper/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_output_path() -> PathBuf {
    PathBuf::from("public").join("data.json")
}
fn default_cache_ttl_secs() -> u64 {
    3600
}
fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}

impl ScraperConfig {
    /// Load `path` (extension optional, file may be absent) plus environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let cfg = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("SENTIMENT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| SentimentError::ConfigError(e.to_string()))?;

        let mut loaded: ScraperConfig = cfg
            .try_deserialize()
            .map_err(|e| SentimentError::ConfigError(e.to_string()))?;

        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            loaded.server.port = port;
        }

        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        match self.source.kind {
            SourceKind::Http => {
                let url = url::Url::parse(&self.source.url).map_err(|e| {
                    SentimentError::ConfigError(format!("invalid source.url {:?}: {}", self.source.url, e))
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(SentimentError::ConfigError(format!(
                        "source.url must be http(s), got {}",
                        url.scheme()
                    )));
                }
            }
            SourceKind::File => {
                if self.source.path.is_none() {
                    return Err(SentimentError::ConfigError(
                        "source.path is required when source.kind = \"file\"".to_string(),
                    ));
                }
            }
        }

        if self.source.timeout_secs == 0 {
            return Err(SentimentError::ConfigError(
                "source.timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Weight table for this run, fixed for the life of the process
    pub fn sigma_weights(&self) -> SigmaWeights {
        if self.weights.is_empty() {
            SigmaWeights::standard()
        } else {
            SigmaWeights::with_overrides(&self.weights)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = ScraperConfig::default();
        assert_eq!(cfg.source.kind, SourceKind::Http);
        assert_eq!(cfg.source.url, "https://velo.xyz/market");
        assert_eq!(cfg.output.path, PathBuf::from("public/data.json"));
        assert_eq!(cfg.server.port, 8080);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.sigma_weights(), SigmaWeights::standard());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
log_level = "debug"

[source]
kind = "file"
path = "/tmp/velo.html"

[output]
path = "out/data.json"

[weights]
"+9%" = 4.0
"#
        )
        .unwrap();

        let cfg = ScraperConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.source.kind, SourceKind::File);
        assert_eq!(cfg.source.path, Some(PathBuf::from("/tmp/velo.html")));
        assert_eq!(cfg.output.path, PathBuf::from("out/data.json"));
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.sigma_weights().get("+9%"), Some(4.0));
        assert_eq!(cfg.sigma_weights().get("+6%"), Some(2.0));
    }

    #[test]
    fn test_file_source_requires_path() {
        let cfg = ScraperConfig {
            source: SourceConfig {
                kind: SourceKind::File,
                ..SourceConfig::default()
            },
            ..ScraperConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(SentimentError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let cfg = ScraperConfig {
            source: SourceConfig {
                url: "ftp://velo.xyz/market".to_string(),
                ..SourceConfig::default()
            },
            ..ScraperConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
