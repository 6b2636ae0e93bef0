// src/ingest/types.rs
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed topic from one source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingItem {
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub source: String, // lowercase tag, e.g. "hackernews", "github"
    #[serde(default)]
    pub engagement_score: f64, // source-specific unit, non-negative
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: String,
    /// Original payload, kept for audit only.
    #[serde(default)]
    pub raw_data: serde_json::Value,
}

impl TrendingItem {
    pub fn new(title: impl Into<String>, source: impl Into<String>, engagement_score: f64) -> Self {
        Self {
            title: title.into(),
            url: String::new(),
            source: source.into().to_ascii_lowercase(),
            engagement_score: engagement_score.max(0.0),
            published_at: None,
            category: String::new(),
            raw_data: serde_json::Value::Null,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw_data = raw;
        self
    }
}

/// A single data source. Implementations map one API's JSON into `TrendingItem`s.
#[async_trait::async_trait]
pub trait SourceCollector: Send + Sync {
    async fn fetch(&self) -> Result<Vec<TrendingItem>>;
    fn name(&self) -> &str;

    /// Upper bound the orchestrator allows for one `fetch` call.
    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}
