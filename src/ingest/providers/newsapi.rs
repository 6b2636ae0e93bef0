// src/ingest/providers/newsapi.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ingest::types::{SourceCollector, TrendingItem};
use crate::ingest::{categorize, clean_title};

const ENDPOINT: &str = "https://newsapi.org/v2/top-headlines";
const PAGE_SIZE: &str = "30";
// Headlines carry no engagement; rank position is turned into a synthetic score.
const BASE_ENGAGEMENT: f64 = 6000.0;
const ENGAGEMENT_STEP: f64 = 120.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    #[serde(default)]
    url: String,
    published_at: Option<String>,
}

/// Technology top headlines. Without an API key the collector yields nothing.
pub struct NewsApiCollector {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl NewsApiCollector {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: super::http_client(timeout)?,
            api_key: api_key.trim().to_string(),
            endpoint: ENDPOINT.to_string(),
            timeout,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

fn parse_articles(payload: &serde_json::Value, now: DateTime<Utc>) -> Vec<TrendingItem> {
    let articles = payload
        .get("articles")
        .and_then(|a| a.as_array())
        .cloned()
        .unwrap_or_default();

    let mut out = Vec::with_capacity(articles.len());
    for (rank, raw) in articles.into_iter().enumerate() {
        let Ok(article) = serde_json::from_value::<Article>(raw.clone()) else {
            continue;
        };
        let title = clean_title(article.title.as_deref().unwrap_or_default());
        if title.is_empty() {
            continue;
        }
        let published = article
            .published_at
            .as_deref()
            .and_then(super::from_rfc3339)
            .unwrap_or(now);
        let engagement = (BASE_ENGAGEMENT - rank as f64 * ENGAGEMENT_STEP).max(0.0);
        out.push(
            TrendingItem::new(title.clone(), "newsapi", engagement)
                .with_url(article.url)
                .published(published)
                .with_category(categorize(&title))
                .with_raw(raw),
        );
    }
    out
}

#[async_trait]
impl SourceCollector for NewsApiCollector {
    async fn fetch(&self) -> Result<Vec<TrendingItem>> {
        if self.api_key.is_empty() {
            tracing::debug!(provider = "newsapi", "no api key configured, skipping");
            return Ok(Vec::new());
        }
        let payload: serde_json::Value = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("category", "technology"),
                ("language", "en"),
                ("pageSize", PAGE_SIZE),
                ("country", "us"),
            ])
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .send()
            .await
            .context("newsapi get()")?
            .error_for_status()
            .context("newsapi non-2xx")?
            .json()
            .await
            .context("newsapi json")?;
        Ok(parse_articles(&payload, Utc::now()))
    }

    fn name(&self) -> &str {
        "newsapi"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rank_becomes_decreasing_engagement() {
        let now = Utc::now();
        let payload = json!({"status": "ok", "articles": [
            {"title": "GPU prices fall", "url": "https://n.test/1", "publishedAt": "2025-05-01T12:00:00Z"},
            {"title": null},
            {"title": "Second story", "publishedAt": "not a date"}
        ]});
        let items = parse_articles(&payload, now);
        assert_eq!(items.len(), 2);
        assert!((items[0].engagement_score - 6000.0).abs() < 1e-9);
        assert_eq!(items[0].category, "hardware");
        // rank counts the skipped entry too
        assert!((items[1].engagement_score - 5760.0).abs() < 1e-9);
        assert_eq!(items[1].published_at, Some(now));
    }

    #[tokio::test]
    async fn missing_key_returns_empty_without_network() {
        let c = NewsApiCollector::new("  ", Duration::from_secs(1)).unwrap();
        assert!(c.fetch().await.unwrap().is_empty());
    }
}
