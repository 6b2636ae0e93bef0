// src/ingest/providers/aggregator.rs
//! Trends hub: one service that proxies many platforms behind
//! `POST <base>/trends/<platform>`. Each platform is fetched independently and
//! a failing platform only loses its own items.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::ingest::types::{SourceCollector, TrendingItem};
use crate::ingest::{categorize, clean_title};

pub const PLATFORMS: [&str; 10] = [
    "github",
    "hackernews",
    "producthunt",
    "reddit",
    "twitter",
    "weibo",
    "zhihu",
    "juejin",
    "baidu",
    "toutiao",
];

/// `GET <base>/health` answered with 2xx inside `timeout`.
pub async fn probe_health(base: &str, timeout: Duration) -> bool {
    let Ok(client) = super::http_client(timeout) else {
        return false;
    };
    let url = format!("{}/health", base.trim_end_matches('/'));
    match client.get(&url).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            tracing::debug!(error = ?e, %url, "aggregator probe failed");
            false
        }
    }
}

pub struct AggregatorCollector {
    client: reqwest::Client,
    base: String,
    limit: usize,
    timeout: Duration,
}

impl AggregatorCollector {
    pub fn new(base: &str, limit: usize, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: super::http_client(timeout)?,
            base: base.trim_end_matches('/').to_string(),
            limit,
            timeout,
        })
    }

    async fn fetch_platform(&self, platform: &str) -> Result<Vec<TrendingItem>> {
        let resp = self
            .client
            .post(format!("{}/trends/{platform}", self.base))
            .json(&serde_json::json!({ "limit": self.limit }))
            .send()
            .await
            .with_context(|| format!("aggregator {platform} post()"))?;
        if !resp.status().is_success() {
            bail!("aggregator {platform}: status {}", resp.status());
        }
        let payload: Value = resp
            .json()
            .await
            .with_context(|| format!("aggregator {platform} json"))?;
        Ok(parse_platform(platform, &payload, Utc::now()))
    }
}

fn num(v: &Value, key: &str) -> f64 {
    v.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Platform-specific engagement formula.
pub fn platform_score(platform: &str, raw: &Value) -> f64 {
    match platform.to_ascii_lowercase().as_str() {
        "github" => num(raw, "stars") + num(raw, "forks") * 2.0,
        "hackernews" => num(raw, "points") + num(raw, "comments") * 0.5,
        "reddit" => num(raw, "upvotes") + num(raw, "comments") * 0.3,
        "weibo" => num(raw, "hot_value"),
        "zhihu" => num(raw, "hot_score"),
        "producthunt" => num(raw, "upvotes"),
        _ => {
            let score = num(raw, "score");
            if score != 0.0 {
                score
            } else {
                num(raw, "likes")
            }
        }
    }
}

/// The hub carries no timestamps; every item is stamped with `now`.
fn parse_platform(platform: &str, payload: &Value, now: DateTime<Utc>) -> Vec<TrendingItem> {
    let raws = payload
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut out = Vec::with_capacity(raws.len());
    for raw in raws {
        let title = clean_title(raw.get("title").and_then(Value::as_str).unwrap_or_default());
        if title.is_empty() {
            continue;
        }
        let url = raw
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        out.push(
            TrendingItem::new(title.clone(), platform, platform_score(platform, &raw))
                .with_url(url)
                .published(now)
                .with_category(categorize(&title))
                .with_raw(raw),
        );
    }
    out
}

#[async_trait]
impl SourceCollector for AggregatorCollector {
    async fn fetch(&self) -> Result<Vec<TrendingItem>> {
        let results =
            futures::future::join_all(PLATFORMS.iter().map(|p| self.fetch_platform(p))).await;

        let mut all = Vec::new();
        let mut failures = 0usize;
        for (platform, res) in PLATFORMS.iter().zip(results) {
            match res {
                Ok(items) => all.extend(items),
                Err(e) => {
                    failures += 1;
                    tracing::warn!(error = ?e, platform, "aggregator platform failed");
                }
            }
        }
        if failures == PLATFORMS.len() {
            bail!("aggregator: every platform failed");
        }
        Ok(all)
    }

    fn name(&self) -> &str {
        "aggregator"
    }

    // Platforms are fetched concurrently, each bounded by the client timeout.
    fn timeout(&self) -> Duration {
        self.timeout + Duration::from_secs(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scores_follow_platform_formulas() {
        assert!((platform_score("github", &json!({"stars": 10, "forks": 3})) - 16.0).abs() < 1e-9);
        assert!(
            (platform_score("hackernews", &json!({"points": 10, "comments": 4})) - 12.0).abs()
                < 1e-9
        );
        assert!(
            (platform_score("reddit", &json!({"upvotes": 10, "comments": 10})) - 13.0).abs()
                < 1e-9
        );
        assert!((platform_score("weibo", &json!({"hot_value": 9e5})) - 9e5).abs() < 1e-9);
        assert!((platform_score("twitter", &json!({"likes": 7})) - 7.0).abs() < 1e-9);
        assert!((platform_score("baidu", &json!({"score": 3, "likes": 7})) - 3.0).abs() < 1e-9);
        assert!(platform_score("toutiao", &json!({})).abs() < 1e-9);
    }

    #[test]
    fn platform_payload_is_tagged_with_platform_source() {
        let now = Utc::now();
        let payload = json!({"items": [
            {"title": "Weekly AI digest", "url": "https://z.test/1", "hot_score": 50},
            {"url": "https://z.test/2"}
        ]});
        let items = parse_platform("zhihu", &payload, now);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, "zhihu");
        assert!((items[0].engagement_score - 50.0).abs() < 1e-9);
        assert_eq!(items[0].published_at, Some(now));
    }
}
