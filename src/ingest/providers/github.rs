// src/ingest/providers/github.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ingest::clean_title;
use crate::ingest::types::{SourceCollector, TrendingItem};

const API_URL: &str = "https://github-trending-api.waningflow.com/repositories";
const TOP_LIMIT: usize = 30;
const FORK_WEIGHT: f64 = 2.0;

#[derive(Debug, Deserialize)]
struct Repo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    stars: f64,
    #[serde(default)]
    forks: f64,
}

/// Daily GitHub trending repositories (unofficial trending API).
pub struct GitHubTrendingCollector {
    client: reqwest::Client,
    api_url: String,
    timeout: Duration,
}

impl GitHubTrendingCollector {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: super::http_client(timeout)?,
            api_url: API_URL.to_string(),
            timeout,
        })
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

/// Trending has no publish time; every repo is stamped with `now`.
fn parse_repos(payload: serde_json::Value, now: DateTime<Utc>) -> Result<Vec<TrendingItem>> {
    let raws: Vec<serde_json::Value> =
        serde_json::from_value(payload).context("github trending: expected an array")?;

    let mut out = Vec::new();
    for raw in raws.into_iter().take(TOP_LIMIT) {
        let Ok(repo) = serde_json::from_value::<Repo>(raw.clone()) else {
            continue;
        };
        let name = repo.name.trim();
        let desc = repo.description.as_deref().unwrap_or_default().trim();
        let title = match (name.is_empty(), desc.is_empty()) {
            (true, true) => continue,
            (false, true) => clean_title(name),
            (true, false) => clean_title(desc),
            (false, false) => clean_title(&format!("{name}: {desc}")),
        };
        out.push(
            TrendingItem::new(title, "github", repo.stars + repo.forks * FORK_WEIGHT)
                .with_url(repo.url)
                .published(now)
                .with_category("development")
                .with_raw(raw),
        );
    }
    Ok(out)
}

#[async_trait]
impl SourceCollector for GitHubTrendingCollector {
    async fn fetch(&self) -> Result<Vec<TrendingItem>> {
        let payload: serde_json::Value = self
            .client
            .get(&self.api_url)
            .query(&[
                ("since", "daily"),
                ("language", ""),
                ("spoken_language_code", "zh"),
            ])
            .send()
            .await
            .context("github trending get()")?
            .error_for_status()
            .context("github trending non-2xx")?
            .json()
            .await
            .context("github trending json")?;
        parse_repos(payload, Utc::now())
    }

    fn name(&self) -> &str {
        "github"
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
    fn repos_map_to_items_in_order() {
        let now = Utc::now();
        let payload = json!([
            {"name": "tokio-rs/tokio", "description": "Async runtime", "url": "https://github.com/tokio-rs/tokio", "stars": 120, "forks": 10},
            {"name": "", "description": "", "stars": 5},
            {"name": "foo/bar", "description": null, "stars": 3, "forks": 1}
        ]);
        let items = parse_repos(payload, now).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "tokio-rs/tokio: Async runtime");
        assert!((items[0].engagement_score - 140.0).abs() < 1e-9);
        assert_eq!(items[0].category, "development");
        assert_eq!(items[0].published_at, Some(now));
        assert_eq!(items[1].title, "foo/bar");
        assert!((items[1].engagement_score - 5.0).abs() < 1e-9);
    }

    #[test]
    fn non_array_payload_is_an_error() {
        assert!(parse_repos(json!({"error": "rate limited"}), Utc::now()).is_err());
    }
}
