// src/ingest/providers/hackernews.rs
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ingest::types::{SourceCollector, TrendingItem};
use crate::ingest::{categorize, clean_title};

const API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
const TOP_LIMIT: usize = 30;
const COMMENT_WEIGHT: f64 = 0.5;
/// Cap on a single `item/<id>` request.
const ITEM_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct Story {
    id: u64,
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    descendants: f64,
    time: Option<i64>,
}

/// Top stories from the official Firebase API.
pub struct HackerNewsCollector {
    client: reqwest::Client,
    api_base: String,
    limit: usize,
    timeout: Duration,
}

impl HackerNewsCollector {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: super::http_client(timeout)?,
            api_base: API_BASE.to_string(),
            limit: TOP_LIMIT,
            timeout,
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_story(&self, id: u64, budget: Duration) -> Result<serde_json::Value> {
        self.client
            .get(format!("{}/item/{id}.json", self.api_base))
            .timeout(budget)
            .send()
            .await
            .context("hackernews item get()")?
            .error_for_status()
            .context("hackernews item non-2xx")?
            .json()
            .await
            .context("hackernews item json")
    }
}

/// Time left for the next item request, capped at [`ITEM_TIMEOUT`];
/// `None` once the deadline has passed.
fn item_budget(deadline: Instant, now: Instant) -> Option<Duration> {
    let left = deadline.checked_duration_since(now)?;
    if left.is_zero() {
        None
    } else {
        Some(left.min(ITEM_TIMEOUT))
    }
}

/// Map one story payload; `None` for deleted/untitled stories.
fn story_to_item(raw: serde_json::Value, now: DateTime<Utc>) -> Option<TrendingItem> {
    if raw.is_null() {
        return None;
    }
    let story: Story = serde_json::from_value(raw.clone()).ok()?;
    let title = clean_title(story.title.as_deref().unwrap_or_default());
    if title.is_empty() {
        return None;
    }
    let url = story
        .url
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", story.id));
    let published = story.time.and_then(super::from_unix).unwrap_or(now);

    Some(
        TrendingItem::new(
            title.clone(),
            "hackernews",
            story.score + story.descendants * COMMENT_WEIGHT,
        )
        .with_url(url)
        .published(published)
        .with_category(categorize(&title))
        .with_raw(raw),
    )
}

#[async_trait]
impl SourceCollector for HackerNewsCollector {
    async fn fetch(&self) -> Result<Vec<TrendingItem>> {
        // Stop early enough to return what was fetched before the collector
        // deadline cancels the whole call.
        let deadline = Instant::now() + self.timeout.mul_f64(0.8);
        let ids: Vec<u64> = self
            .client
            .get(format!("{}/topstories.json", self.api_base))
            .send()
            .await
            .context("hackernews topstories get()")?
            .error_for_status()
            .context("hackernews topstories non-2xx")?
            .json()
            .await
            .context("hackernews topstories json")?;

        // one item request at a time
        let mut out = Vec::with_capacity(self.limit);
        for id in ids.into_iter().take(self.limit) {
            let Some(budget) = item_budget(deadline, Instant::now()) else {
                tracing::debug!(fetched = out.len(), "hackernews time budget spent; returning partial list");
                break;
            };
            match self.fetch_story(id, budget).await {
                Ok(raw) => {
                    if let Some(item) = story_to_item(raw, Utc::now()) {
                        out.push(item);
                    }
                }
                Err(e) => tracing::debug!(error = ?e, story = id, "hackernews story skipped"),
            }
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "hackernews"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
