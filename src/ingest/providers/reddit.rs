// src/ingest/providers/reddit.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ingest::types::{SourceCollector, TrendingItem};
use crate::ingest::{categorize, clean_title};

const REDDIT_URL: &str = "https://www.reddit.com/r/technology/top.json?limit=30&t=day";
const COMMENT_WEIGHT: f64 = 0.2;

#[derive(Debug, Deserialize)]
struct Post {
    title: Option<String>,
    #[serde(default)]
    ups: f64,
    #[serde(default)]
    num_comments: f64,
    created_utc: Option<f64>,
    #[serde(default)]
    permalink: String,
}

/// Daily top of /r/technology through the public JSON listing (no OAuth).
pub struct RedditCollector {
    client: reqwest::Client,
    user_agent: String,
    url: String,
    timeout: Duration,
}

impl RedditCollector {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: super::http_client(timeout)?,
            user_agent: user_agent.to_string(),
            url: REDDIT_URL.to_string(),
            timeout,
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

fn parse_listing(payload: &serde_json::Value, now: DateTime<Utc>) -> Vec<TrendingItem> {
    let children = payload
        .pointer("/data/children")
        .and_then(|c| c.as_array())
        .cloned()
        .unwrap_or_default();

    let mut out = Vec::with_capacity(children.len());
    for child in children {
        let raw = child.get("data").cloned().unwrap_or_default();
        let Ok(post) = serde_json::from_value::<Post>(raw.clone()) else {
            continue;
        };
        let title = clean_title(post.title.as_deref().unwrap_or_default());
        if title.is_empty() {
            continue;
        }
        let published = post
            .created_utc
            .and_then(|t| super::from_unix(t as i64))
            .unwrap_or(now);
        out.push(
            TrendingItem::new(
                title.clone(),
                "reddit",
                post.ups + post.num_comments * COMMENT_WEIGHT,
            )
            .with_url(format!("https://www.reddit.com{}", post.permalink))
            .published(published)
            .with_category(categorize(&title))
            .with_raw(raw),
        );
    }
    out
}

#[async_trait]
impl SourceCollector for RedditCollector {
    async fn fetch(&self) -> Result<Vec<TrendingItem>> {
        let payload: serde_json::Value = self
            .client
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .context("reddit get()")?
            .error_for_status()
            .context("reddit non-2xx")?
            .json()
            .await
            .context("reddit json")?;
        Ok(parse_listing(&payload, Utc::now()))
    }

    fn name(&self) -> &str {
        "reddit"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
