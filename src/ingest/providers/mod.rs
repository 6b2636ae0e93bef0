// src/ingest/providers/mod.rs
pub mod aggregator;
pub mod github;
pub mod hackernews;
pub mod newsapi;
pub mod reddit;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SourcesConfig;
use crate::ingest::types::SourceCollector;

use aggregator::AggregatorCollector;
use github::GitHubTrendingCollector;
use hackernews::HackerNewsCollector;
use newsapi::NewsApiCollector;
use reddit::RedditCollector;

const USER_AGENT: &str = "trendforge/0.1 (+https://github.com/trendforge/trendforge)";

/// Which collector set a run uses. Chosen once, before collection starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorMode {
    Aggregator,
    Independent,
    /// Collectors supplied by the caller.
    Custom,
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
        .context("building http client")
}

/// Unix seconds → UTC; `None` for out-of-range values.
pub(crate) fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// RFC 3339 → UTC; `None` when unparsable.
pub(crate) fn from_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// The four independent collectors, in registration order.
pub fn default_collectors(cfg: &SourcesConfig) -> Result<Vec<Arc<dyn SourceCollector>>> {
    let timeout = Duration::from_secs(cfg.timeout_secs);
    let collectors: Vec<Arc<dyn SourceCollector>> = vec![
        Arc::new(HackerNewsCollector::new(timeout)?),
        Arc::new(GitHubTrendingCollector::new(timeout)?),
        Arc::new(RedditCollector::new(&cfg.reddit_user_agent, timeout)?),
        Arc::new(NewsApiCollector::new(&cfg.newsapi_key, timeout)?),
    ];
    Ok(collectors)
}

/// Pick the collector set for this run.
///
/// The aggregator is used only when enabled and its health probe answers;
/// otherwise the independent collectors are used.
pub async fn select_collectors(
    cfg: &SourcesConfig,
) -> Result<(CollectorMode, Vec<Arc<dyn SourceCollector>>)> {
    if cfg.use_aggregator {
        let probe_timeout = Duration::from_secs(cfg.probe_timeout_secs);
        if aggregator::probe_health(&cfg.aggregator_base, probe_timeout).await {
            tracing::info!(base = %cfg.aggregator_base, "using aggregator hub");
            let agg = AggregatorCollector::new(
                &cfg.aggregator_base,
                cfg.aggregator_limit,
                Duration::from_secs(cfg.timeout_secs),
            )?;
            let collectors: Vec<Arc<dyn SourceCollector>> = vec![Arc::new(agg)];
            return Ok((CollectorMode::Aggregator, collectors));
        }
        tracing::warn!(base = %cfg.aggregator_base, "aggregator not ready, falling back to independent collectors");
    }
    tracing::info!("using independent collectors");
    Ok((CollectorMode::Independent, default_collectors(cfg)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_helpers() {
        assert_eq!(
            from_unix(1_700_000_000).map(|d| d.timestamp()),
            Some(1_700_000_000)
        );
        let dt = from_rfc3339("2025-03-01T10:00:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-03-01T08:00:00+00:00");
        assert!(from_rfc3339("yesterday").is_none());
    }

    #[tokio::test]
    async fn unreachable_aggregator_falls_back_to_independent() {
        let cfg = SourcesConfig {
            use_aggregator: true,
            // Reserved TEST-NET address: nothing answers.
            aggregator_base: "http://192.0.2.1:9".into(),
            probe_timeout_secs: 1,
            ..Default::default()
        };
        let (mode, collectors) = select_collectors(&cfg).await.unwrap();
        assert_eq!(mode, CollectorMode::Independent);
        let names: Vec<&str> = collectors.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["hackernews", "github", "reddit", "newsapi"]);
    }

    #[tokio::test]
    async fn disabled_aggregator_is_not_probed() {
        let cfg = SourcesConfig::default();
        let (mode, collectors) = select_collectors(&cfg).await.unwrap();
        assert_eq!(mode, CollectorMode::Independent);
        assert_eq!(collectors.len(), 4);
    }
}
