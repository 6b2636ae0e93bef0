// src/filter.rs
//! Scoring and selection: recency, engagement and keyword gates, then a
//! weighted ranking capped at the daily limit.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;

use crate::config::FilterConfig;
use crate::ingest::types::TrendingItem;

pub struct TrendingFilter {
    cfg: FilterConfig,
    keywords: Vec<String>,
}

impl TrendingFilter {
    pub fn new(cfg: &FilterConfig) -> Self {
        Self {
            keywords: cfg.keywords(),
            cfg: cfg.clone(),
        }
    }

    pub fn filter(&self, items: Vec<TrendingItem>) -> Vec<TrendingItem> {
        self.filter_at(items, Utc::now())
    }

    /// Gates are conjunctive and applied in order; survivors are ranked by
    /// `engagement_score * weight[source]`, ties keeping input order.
    pub fn filter_at(&self, items: Vec<TrendingItem>, now: DateTime<Utc>) -> Vec<TrendingItem> {
        let before = items.len();
        let hours = i64::try_from(self.cfg.recency_hours).unwrap_or(i64::MAX);
        let horizon = Duration::try_hours(hours).unwrap_or(Duration::MAX);

        let mut kept: Vec<TrendingItem> = items
            .into_iter()
            .filter(|it| !it.title.is_empty())
            .filter(|it| self.is_recent(it, now, horizon))
            .filter(|it| it.engagement_score >= self.cfg.threshold_for(&it.source))
            .filter(|it| self.is_relevant(it))
            .collect();

        kept.sort_by(|a, b| self.weighted(b).total_cmp(&self.weighted(a)));
        kept.truncate(self.cfg.daily_limit);

        let dropped = before - kept.len();
        if dropped > 0 {
            counter!("trend_filter_dropped_total").increment(dropped as u64);
        }
        tracing::info!(before, after = kept.len(), "filter finished");
        kept
    }

    // Missing timestamp counts as fresh.
    fn is_recent(&self, it: &TrendingItem, now: DateTime<Utc>, horizon: Duration) -> bool {
        match it.published_at {
            Some(at) => now.signed_duration_since(at) <= horizon,
            None => true,
        }
    }

    fn is_relevant(&self, it: &TrendingItem) -> bool {
        let title = it.title.to_lowercase();
        self.keywords.iter().any(|kw| title.contains(kw.as_str()))
    }

    // NaN ranks as zero.
    fn weighted(&self, it: &TrendingItem) -> f64 {
        let w = it.engagement_score * self.cfg.weight_for(&it.source);
        if w.is_nan() {
            0.0
        } else {
            w
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn cfg() -> FilterConfig {
        let mut topic_keywords = BTreeMap::new();
        topic_keywords.insert("ai".to_string(), vec!["AI".to_string(), "gpt".to_string()]);
        topic_keywords.insert("dev".to_string(), vec!["rust".to_string()]);
        FilterConfig {
            topic_keywords,
            ..FilterConfig::default()
        }
    }

    fn item(title: &str, source: &str, score: f64, at: DateTime<Utc>) -> TrendingItem {
        TrendingItem::new(title, source, score).published(at)
    }

    #[test]
    fn weight_decides_ranking() {
        let now = Utc::now();
        let mut c = cfg();
        c.platform_weights.insert("github".into(), 2.0);
        c.platform_weights.insert("reddit".into(), 0.5);
        let out = TrendingFilter::new(&c).filter_at(
            vec![
                item("New AI tool", "reddit", 100.0, now),
                item("AI framework update", "github", 40.0, now),
            ],
            now,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].source, "github");
        assert_eq!(out[1].source, "reddit");
    }

    #[test]
    fn gates_are_conjunctive() {
        let now = Utc::now();
        let mut c = cfg();
        c.engagement_thresholds.insert("reddit".into(), 100.0);
        let out = TrendingFilter::new(&c).filter_at(
            vec![
                item("AI old news", "hn", 500.0, now - Duration::hours(25)),
                item("AI low votes", "reddit", 99.0, now),
                item("Gardening tips", "hn", 500.0, now),
                item("AI boundary", "hn", 0.0, now - Duration::hours(24)),
                TrendingItem::new("Rust with no timestamp", "reddit", 100.0),
            ],
            now,
        );
        let titles: Vec<&str> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Rust with no timestamp", "AI boundary"]);
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let now = Utc::now();
        let out = TrendingFilter::new(&cfg()).filter_at(
            vec![item("ChatGPT plugins", "hn", 1.0, now), item("RUSTACEANS meet", "hn", 1.0, now)],
            now,
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn cap_and_stable_ties() {
        let now = Utc::now();
        let mut c = cfg();
        c.daily_limit = 3;
        let input: Vec<TrendingItem> = (0..6)
            .map(|i| item(&format!("AI story {i}"), "hn", 10.0, now))
            .collect();
        let f = TrendingFilter::new(&c);
        let out = f.filter_at(input.clone(), now);
        let titles: Vec<&str> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["AI story 0", "AI story 1", "AI story 2"]);
        assert_eq!(f.filter_at(input, now), out);
    }

    #[test]
    fn nan_scores_rank_last_without_panicking() {
        let now = Utc::now();
        let mut c = cfg();
        c.daily_limit = 100;
        c.platform_weights.insert("github".into(), f64::NAN);
        c.platform_weights.insert("reddit".into(), f64::INFINITY);
        let input: Vec<TrendingItem> = (0..60)
            .map(|i| {
                let source = ["github", "hn", "reddit"][i % 3];
                let score = if source == "reddit" { 0.0 } else { i as f64 };
                item(&format!("AI story {i}"), source, score, now)
            })
            .collect();
        let out = TrendingFilter::new(&c).filter_at(input, now);
        assert_eq!(out.len(), 60);
        assert_eq!(out[0].title, "AI story 58");
        assert!(out[20..].iter().all(|i| i.source != "hn"));
    }

    #[test]
    fn all_stale_is_an_empty_result() {
        let now = Utc::now();
        let old = now - Duration::hours(48);
        let out = TrendingFilter::new(&cfg()).filter_at(
            vec![item("AI one", "hn", 10.0, old), item("Rust two", "reddit", 10.0, old)],
            now,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn nothing_relevant_is_an_empty_result() {
        let now = Utc::now();
        let out = TrendingFilter::new(&cfg())
            .filter_at(vec![item("Gardening tips", "hn", 1e6, now)], now);
        assert!(out.is_empty());
    }
}
