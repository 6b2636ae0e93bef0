// src/dedup.rs
//! Near-duplicate title removal, within a run and against recent history.

use chrono::NaiveDate;
use metrics::counter;

use crate::config::DedupConfig;
use crate::ingest::types::TrendingItem;
use crate::similarity::is_near_duplicate;
use crate::snapshot::SnapshotStore;

pub struct Deduplicator {
    threshold: f64,
    history: Vec<String>,
}

impl Deduplicator {
    pub fn new(cfg: &DedupConfig, history_titles: impl IntoIterator<Item = String>) -> Self {
        Self {
            threshold: cfg.similarity_threshold,
            history: history_titles.into_iter().filter(|t| !t.is_empty()).collect(),
        }
    }

    /// History from processed snapshots within `lookback_days` of `today`,
    /// ignoring `today`'s own snapshot.
    pub fn from_store(cfg: &DedupConfig, store: &SnapshotStore, today: NaiveDate) -> Self {
        let history = store.history_titles(cfg.lookback_days, today, Some(today));
        tracing::debug!(titles = history.len(), lookback_days = cfg.lookback_days, "dedup history loaded");
        Self::new(cfg, history)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// First seen wins; output keeps input order. An item is dropped when its
    /// title is a near duplicate of an earlier accepted title or of history.
    pub fn deduplicate(&self, items: Vec<TrendingItem>) -> Vec<TrendingItem> {
        let before = items.len();
        let mut accepted: Vec<TrendingItem> = Vec::with_capacity(items.len());

        for item in items {
            if item.title.is_empty() {
                continue;
            }
            let seen_in_run = accepted
                .iter()
                .any(|a| is_near_duplicate(&item.title, &a.title, self.threshold));
            if seen_in_run {
                tracing::debug!(title = %item.title, "duplicate within run");
                continue;
            }
            let seen_before = self
                .history
                .iter()
                .any(|h| is_near_duplicate(&item.title, h, self.threshold));
            if seen_before {
                tracing::debug!(title = %item.title, "duplicate of recent history");
                continue;
            }
            accepted.push(item);
        }

        let dropped = before - accepted.len();
        if dropped > 0 {
            counter!("trend_dedup_dropped_total").increment(dropped as u64);
        }
        tracing::info!(before, after = accepted.len(), "dedup finished");
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn cfg(threshold: f64) -> DedupConfig {
        DedupConfig {
            similarity_threshold: threshold,
            ..DedupConfig::default()
        }
    }

    fn items(titles: &[&str]) -> Vec<TrendingItem> {
        titles
            .iter()
            .map(|t| TrendingItem::new(*t, "test", 1.0))
            .collect()
    }

    fn titles(items: &[TrendingItem]) -> Vec<&str> {
        items.iter().map(|i| i.title.as_str()).collect()
    }

    fn fixtures() -> Vec<TrendingItem> {
        items(&[
            "OpenAI Releases GPT-5",
            "OpenAI Releases GPT-5 Today",
            "Rust 2.0 released with async closures",
            "Rust 2.0 released with async closure",
            "Apple unveils Vision Pro 2",
            "Apple unveils the Vision Pro 2",
            "Kubernetes 1.31 ships sidecar containers",
            "Nvidia posts record data center revenue",
            "Unrelated Sports Recap",
        ])
    }

    #[test]
    fn near_duplicate_is_dropped_first_seen_wins() {
        let d = Deduplicator::new(&cfg(0.85), Vec::new());
        let out = d.deduplicate(items(&[
            "OpenAI Releases GPT-5",
            "OpenAI Releases GPT-5 Today",
            "Unrelated Sports Recap",
        ]));
        assert_eq!(titles(&out), vec!["OpenAI Releases GPT-5", "Unrelated Sports Recap"]);
    }

    #[test]
    fn history_titles_suppress_repeats() {
        let d = Deduplicator::new(&cfg(0.85), vec!["OpenAI Releases GPT-5".to_string()]);
        let out = d.deduplicate(items(&["OpenAI Releases GPT-5 Today", "Unrelated Sports Recap"]));
        assert_eq!(titles(&out), vec!["Unrelated Sports Recap"]);
    }

    #[test]
    fn empty_titles_are_skipped() {
        let d = Deduplicator::new(&cfg(0.85), vec![String::new()]);
        let out = d.deduplicate(items(&["", "Something", ""]));
        assert_eq!(titles(&out), vec!["Something"]);
    }

    #[test]
    fn deduplicate_is_idempotent() {
        let words = ["rust", "ai", "gpu", "cloud", "open", "source", "model", "chip", "release", "new"];
        let mut rng = StdRng::seed_from_u64(7);
        let d = Deduplicator::new(&cfg(0.85), Vec::new());

        for _ in 0..50 {
            let n = rng.random_range(0..20);
            let batch: Vec<TrendingItem> = (0..n)
                .map(|_| {
                    let len = rng.random_range(1..6);
                    let title: Vec<&str> = (0..len)
                        .map(|_| words[rng.random_range(0..words.len())])
                        .collect();
                    TrendingItem::new(title.join(" "), "test", 1.0)
                })
                .collect();
            let once = d.deduplicate(batch);
            let twice = d.deduplicate(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn stricter_threshold_keeps_at_least_as_many_on_fixtures() {
        let mut last = 0usize;
        for t in [0.5, 0.7, 0.85, 0.9, 0.95, 1.0] {
            let kept = Deduplicator::new(&cfg(t), Vec::new())
                .deduplicate(fixtures())
                .len();
            assert!(kept >= last, "threshold {t} kept {kept} < {last}");
            last = kept;
        }
        assert_eq!(last, fixtures().len());
    }

    #[test]
    fn from_store_ignores_todays_snapshot() {
        use crate::snapshot::SnapshotKind;
        use chrono::Utc;

        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path());
        store.ensure_dirs().unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
        store
            .write_snapshot(today, SnapshotKind::Processed, &items(&["Unrelated Sports Recap"]), Utc::now())
            .unwrap();
        store
            .write_snapshot(yesterday, SnapshotKind::Processed, &items(&["OpenAI Releases GPT-5"]), Utc::now())
            .unwrap();

        let d = Deduplicator::from_store(&cfg(0.85), &store, today);
        assert_eq!(d.history_len(), 1);
        let out = d.deduplicate(items(&["Unrelated Sports Recap", "OpenAI Releases GPT-5 Today"]));
        assert_eq!(titles(&out), vec!["Unrelated Sports Recap"]);
    }

    #[test]
    fn history_with_naive_timestamps_still_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path());
        store.ensure_dirs().unwrap();
        std::fs::write(
            store.path_for(crate::snapshot::SnapshotKind::Processed, NaiveDate::from_ymd_opt(2025, 6, 9).unwrap()),
            r#"{"date":"2025-06-09","timestamp":"2025-06-09T10:00:00.123456","count":1,
               "items":[{"title":"OpenAI Releases GPT-5","url":"https://openai.com"}]}"#,
        )
        .unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let d = Deduplicator::from_store(&cfg(0.85), &store, today);
        assert_eq!(d.history_len(), 1);
        let out = d.deduplicate(items(&["OpenAI Releases GPT-5 Today", "Unrelated Sports Recap"]));
        assert_eq!(titles(&out), vec!["Unrelated Sports Recap"]);
    }
}
