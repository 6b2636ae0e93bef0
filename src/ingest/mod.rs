// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::ingest::types::{SourceCollector, TrendingItem};
use crate::outcome::{guarded, TaskOutcome};

/// One-time metrics registration (so series show up once a recorder is installed).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "trend_items_collected_total",
            "Items returned by source collectors."
        );
        describe_counter!(
            "trend_source_errors_total",
            "Collector failures and timeouts."
        );
        describe_counter!(
            "trend_dedup_dropped_total",
            "Items removed as near-duplicates."
        );
        describe_counter!(
            "trend_filter_dropped_total",
            "Items removed by recency/engagement/keyword gates or the cap."
        );
        describe_counter!(
            "trend_generation_errors_total",
            "Article generation failures and timeouts."
        );
        describe_histogram!("trend_collect_ms", "Stage A wall time in milliseconds.");
        describe_gauge!(
            "trend_pipeline_last_run_ts",
            "Unix ts when the pipeline last finished."
        );
    });
}

/// Clean a title at the collector boundary: decode entities, drop tags,
/// straighten typographic quotes, collapse whitespace.
pub fn clean_title(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 300 chars
    if out.chars().count() > 300 {
        out = out.chars().take(300).collect();
    }

    out
}

/// Coarse topic tag from title keywords.
pub fn categorize(title: &str) -> &'static str {
    let lower = title.to_lowercase();
    let has = |kws: &[&str]| kws.iter().any(|kw| lower.contains(kw));

    if has(&["ai", "gpt", "llm", "ml", "neural"]) {
        "AI"
    } else if has(&["blockchain", "crypto", "bitcoin", "web3"]) {
        "blockchain"
    } else if has(&["security", "vulnerability", "breach", "hack", "attack"]) {
        "security"
    } else if has(&["chip", "gpu", "cpu", "semiconductor"]) {
        "hardware"
    } else if has(&["cloud", "aws", "azure", "gcp"]) {
        "cloud"
    } else {
        "tech"
    }
}

/// Per-source line of the run manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceReport {
    pub source: String,
    pub ok: bool,
    pub items: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Stage A: run every collector concurrently, each under its own timeout.
///
/// Failed collectors contribute nothing. Items are merged in registration
/// order, then in each source's own emission order. Items without a title are
/// dropped here so nothing untitled reaches dedup or the filter.
pub async fn collect_all(
    collectors: &[Arc<dyn SourceCollector>],
) -> (Vec<TrendingItem>, Vec<SourceReport>) {
    ensure_metrics_described();
    let t0 = std::time::Instant::now();

    let tasks = collectors.iter().map(|c| {
        let collector = Arc::clone(c);
        let limit = collector.timeout();
        guarded(limit, async move { collector.fetch().await })
    });
    let outcomes = futures::future::join_all(tasks).await;

    let mut merged = Vec::new();
    let mut reports = Vec::with_capacity(collectors.len());
    for (collector, outcome) in collectors.iter().zip(outcomes) {
        let source = collector.name().to_string();
        match outcome {
            TaskOutcome::Succeeded(items) => {
                let before = items.len();
                let kept: Vec<TrendingItem> = items
                    .into_iter()
                    .filter(|it| !it.title.trim().is_empty())
                    .collect();
                if kept.len() < before {
                    tracing::debug!(source = %source, dropped = before - kept.len(), "untitled items dropped");
                }
                tracing::info!(source = %source, items = kept.len(), "collector finished");
                counter!("trend_items_collected_total").increment(kept.len() as u64);
                reports.push(SourceReport {
                    source,
                    ok: true,
                    items: kept.len(),
                    error: None,
                });
                merged.extend(kept);
            }
            TaskOutcome::Failed { reason } => {
                tracing::warn!(source = %source, error = %reason, "collector failed");
                counter!("trend_source_errors_total").increment(1);
                reports.push(SourceReport {
                    source,
                    ok: false,
                    items: 0,
                    error: Some(reason),
                });
            }
        }
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    metrics::histogram!("trend_collect_ms").record(ms);
    (merged, reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_title_decodes_and_collapses() {
        let s = "  Rust&nbsp;&nbsp;<b>2.0</b>   &ldquo;released&rdquo; ";
        assert_eq!(clean_title(s), r#"Rust 2.0 "released""#);
    }

    #[test]
    fn clean_title_keeps_comparison_operators() {
        assert_eq!(clean_title("a < b > c"), "a < b > c");
    }

    #[test]
    fn categorize_prefers_ai_then_falls_back_to_tech() {
        assert_eq!(categorize("New LLM benchmark"), "AI");
        assert_eq!(categorize("Bitcoin hits record"), "blockchain");
        assert_eq!(categorize("Zero-day vulnerability in router"), "security");
        assert_eq!(categorize("Quiet week for open source"), "tech");
    }
}
