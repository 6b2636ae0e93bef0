// src/pipeline.rs
//! One daily run: collect → raw snapshot → dedup → filter → processed snapshot
//! → batched generation → article files → run manifest → publish → final
//! run manifest.
//!
//! Only workspace and snapshot persistence failures abort a run. Sources,
//! generation and publishing fail per task and are recorded in the manifest.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::AppConfig;
use crate::dedup::Deduplicator;
use crate::error::{PipelineError, Result};
use crate::filter::TrendingFilter;
use crate::generate::{build_generator, format_article, DynGenerator};
use crate::ingest::providers::{select_collectors, CollectorMode};
use crate::ingest::types::{SourceCollector, TrendingItem};
use crate::ingest::{collect_all, ensure_metrics_described, SourceReport};
use crate::outcome::{guarded, TaskOutcome};
use crate::publish::{
    commit_message, write_articles, DisabledPublisher, GitPublisher, PublishStatus, Publisher,
    WrittenArticle,
};
use crate::snapshot::{SnapshotKind, SnapshotStore};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageCounts {
    pub collected: usize,
    pub after_dedup: usize,
    pub after_filter: usize,
    pub selected: usize,
    pub generated: usize,
    pub written: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationFailure {
    pub title: String,
    pub reason: String,
}

/// Audit record of one run, stored as `runs/<date>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: String,
    pub date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub collector_mode: CollectorMode,
    pub sources: Vec<SourceReport>,
    pub counts: StageCounts,
    pub selected: Vec<String>,
    pub articles: Vec<WrittenArticle>,
    pub generation_failures: Vec<GenerationFailure>,
    /// `None` when nothing was handed to the publisher.
    pub publish: Option<PublishStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub manifest: RunManifest,
    pub raw_snapshot: PathBuf,
    pub processed_snapshot: PathBuf,
    pub manifest_path: PathBuf,
}

impl RunReport {
    pub fn articles_written(&self) -> usize {
        self.manifest.articles.len()
    }
}

/// SHA-256 over the date and the ordered selected titles.
pub fn run_fingerprint(date: NaiveDate, titles: &[String]) -> String {
    let mut h = Sha256::new();
    h.update(date.format("%Y-%m-%d").to_string().as_bytes());
    for t in titles {
        h.update(b"\n");
        h.update(t.as_bytes());
    }
    h.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

pub struct Pipeline {
    cfg: AppConfig,
    store: SnapshotStore,
    collectors: Option<Vec<Arc<dyn SourceCollector>>>,
    generator: DynGenerator,
    publisher: Arc<dyn Publisher>,
}

impl Pipeline {
    /// Production wiring: collectors selected per run, generator and
    /// publisher from configuration.
    pub fn from_config(cfg: AppConfig) -> Result<Self> {
        let generator = build_generator(&cfg.generation)
            .map_err(|e| PipelineError::Generator(format!("{e:#}")))?;
        let publisher: Arc<dyn Publisher> = if cfg.storage.publish {
            Arc::new(GitPublisher::new(cfg.storage.repo_dir.clone()))
        } else {
            Arc::new(DisabledPublisher)
        };
        Ok(Self::new(cfg, generator, publisher))
    }

    pub fn new(cfg: AppConfig, generator: DynGenerator, publisher: Arc<dyn Publisher>) -> Self {
        let store = SnapshotStore::new(cfg.storage.data_dir.clone());
        Self {
            cfg,
            store,
            collectors: None,
            generator,
            publisher,
        }
    }

    /// Use these collectors instead of selecting from configuration.
    pub fn with_collectors(mut self, collectors: Vec<Arc<dyn SourceCollector>>) -> Self {
        self.collectors = Some(collectors);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    async fn resolve_collectors(&self) -> Result<(CollectorMode, Vec<Arc<dyn SourceCollector>>)> {
        match &self.collectors {
            Some(c) => Ok((CollectorMode::Custom, c.clone())),
            None => select_collectors(&self.cfg.sources)
                .await
                .map_err(|e| PipelineError::Collectors(format!("{e:#}"))),
        }
    }

    fn prepare_workspace(&self) -> Result<()> {
        self.store.ensure_dirs()?;
        let content = &self.cfg.storage.content_dir;
        std::fs::create_dir_all(content).map_err(|source| PipelineError::Workspace {
            path: content.clone(),
            source,
        })
    }

    /// Source selection and collection only; nothing is written.
    pub async fn crawl_only(&self) -> Result<Vec<TrendingItem>> {
        ensure_metrics_described();
        let (mode, collectors) = self.resolve_collectors().await?;
        let (items, _reports) = collect_all(&collectors).await;
        tracing::info!(?mode, items = items.len(), "crawl finished");
        Ok(items)
    }

    pub async fn run(&self) -> Result<RunReport> {
        self.run_at(Utc::now()).await
    }

    /// Full run with `now` as the clock for recency, snapshot dates and timestamps.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunReport> {
        ensure_metrics_described();
        let started_at = now;
        let date = now.date_naive();

        self.prepare_workspace()?;

        // A: collect
        let (mode, collectors) = self.resolve_collectors().await?;
        let (collected, sources) = collect_all(&collectors).await;
        tracing::info!(?mode, sources = sources.len(), items = collected.len(), "collection finished");

        // B: raw snapshot
        let raw_snapshot = self
            .store
            .write_snapshot(date, SnapshotKind::Raw, &collected, now)?;

        // C: curate
        let mut counts = StageCounts {
            collected: collected.len(),
            ..StageCounts::default()
        };
        let dedup = Deduplicator::from_store(&self.cfg.dedup, &self.store, date);
        let unique = dedup.deduplicate(collected);
        counts.after_dedup = unique.len();

        let mut selected = TrendingFilter::new(&self.cfg.filter).filter_at(unique, now);
        counts.after_filter = selected.len();
        selected.truncate(self.cfg.generation.max_articles_per_run);
        counts.selected = selected.len();

        for (idx, it) in selected.iter().enumerate() {
            tracing::info!(rank = idx + 1, source = %it.source, title = %it.title, "selected");
        }

        // D: processed snapshot (also written when empty, so history stays dated)
        let processed_snapshot =
            self.store
                .write_snapshot(date, SnapshotKind::Processed, &selected, now)?;

        let titles: Vec<String> = selected.iter().map(|it| it.title.clone()).collect();
        let mut manifest = RunManifest {
            run_id: run_fingerprint(date, &titles),
            date,
            started_at,
            finished_at: started_at,
            collector_mode: mode,
            sources,
            counts,
            selected: titles,
            articles: Vec::new(),
            generation_failures: Vec::new(),
            publish: None,
            publish_error: None,
        };

        if selected.is_empty() {
            tracing::warn!("no topics passed the filter today");
        } else {
            // E: generate
            let (generated, failures) = self.generate_batched(&selected, now).await;
            manifest.counts.generated = generated.len();
            manifest.generation_failures = failures;

            // F: files + publish
            let written = write_articles(&self.cfg.storage.content_dir, date, &generated);
            manifest.counts.written = written.len();
            manifest.articles = written;

            if !manifest.articles.is_empty() {
                // Committed copy carries `publish: null`; it is rewritten below.
                manifest.finished_at = Utc::now().max(started_at);
                self.store.write_manifest(&manifest)?;

                let msg = commit_message(&self.cfg.storage.commit_prefix, manifest.articles.len(), date);
                match self
                    .publisher
                    .commit_and_push(&msg, &self.cfg.storage.track_paths)
                    .await
                {
                    Ok(status) => {
                        tracing::info!(%status, "publish finished");
                        manifest.publish = Some(status);
                    }
                    Err(e) => {
                        tracing::warn!(error = ?e, "publish failed");
                        manifest.publish = Some(PublishStatus::Failed);
                        manifest.publish_error = Some(format!("{e:#}"));
                    }
                }
            }
        }

        manifest.finished_at = Utc::now().max(started_at);
        let manifest_path = self.store.write_manifest(&manifest)?;
        gauge!("trend_pipeline_last_run_ts").set(manifest.finished_at.timestamp() as f64);
        tracing::info!(
            run_id = %manifest.run_id,
            selected = manifest.counts.selected,
            written = manifest.counts.written,
            "pipeline finished"
        );

        Ok(RunReport {
            manifest,
            raw_snapshot,
            processed_snapshot,
            manifest_path,
        })
    }

    /// Batches run one after another; items inside a batch run concurrently.
    /// Results are matched back to their items by position and wrapped with
    /// front matter stamped at `now`.
    async fn generate_batched(
        &self,
        selected: &[TrendingItem],
        now: DateTime<Utc>,
    ) -> (Vec<(TrendingItem, String)>, Vec<GenerationFailure>) {
        let batch_size = self.cfg.generation.batch_size.max(1);
        let limit = Duration::from_secs(self.cfg.generation.timeout_secs);
        let mut generated = Vec::with_capacity(selected.len());
        let mut failures = Vec::new();

        for (batch_no, batch) in selected.chunks(batch_size).enumerate() {
            tracing::info!(batch = batch_no + 1, size = batch.len(), generator = self.generator.name(), "generating batch");
            let tasks = batch.iter().cloned().map(|item| {
                let generator = Arc::clone(&self.generator);
                guarded(limit, async move { generator.generate(&item).await })
            });
            let outcomes = futures::future::join_all(tasks).await;

            for (item, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    TaskOutcome::Succeeded(report) => {
                        let article = format_article(&report, item, now);
                        generated.push((item.clone(), article));
                    }
                    TaskOutcome::Failed { reason } => {
                        tracing::warn!(title = %item.title, error = %reason, "generation failed");
                        counter!("trend_generation_errors_total").increment(1);
                        failures.push(GenerationFailure {
                            title: item.title.clone(),
                            reason,
                        });
                    }
                }
            }
        }
        (generated, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_depends_on_date_and_order() {
        let d = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let a = vec!["x".to_string(), "y".to_string()];
        let b = vec!["y".to_string(), "x".to_string()];
        assert_eq!(run_fingerprint(d, &a), run_fingerprint(d, &a));
        assert_ne!(run_fingerprint(d, &a), run_fingerprint(d, &b));
        assert_ne!(run_fingerprint(d, &a), run_fingerprint(d.succ_opt().unwrap(), &a));
        assert_eq!(run_fingerprint(d, &a).len(), 64);
    }
}
