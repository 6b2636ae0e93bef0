// src/config/mod.rs
//! Run configuration: one immutable value, built once and handed to every stage.
//!
//! Lookup order:
//! 1) `$TRENDFORGE_CONFIG_PATH` (must exist when set)
//! 2) `config/trendforge.toml`
//! 3) built-in defaults
//!
//! Missing sections and keys take their defaults; only a file that exists but
//! cannot be parsed is an error.

pub mod generation;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
pub use generation::GenerationConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/trendforge.toml";
pub const ENV_CONFIG_PATH: &str = "TRENDFORGE_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/* ----------------------------
Filter
---------------------------- */

fn default_recency_hours() -> u64 {
    24
}
fn default_daily_limit() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// source → minimum engagement score (unconfigured sources: 0)
    #[serde(default)]
    pub engagement_thresholds: BTreeMap<String, f64>,
    /// source → ranking multiplier (unconfigured sources: 1.0)
    #[serde(default)]
    pub platform_weights: BTreeMap<String, f64>,
    #[serde(default = "default_recency_hours")]
    pub recency_hours: u64,
    /// Keywords grouped by topic; matching uses the flattened union.
    #[serde(default = "default_topic_keywords")]
    pub topic_keywords: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            engagement_thresholds: BTreeMap::new(),
            platform_weights: BTreeMap::new(),
            recency_hours: default_recency_hours(),
            topic_keywords: default_topic_keywords(),
            daily_limit: default_daily_limit(),
        }
    }
}

impl FilterConfig {
    pub fn threshold_for(&self, source: &str) -> f64 {
        self.engagement_thresholds
            .get(&source.to_ascii_lowercase())
            .copied()
            .unwrap_or(0.0)
    }

    pub fn weight_for(&self, source: &str) -> f64 {
        self.platform_weights
            .get(&source.to_ascii_lowercase())
            .copied()
            .unwrap_or(1.0)
    }

    /// Flattened, lower-cased keyword list (group order, then listed order).
    pub fn keywords(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for kw in self.topic_keywords.values().flatten() {
            let k = kw.trim().to_lowercase();
            if !k.is_empty() && !out.contains(&k) {
                out.push(k);
            }
        }
        out
    }

    fn sanitize(&mut self) {
        self.engagement_thresholds =
            usable_entries("engagement_thresholds", std::mem::take(&mut self.engagement_thresholds));
        self.platform_weights =
            usable_entries("platform_weights", std::mem::take(&mut self.platform_weights));
    }
}

/// Lower-cases keys and drops negative or non-finite values, so the
/// per-source default applies instead.
fn usable_entries(table: &str, m: BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    m.into_iter()
        .filter_map(|(k, v)| {
            if v.is_finite() && v >= 0.0 {
                Some((k.trim().to_ascii_lowercase(), v))
            } else {
                tracing::warn!(table, source = %k, value = v, "ignoring unusable filter value");
                None
            }
        })
        .collect()
}

/// Built-in keyword seed used when the config has no `topic_keywords` table.
fn default_topic_keywords() -> BTreeMap<String, Vec<String>> {
    let mut m = BTreeMap::new();
    for (group, kws) in [
        (
            "ai",
            &["ai", "gpt", "llm", "openai", "machine learning", "neural"][..],
        ),
        (
            "dev",
            &["rust", "python", "javascript", "github", "open source", "database", "api"][..],
        ),
        (
            "industry",
            &["apple", "google", "microsoft", "nvidia", "startup", "chip", "cloud"][..],
        ),
        ("security", &["security", "vulnerability", "breach", "privacy"][..]),
        ("web3", &["blockchain", "crypto", "bitcoin", "web3"][..]),
    ] {
        m.insert(
            group.to_string(),
            kws.iter().map(|s| s.to_string()).collect(),
        );
    }
    m
}

/* ----------------------------
Dedup
---------------------------- */

fn default_similarity_threshold() -> f64 {
    0.85
}
fn default_lookback_days() -> u32 {
    7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            lookback_days: default_lookback_days(),
        }
    }
}

/* ----------------------------
Sources
---------------------------- */

fn default_aggregator_base() -> String {
    "http://localhost:3001".to_string()
}
fn default_aggregator_limit() -> usize {
    30
}
fn default_probe_timeout_secs() -> u64 {
    2
}
fn default_source_timeout_secs() -> u64 {
    30
}
fn default_reddit_user_agent() -> String {
    "trendforge-bot/0.1".to_string()
}
fn default_newsapi_key() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Prefer the aggregator hub when its health probe answers.
    #[serde(default)]
    pub use_aggregator: bool,
    #[serde(default = "default_aggregator_base")]
    pub aggregator_base: String,
    #[serde(default = "default_aggregator_limit")]
    pub aggregator_limit: usize,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Deadline for one collector's whole fetch.
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_reddit_user_agent")]
    pub reddit_user_agent: String,
    /// "ENV" means: read from NEWSAPI_KEY; empty disables the collector.
    #[serde(default = "default_newsapi_key")]
    pub newsapi_key: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            use_aggregator: false,
            aggregator_base: default_aggregator_base(),
            aggregator_limit: default_aggregator_limit(),
            probe_timeout_secs: default_probe_timeout_secs(),
            timeout_secs: default_source_timeout_secs(),
            reddit_user_agent: default_reddit_user_agent(),
            newsapi_key: default_newsapi_key(),
        }
    }
}

impl SourcesConfig {
    fn sanitize(&mut self) {
        if self.newsapi_key.trim().eq_ignore_ascii_case("env") {
            self.newsapi_key = std::env::var("NEWSAPI_KEY").unwrap_or_default();
        }
        self.aggregator_base = self.aggregator_base.trim_end_matches('/').to_string();
        if self.timeout_secs == 0 {
            self.timeout_secs = default_source_timeout_secs();
        }
        if self.probe_timeout_secs == 0 {
            self.probe_timeout_secs = default_probe_timeout_secs();
        }
    }
}

/* ----------------------------
Storage
---------------------------- */

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_content_dir() -> PathBuf {
    PathBuf::from("content/blog")
}
fn default_repo_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_track_paths() -> Vec<String> {
    vec!["content/".to_string(), "data/".to_string()]
}
fn default_commit_prefix() -> String {
    "feat: add".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root for `trending/`, `processed/` and `runs/`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
    /// Commit and push generated files via git.
    #[serde(default)]
    pub publish: bool,
    #[serde(default = "default_repo_dir")]
    pub repo_dir: PathBuf,
    #[serde(default = "default_track_paths")]
    pub track_paths: Vec<String>,
    #[serde(default = "default_commit_prefix")]
    pub commit_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            content_dir: default_content_dir(),
            publish: false,
            repo_dir: default_repo_dir(),
            track_paths: default_track_paths(),
            commit_prefix: default_commit_prefix(),
        }
    }
}

/* ----------------------------
Loading
---------------------------- */

impl AppConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| PipelineError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|reason| PipelineError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(PipelineError::Config {
                    path: pb,
                    reason: format!("{ENV_CONFIG_PATH} points to a non-existent path"),
                });
            }
            return Self::load_from(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        tracing::info!("no config file found, using defaults");
        Ok(Self::defaults())
    }

    /// Defaults with secrets resolved from the environment.
    pub fn defaults() -> Self {
        let mut cfg = Self::default();
        cfg.sanitize();
        cfg
    }

    pub fn from_toml_str(s: &str) -> std::result::Result<Self, String> {
        let mut cfg: AppConfig = toml::from_str(s).map_err(|e| e.to_string())?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn sanitize(&mut self) {
        self.filter.sanitize();
        if !(0.0..=1.0).contains(&self.dedup.similarity_threshold) {
            self.dedup.similarity_threshold = self.dedup.similarity_threshold.clamp(0.0, 1.0);
        }
        if self.dedup.similarity_threshold.is_nan() {
            self.dedup.similarity_threshold = default_similarity_threshold();
        }
        self.generation.sanitize();
        self.sources.sanitize();
    }
}
