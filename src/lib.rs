// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod generate;
pub mod ingest;
pub mod outcome;
pub mod pipeline;
pub mod publish;
pub mod similarity;
pub mod snapshot;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::dedup::Deduplicator;
pub use crate::error::PipelineError;
pub use crate::filter::TrendingFilter;
pub use crate::generate::Generator;
pub use crate::ingest::types::{SourceCollector, TrendingItem};
pub use crate::outcome::TaskOutcome;
pub use crate::pipeline::{Pipeline, RunManifest, RunReport};
pub use crate::publish::{PublishStatus, Publisher};
pub use crate::snapshot::{RunSnapshot, SnapshotKind, SnapshotStore};
