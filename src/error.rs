use std::path::PathBuf;

/// Conditions that abort a run. Everything local to one source or one item is
/// handled as a `TaskOutcome` and never reaches this type.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("cannot prepare working directory {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {what} at {}: {source}", path.display())]
    Snapshot {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("cannot build source collectors: {0}")]
    Collectors(String),

    #[error("cannot build article generator: {0}")]
    Generator(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
