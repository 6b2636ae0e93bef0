//! Per-task result used at every isolation boundary of a run.
//!
//! Collectors and generators report `anyhow::Result`; the orchestrator turns
//! each call into a `TaskOutcome` here, so the decision "keep or drop" is made
//! in one place. Timeouts and panics end up as `Failed` like any other error.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    Succeeded(T),
    Failed { reason: String },
}

impl<T> TaskOutcome<T> {
    pub fn failed(reason: impl Into<String>) -> Self {
        TaskOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            TaskOutcome::Succeeded(_) => None,
            TaskOutcome::Failed { reason } => Some(reason),
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            TaskOutcome::Succeeded(v) => Some(v),
            TaskOutcome::Failed { .. } => None,
        }
    }
}

/// Run `fut` on its own task with a deadline.
///
/// The spawned task isolates panics; the caller only ever sees an outcome.
pub async fn guarded<T, F>(limit: Duration, fut: F) -> TaskOutcome<T>
where
    T: Send + 'static,
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    let handle = tokio::spawn(async move { tokio::time::timeout(limit, fut).await });
    match handle.await {
        Ok(Ok(Ok(value))) => TaskOutcome::Succeeded(value),
        Ok(Ok(Err(e))) => TaskOutcome::failed(format!("{e:#}")),
        Ok(Err(_elapsed)) => {
            TaskOutcome::failed(format!("timed out after {:.1}s", limit.as_secs_f64()))
        }
        Err(join) if join.is_panic() => TaskOutcome::failed("task panicked"),
        Err(_) => TaskOutcome::failed("task cancelled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_passes_value_through() {
        let out = guarded(Duration::from_secs(1), async { Ok(7u32) }).await;
        assert_eq!(out, TaskOutcome::Succeeded(7));
    }

    #[tokio::test]
    async fn error_becomes_failed_with_context() {
        let out: TaskOutcome<u32> = guarded(Duration::from_secs(1), async {
            Err(anyhow::anyhow!("boom").context("fetching"))
        })
        .await;
        let reason = out.reason().unwrap();
        assert!(reason.contains("fetching"));
        assert!(reason.contains("boom"));
    }

    #[tokio::test]
    async fn timeout_becomes_failed() {
        let out: TaskOutcome<()> = guarded(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(out.reason().unwrap().starts_with("timed out"));
    }

    fn out_of_order() -> bool {
        true
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let out: TaskOutcome<()> = guarded(Duration::from_secs(1), async {
            if out_of_order() {
                panic!("collector bug");
            }
            Ok(())
        })
        .await;
        assert_eq!(out.reason(), Some("task panicked"));
    }
}
