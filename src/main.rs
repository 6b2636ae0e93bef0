//! TrendForge daily pipeline: binary entrypoint.
//!
//! Usage: `trendforge [full|crawl]` (default `full`).
//! Exit code 0 on success (zero articles included), 1 on a fatal run error.

use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trendforge::{AppConfig, Pipeline, PipelineError};

const PREVIEW_ITEMS: usize = 5;

/// Compact logs by default; `TRENDFORGE_LOG_FORMAT=json` for JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trendforge=info,warn"));
    let json = std::env::var("TRENDFORGE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Full,
    Crawl,
}

fn parse_command(arg: Option<&str>) -> Option<Command> {
    match arg.unwrap_or("full") {
        "full" => Some(Command::Full),
        "crawl" => Some(Command::Crawl),
        _ => None,
    }
}

async fn execute(cmd: Command) -> Result<(), PipelineError> {
    let cfg = AppConfig::load_default()?;
    let pipeline = Pipeline::from_config(cfg)?;

    match cmd {
        Command::Full => {
            let report = pipeline.run().await?;
            let m = &report.manifest;
            tracing::info!(
                date = %m.date,
                collected = m.counts.collected,
                selected = m.counts.selected,
                articles = report.articles_written(),
                failures = m.generation_failures.len(),
                manifest = %report.manifest_path.display(),
                "run complete"
            );
        }
        Command::Crawl => {
            let items = pipeline.crawl_only().await?;
            tracing::info!(items = items.len(), "fetched");
            for it in items.iter().take(PREVIEW_ITEMS) {
                let preview: String = it.title.chars().take(80).collect();
                tracing::info!(source = %it.source, title = %preview, "preview");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let arg = std::env::args().nth(1);
    let Some(cmd) = parse_command(arg.as_deref()) else {
        eprintln!("usage: trendforge [full|crawl]");
        return ExitCode::from(2);
    };

    match execute(cmd).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "pipeline failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_with_full_as_default() {
        assert_eq!(parse_command(None), Some(Command::Full));
        assert_eq!(parse_command(Some("crawl")), Some(Command::Crawl));
        assert_eq!(parse_command(Some("deploy")), None);
    }
}
