// src/publish.rs
//! Article files and the version-control hand-off.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::generate::slugify;
use crate::ingest::types::TrendingItem;

/// One article persisted under the content directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WrittenArticle {
    pub title: String,
    pub slug: String,
    pub path: PathBuf,
}

/// Write `<content_dir>/<date>-<slug>.md` for each article. A failed write is
/// logged and that article skipped. Slug collisions within one call get a
/// numeric suffix instead of overwriting each other.
pub fn write_articles(
    content_dir: &Path,
    date: NaiveDate,
    articles: &[(TrendingItem, String)],
) -> Vec<WrittenArticle> {
    if let Err(e) = fs::create_dir_all(content_dir) {
        tracing::warn!(error = ?e, dir = %content_dir.display(), "cannot create content directory");
        return Vec::new();
    }

    let day = date.format("%Y-%m-%d").to_string();
    let mut used: HashSet<String> = HashSet::new();
    let mut written = Vec::with_capacity(articles.len());

    for (item, body) in articles {
        let mut slug = slugify(&item.title);
        if slug.trim_matches('-').is_empty() {
            slug = "untitled".to_string();
        }
        let mut unique = slug.clone();
        let mut n = 2;
        while !used.insert(unique.clone()) {
            unique = format!("{slug}-{n}");
            n += 1;
        }

        let path = content_dir.join(format!("{day}-{unique}.md"));
        match fs::write(&path, body) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "article written");
                written.push(WrittenArticle {
                    title: item.title.clone(),
                    slug: unique,
                    path,
                });
            }
            Err(e) => {
                tracing::warn!(error = ?e, path = %path.display(), "article write failed, skipping");
            }
        }
    }
    written
}

pub fn commit_message(prefix: &str, count: usize, date: NaiveDate) -> String {
    format!("{prefix} {count} new articles - {}", date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    /// Committed locally; no remote to push to.
    Committed,
    Pushed,
    NothingToCommit,
    Disabled,
    Failed,
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PublishStatus::Committed => "committed",
            PublishStatus::Pushed => "pushed",
            PublishStatus::NothingToCommit => "nothing_to_commit",
            PublishStatus::Disabled => "disabled",
            PublishStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn commit_and_push(&self, message: &str, tracked_paths: &[String]) -> Result<PublishStatus>;
}

pub struct DisabledPublisher;

#[async_trait]
impl Publisher for DisabledPublisher {
    async fn commit_and_push(&self, _message: &str, _tracked_paths: &[String]) -> Result<PublishStatus> {
        Ok(PublishStatus::Disabled)
    }
}

/// Shells out to `git` in `repo_dir`.
pub struct GitPublisher {
    repo_dir: PathBuf,
}

impl GitPublisher {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .with_context(|| format!("spawning git {}", args.first().copied().unwrap_or_default()))
    }

    async fn git_ok(&self, args: &[&str]) -> Result<Output> {
        let out = self.git(args).await?;
        if !out.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(out)
    }
}

#[async_trait]
impl Publisher for GitPublisher {
    async fn commit_and_push(&self, message: &str, tracked_paths: &[String]) -> Result<PublishStatus> {
        // git add fails on pathspecs that match nothing
        let present: Vec<&str> = tracked_paths
            .iter()
            .map(String::as_str)
            .filter(|p| self.repo_dir.join(p).exists())
            .collect();
        if present.is_empty() {
            tracing::warn!("no tracked paths exist, nothing to commit");
            return Ok(PublishStatus::NothingToCommit);
        }

        let mut add = vec!["add", "--"];
        add.extend(present.iter().copied());
        self.git_ok(&add).await?;

        // exit 0: index matches HEAD
        let diff = self.git(&["diff", "--cached", "--quiet"]).await?;
        if diff.status.success() {
            tracing::warn!("no staged changes, skipping commit");
            return Ok(PublishStatus::NothingToCommit);
        }

        self.git_ok(&["commit", "-m", message]).await?;
        tracing::info!(%message, "committed");

        let remotes = self.git_ok(&["remote"]).await?;
        let has_origin = String::from_utf8_lossy(&remotes.stdout)
            .lines()
            .any(|r| r.trim() == "origin");
        if !has_origin {
            tracing::warn!("no origin remote configured, skipping push");
            return Ok(PublishStatus::Committed);
        }

        self.git_ok(&["push", "origin", "HEAD"]).await?;
        tracing::info!("pushed to origin");
        Ok(PublishStatus::Pushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn articles_get_dated_slug_names_without_collisions() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("content/blog");
        let articles = vec![
            (TrendingItem::new("Rust 2.0 Released!", "hn", 1.0), "one".to_string()),
            (TrendingItem::new("Rust 2.0 released", "hn", 1.0), "two".to_string()),
            (TrendingItem::new("???", "hn", 1.0), "three".to_string()),
        ];
        let written = write_articles(&dir, d(), &articles);
        let names: Vec<String> = written
            .iter()
            .map(|w| w.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "2025-06-01-rust-20-released.md",
                "2025-06-01-rust-20-released-2.md",
                "2025-06-01-untitled.md",
            ]
        );
        assert_eq!(fs::read_to_string(&written[1].path).unwrap(), "two");
    }

    #[test]
    fn message_format() {
        assert_eq!(commit_message("feat: add", 3, d()), "feat: add 3 new articles - 2025-06-01");
    }

    #[tokio::test]
    async fn disabled_publisher_does_nothing() {
        let s = DisabledPublisher
            .commit_and_push("x", &["content/".to_string()])
            .await
            .unwrap();
        assert_eq!(s, PublishStatus::Disabled);
    }

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn sh_git(dir: &Path, args: &[&str]) {
        let st = std::process::Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(st.success(), "git {args:?}");
    }

    fn init_repo(dir: &Path) {
        sh_git(dir, &["init", "-q"]);
        sh_git(dir, &["config", "user.email", "bot@trendforge.test"]);
        sh_git(dir, &["config", "user.name", "trendforge"]);
        sh_git(dir, &["config", "commit.gpgsign", "false"]);
    }

    #[tokio::test]
    async fn git_commit_then_clean_index() {
        if !git_available() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        init_repo(tmp.path());
        fs::create_dir_all(tmp.path().join("content")).unwrap();
        fs::write(tmp.path().join("content/a.md"), "hello").unwrap();

        let p = GitPublisher::new(tmp.path());
        let tracked = vec!["content/".to_string(), "data/".to_string()];
        assert_eq!(p.commit_and_push("feat: add 1", &tracked).await.unwrap(), PublishStatus::Committed);
        assert_eq!(
            p.commit_and_push("feat: add 0", &tracked).await.unwrap(),
            PublishStatus::NothingToCommit
        );
    }

    #[tokio::test]
    async fn git_pushes_when_origin_exists() {
        if !git_available() {
            return;
        }
        let remote = tempfile::tempdir().unwrap();
        sh_git(remote.path(), &["init", "-q", "--bare"]);
        let tmp = tempfile::tempdir().unwrap();
        init_repo(tmp.path());
        sh_git(
            tmp.path(),
            &["remote", "add", "origin", &remote.path().display().to_string()],
        );
        fs::create_dir_all(tmp.path().join("data")).unwrap();
        fs::write(tmp.path().join("data/x.json"), "{}").unwrap();

        let p = GitPublisher::new(tmp.path());
        let s = p.commit_and_push("feat: add 1", &["data/".to_string()]).await.unwrap();
        assert_eq!(s, PublishStatus::Pushed);
    }
}
