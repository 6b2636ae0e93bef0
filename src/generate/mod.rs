//! Article generation: provider abstraction, the research prompt and the
//! Markdown/front-matter wrapper every provider's report goes through.

pub mod mock;
pub mod openai;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::config::GenerationConfig;
use crate::ingest::types::TrendingItem;

pub use mock::MockGenerator;
pub use openai::OpenAiGenerator;

const EXCERPT_LEN: usize = 150;
const SLUG_MAX_LEN: usize = 50;
const MAX_TAGS: usize = 5;

/// Title keyword → tag, checked in this order.
const TAG_KEYWORDS: [(&str, &str); 12] = [
    ("ai", "AI"),
    ("gpt", "GPT"),
    ("openai", "OpenAI"),
    ("google", "Google"),
    ("apple", "Apple"),
    ("microsoft", "Microsoft"),
    ("blockchain", "Blockchain"),
    ("web3", "Web3"),
    ("crypto", "Crypto"),
    ("cloud", "Cloud"),
    ("database", "Database"),
    ("security", "Security"),
];

/// Produces the Markdown research report for one item. The pipeline wraps it
/// with front matter through [`format_article`].
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, item: &TrendingItem) -> Result<String>;
    fn name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn Generator>;

/// Factory keyed on `generation.provider`. Unknown names fall back to the mock
/// so a typo never sends traffic anywhere.
pub fn build_generator(cfg: &GenerationConfig) -> Result<DynGenerator> {
    match cfg.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiGenerator::from_config(cfg)?)),
        "mock" => Ok(Arc::new(MockGenerator::default())),
        other => {
            tracing::warn!(provider = other, "unknown generation provider, using mock");
            Ok(Arc::new(MockGenerator::default()))
        }
    }
}

/// Research brief handed to the model for one topic.
pub fn research_prompt(item: &TrendingItem) -> String {
    let category = if item.category.is_empty() {
        "tech"
    } else {
        item.category.as_str()
    };
    format!(
        "Research topic: {title}\n\
         \n\
         Requirements:\n\
         1. Write an in-depth analysis of 1000 to 1500 words.\n\
         2. Cover technical details, industry impact and outlook.\n\
         3. Cite authoritative and recent sources.\n\
         4. Target engineering and operations readers.\n\
         5. Use a clear structure with headed sections.\n\
         \n\
         Reference: {url}\n\
         Category: {category}\n",
        title = item.title,
        url = item.url,
    )
}

/// URL-safe slug: lower-case, drop everything but word characters, whitespace
/// and `-`, squeeze `-`/whitespace runs to one `-`, keep 50 characters.
pub fn slugify(title: &str) -> String {
    static RE_STRIP: OnceCell<Regex> = OnceCell::new();
    static RE_SEP: OnceCell<Regex> = OnceCell::new();
    let strip = RE_STRIP.get_or_init(|| Regex::new(r"[^\w\s-]").unwrap());
    let sep = RE_SEP.get_or_init(|| Regex::new(r"[-\s]+").unwrap());

    let lower = title.to_lowercase();
    let stripped = strip.replace_all(&lower, "");
    let slug = sep.replace_all(&stripped, "-");
    slug.chars().take(SLUG_MAX_LEN).collect()
}

/// First 150 characters of the report without Markdown punctuation.
pub fn excerpt(report: &str) -> String {
    static RE_MD: OnceCell<Regex> = OnceCell::new();
    let md = RE_MD.get_or_init(|| Regex::new(r"[#*`\[\]()]").unwrap());
    let plain = md.replace_all(report, "");
    let head: String = plain.chars().take(EXCERPT_LEN).collect();
    format!("{}...", head.trim())
}

/// Category first, then keyword tags from the title, without repeats; five at most.
pub fn tags_for(item: &TrendingItem) -> Vec<String> {
    let mut tags = Vec::new();
    if !item.category.is_empty() {
        tags.push(item.category.clone());
    }
    let title = item.title.to_lowercase();
    for (kw, tag) in TAG_KEYWORDS {
        if title.contains(kw) && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags.truncate(MAX_TAGS);
    tags
}

// Double-quoted YAML scalar on one line.
fn yaml_quoted(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], " ");
    format!("\"{escaped}\"")
}

/// Wrap a research report with the blog front matter. `at` is the run clock,
/// so the front-matter date matches the article file name.
pub fn format_article(report: &str, item: &TrendingItem, at: DateTime<Utc>) -> String {
    let tags = tags_for(item)
        .iter()
        .map(|t| yaml_quoted(t))
        .collect::<Vec<_>>()
        .join(", ");
    let category = if item.category.is_empty() {
        "tech"
    } else {
        item.category.as_str()
    };

    let mut out = String::with_capacity(report.len() + 512);
    out.push_str("---\n");
    out.push_str(&format!("title: {}\n", yaml_quoted(&item.title)));
    out.push_str(&format!("date: {}\n", at.format("%Y-%m-%d")));
    out.push_str(&format!("time: {}\n", at.format("%H:%M:%S")));
    out.push_str(&format!("slug: {}\n", slugify(&item.title)));
    out.push_str(&format!("source: {}\n", item.source));
    out.push_str(&format!("source_url: {}\n", item.url));
    out.push_str(&format!("engagement_score: {}\n", item.engagement_score));
    out.push_str(&format!("category: {category}\n"));
    out.push_str(&format!("tags: [{tags}]\n"));
    out.push_str(&format!("excerpt: {}\n", yaml_quoted(&excerpt(report))));
    out.push_str("status: published\n");
    out.push_str("---\n\n");
    out.push_str(report);
    out
}
