use anyhow::Result;
use async_trait::async_trait;
use super::Generator;
use crate::ingest::types::TrendingItem;

/// Offline generator: a fixed report built from the item itself.
/// Same item, same body.
#[derive(Debug, Clone, Default)]
pub struct MockGenerator;

impl MockGenerator {
    pub fn report_for(item: &TrendingItem) -> String {
        format!(
            "## {title}\n\n\
             This is a placeholder analysis for a topic trending on {source}.\n\n\
             ## Why it matters\n\n\
             Engagement score {score:.0} in category {category}.\n\n\
             Source: {url}\n",
            title = item.title,
            source = item.source,
            score = item.engagement_score,
            category = item.category,
            url = item.url,
        )
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, item: &TrendingItem) -> Result<String> {
        Ok(Self::report_for(item))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_report_is_stable_markdown() {
        let item = TrendingItem::new("Rust in the kernel", "hackernews", 321.0)
            .with_url("https://hn.test/1")
            .with_category("tech");
        let report = MockGenerator.generate(&item).await.unwrap();
        assert!(report.starts_with("## Rust in the kernel\n"));
        assert!(report.contains("Engagement score 321 in category tech"));
        assert!(report.contains("Source: https://hn.test/1"));
        assert_eq!(report, MockGenerator.generate(&item).await.unwrap());
    }
}
