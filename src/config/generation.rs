// src/config/generation.rs
use serde::{Deserialize, Serialize};
use std::env;

fn default_batch_size() -> usize {
    3
}
fn default_max_articles() -> usize {
    10
}
fn default_timeout_secs() -> u64 {
    600
}
fn default_provider() -> String {
    "mock".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_articles")]
    pub max_articles_per_run: usize,
    /// Deadline for a single article.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// "mock" | "openai" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Any OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_articles_per_run: default_max_articles(),
            timeout_secs: default_timeout_secs(),
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            api_key: default_api_key(),
        }
    }
}

impl GenerationConfig {
    /// Normalize provider, resolve the "ENV" key indirection, keep batch size usable.
    pub(crate) fn sanitize(&mut self) {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            // A missing key is not fatal here: the generator reports it per item.
            self.api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        }

        if self.batch_size == 0 {
            self.batch_size = default_batch_size();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_batch_size_falls_back_to_default() {
        let mut g = GenerationConfig {
            batch_size: 0,
            provider: " OpenAI ".into(),
            api_key: "sk-test".into(),
            base_url: "http://localhost:8080/v1/".into(),
            ..Default::default()
        };
        g.sanitize();
        assert_eq!(g.batch_size, 3);
        assert_eq!(g.provider, "openai");
        assert_eq!(g.api_key, "sk-test");
        assert_eq!(g.base_url, "http://localhost:8080/v1");
    }
}
