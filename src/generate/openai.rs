//! OpenAI-compatible chat-completions generator.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{research_prompt, Generator};
use crate::config::GenerationConfig;
use crate::ingest::types::TrendingItem;

const SYSTEM_PROMPT: &str = "You are a technology research analyst. Write a well-sourced, \
structured Markdown report. Use ## headings, no front matter, no closing remarks about yourself.";

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: &str, model: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("trendforge/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building openai http client")?;
        Ok(Self {
            http,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    pub fn from_config(cfg: &GenerationConfig) -> Result<Self> {
        Self::new(
            &cfg.api_key,
            &cfg.model,
            &cfg.base_url,
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    async fn research(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            bail!("OPENAI_API_KEY is not set");
        }
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.7,
            max_tokens: 4000,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai post()")?;
        if !resp.status().is_success() {
            bail!("openai: status {}", resp.status());
        }
        let body: Resp = resp.json().await.context("openai json")?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let report = content.trim();
        if report.is_empty() {
            return Err(anyhow!("openai: empty completion"));
        }
        Ok(report.to_string())
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, item: &TrendingItem) -> Result<String> {
        self.research(&research_prompt(item))
            .await
            .with_context(|| format!("generating '{}'", item.title))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
