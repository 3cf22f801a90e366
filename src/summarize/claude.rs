use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::filter::CandidateArticle;
use crate::summarize::prompt::{build_prompt, markdown_to_mrkdwn};
use crate::summarize::{links_for, AccountBrief};
use crate::util::validate_base_url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TOKENS: u32 = 900;
const TEMPERATURE: f64 = 0.3;
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("API error: status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Empty response content")]
    EmptyContent,
    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] crate::util::UrlValidationError),
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// The generated text and what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u64,
}

/// Anthropic Messages API client that turns an account's articles into a
/// brief.
#[derive(Clone)]
pub struct Summarizer {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
    endpoint: Url,
    days_lookback: u32,
}

impl std::fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summarizer")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl Summarizer {
    pub fn new(
        http: reqwest::Client,
        api_key: SecretString,
        model: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, SummarizeError> {
        let base = validate_base_url(base_url)?;
        let endpoint = base
            .join("/v1/messages")
            .map_err(|e| SummarizeError::Malformed(format!("base URL: {e}")))?;
        Ok(Self {
            http,
            api_key,
            model: model.into(),
            endpoint,
            days_lookback: crate::config::DEFAULT_DAYS_LOOKBACK,
        })
    }

    /// Lookback quoted in the "no news" brief.
    pub fn with_days_lookback(mut self, days: u32) -> Self {
        self.days_lookback = days;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Summarize one account's ranked articles.
    pub async fn summarize(&self, company: &str, articles: &[CandidateArticle]) -> AccountBrief {
        if articles.is_empty() {
            tracing::info!(company = %company, "No articles to summarize");
            return AccountBrief::empty(company, self.days_lookback);
        }

        let prompt = build_prompt(company, articles);
        match self.complete(&prompt).await {
            Ok(completion) => {
                tracing::info!(
                    company = %company,
                    tokens = completion.tokens_used,
                    "Summarization complete"
                );
                AccountBrief {
                    company: company.to_string(),
                    summary: markdown_to_mrkdwn(&completion.text),
                    article_count: articles.len(),
                    articles_fetched: 0,
                    links: links_for(articles),
                    tokens_used: completion.tokens_used,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(company = %company, error = %e, "Summarization failed");
                AccountBrief::failed(company, articles, e.to_string())
            }
        }
    }

    /// Single-turn completion of `prompt`.
    pub async fn complete(&self, prompt: &str) -> Result<Completion, SummarizeError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let request = self
            .http
            .post(self.endpoint.clone())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send();

        let response = tokio::time::timeout(REQUEST_TIMEOUT, request)
            .await
            .map_err(|_| SummarizeError::Timeout)?
            .map_err(|e| SummarizeError::Network(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(SummarizeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::Malformed(e.without_url().to_string()))?;

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Err(SummarizeError::EmptyContent);
        }

        Ok(Completion {
            text,
            tokens_used: parsed.usage.input_tokens + parsed.usage.output_tokens,
        })
    }
}
