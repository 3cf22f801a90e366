use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::slack::blocks::{
    account_blocks, build_message_blocks, build_thread_parent_blocks, fallback_text, message_size,
    Block, MAX_BLOCKS_PER_MESSAGE,
};
use crate::summarize::AccountBrief;
use crate::util::{truncate_chars, validate_base_url};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Above this the brief is split into a thread (Slack caps messages near 40 KB).
pub const THREAD_THRESHOLD_BYTES: usize = 30_000;
const PREVIEW_ACCOUNTS: usize = 3;
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Slack answered `ok: false`
    #[error("{0}")]
    Api(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] crate::util::UrlValidationError),
}

/// Result of posting (or previewing) the weekly brief.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostOutcome {
    pub success: bool,
    pub dry_run: bool,
    pub threaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub message_size: usize,
    pub account_count: usize,
    /// Thread replies Slack refused; the parent message still went out.
    pub failed_replies: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PostOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    blocks: &'a [Block],
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
    unfurl_links: bool,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Slack Web API client for `chat.postMessage`.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    bot_token: SecretString,
    endpoint: Url,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("bot_token", &"[REDACTED]")
            .finish()
    }
}

impl SlackClient {
    pub fn new(
        http: reqwest::Client,
        bot_token: SecretString,
        base_url: &str,
    ) -> Result<Self, SlackError> {
        let base = validate_base_url(base_url)?;
        let endpoint = base
            .join("/api/chat.postMessage")
            .map_err(|e| SlackError::Malformed(format!("base URL: {e}")))?;
        Ok(Self {
            http,
            bot_token,
            endpoint,
        })
    }

    /// Post the brief, as one message or as a thread when it exceeds
    /// [`THREAD_THRESHOLD_BYTES`] or [`MAX_BLOCKS_PER_MESSAGE`].
    ///
    /// Never returns an error: failures are reported in the outcome.
    pub async fn post_weekly_brief(
        &self,
        channel: &str,
        briefs: &[AccountBrief],
        dry_run: bool,
        run_key: Option<&str>,
    ) -> PostOutcome {
        if briefs.is_empty() {
            tracing::warn!("No summaries to post");
            return PostOutcome::failure("No summaries provided");
        }

        let blocks = build_message_blocks(briefs, run_key);
        let size = message_size(&blocks);
        tracing::info!(
            bytes = size,
            blocks = blocks.len(),
            accounts = briefs.len(),
            "Built Slack message"
        );

        if dry_run {
            log_preview(channel, briefs);
            return PostOutcome {
                success: true,
                dry_run: true,
                message_size: size,
                account_count: briefs.len(),
                ..Default::default()
            };
        }

        let needs_thread = size > THREAD_THRESHOLD_BYTES || blocks.len() > MAX_BLOCKS_PER_MESSAGE;
        let mut outcome = if needs_thread {
            self.post_threaded(channel, briefs, run_key).await
        } else {
            let text = fallback_text(briefs, run_key);
            match self.post_message(channel, &text, &blocks, None).await {
                Ok(ts) => {
                    tracing::info!(ts = %ts, "Posted brief to Slack");
                    PostOutcome {
                        success: true,
                        ts: Some(ts),
                        channel: Some(channel.to_string()),
                        ..Default::default()
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Slack post failed");
                    PostOutcome::failure(e.to_string())
                }
            }
        };
        outcome.message_size = size;
        outcome.account_count = briefs.len();
        outcome
    }

    /// First account as the parent message, every other account as a reply.
    async fn post_threaded(
        &self,
        channel: &str,
        briefs: &[AccountBrief],
        run_key: Option<&str>,
    ) -> PostOutcome {
        let Some((_, rest)) = briefs.split_first() else {
            return PostOutcome::failure("No summaries provided");
        };
        tracing::info!(replies = rest.len(), "Message too large, posting as thread");

        let parent_blocks = build_thread_parent_blocks(briefs, run_key);
        let text = fallback_text(briefs, run_key);
        let thread_ts = match self.post_message(channel, &text, &parent_blocks, None).await {
            Ok(ts) => ts,
            Err(e) => {
                tracing::error!(error = %e, "Slack parent message failed");
                return PostOutcome::failure(e.to_string());
            }
        };

        let mut failed_replies = 0;
        for brief in rest {
            let blocks = account_blocks(brief);
            let text = format!("{}: {} articles", brief.company, brief.article_count);
            if let Err(e) = self
                .post_message(channel, &text, &blocks, Some(&thread_ts))
                .await
            {
                failed_replies += 1;
                tracing::warn!(company = %brief.company, error = %e, "Slack thread reply failed");
            }
        }

        PostOutcome {
            success: true,
            threaded: true,
            ts: Some(thread_ts),
            channel: Some(channel.to_string()),
            failed_replies,
            ..Default::default()
        }
    }

    /// One `chat.postMessage` call; returns the message `ts`.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        blocks: &[Block],
        thread_ts: Option<&str>,
    ) -> Result<String, SlackError> {
        let payload = PostMessage {
            channel,
            text,
            blocks,
            thread_ts,
            unfurl_links: false,
        };

        let request = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(self.bot_token.expose_secret())
            .json(&payload)
            .send();

        let response = tokio::time::timeout(REQUEST_TIMEOUT, request)
            .await
            .map_err(|_| SlackError::Timeout)?
            .map_err(|e| SlackError::Network(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SlackError::HttpStatus(status.as_u16()));
        }

        let body: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Malformed(e.without_url().to_string()))?;

        if !body.ok {
            return Err(SlackError::Api(
                body.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }
        body.ts
            .ok_or_else(|| SlackError::Malformed("missing ts".to_string()))
    }
}

fn log_preview(channel: &str, briefs: &[AccountBrief]) {
    tracing::info!(channel = %channel, accounts = briefs.len(), "Dry run: not posting to Slack");
    for brief in briefs.iter().take(PREVIEW_ACCOUNTS) {
        tracing::info!(
            company = %brief.company,
            articles = brief.article_count,
            preview = %truncate_chars(&brief.summary, PREVIEW_CHARS),
            "Preview"
        );
    }
    if briefs.len() > PREVIEW_ACCOUNTS {
        tracing::info!(more = briefs.len() - PREVIEW_ACCOUNTS, "Further accounts not previewed");
    }
}
