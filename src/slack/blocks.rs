use serde::Serialize;

use crate::summarize::{AccountBrief, BriefLink};
use crate::util::{escape_mrkdwn, strip_control_chars, truncate_chars};

/// Slack rejects section text longer than this.
pub const MAX_SECTION_CHARS: usize = 3000;
/// Links listed under each account.
pub const MAX_LINKS: usize = 12;
/// `chat.postMessage` rejects messages with more blocks than this.
pub const MAX_BLOCKS_PER_MESSAGE: usize = 50;

const HEADER: &str = "📰 Top Accounts — Weekly Brief";

/// The subset of Block Kit used by the brief.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { text: TextObject },
    Context { elements: Vec<TextObject> },
    Section { text: TextObject },
    Divider,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String },
    Mrkdwn { text: String },
}

impl Block {
    fn section(text: &str) -> Self {
        Block::Section {
            text: TextObject::Mrkdwn {
                text: truncate_chars(text, MAX_SECTION_CHARS).into_owned(),
            },
        }
    }
}

/// Title of the message, with the run's week when known.
pub fn header_text(run_key: Option<&str>) -> String {
    match run_key {
        Some(key) => format!("{HEADER} ({key})"),
        None => HEADER.to_string(),
    }
}

/// Full message: header, account count, then each account separated by
/// dividers.
pub fn build_message_blocks(briefs: &[AccountBrief], run_key: Option<&str>) -> Vec<Block> {
    let mut blocks = intro_blocks(briefs.len(), run_key);
    for (idx, brief) in briefs.iter().enumerate() {
        blocks.extend(account_blocks(brief));
        if idx + 1 < briefs.len() {
            blocks.push(Block::Divider);
        }
    }

    blocks
}

/// Parent of a threaded brief: the intro for every account, then the first
/// account only. The rest go out as replies.
pub fn build_thread_parent_blocks(briefs: &[AccountBrief], run_key: Option<&str>) -> Vec<Block> {
    let mut blocks = intro_blocks(briefs.len(), run_key);
    if let Some(first) = briefs.first() {
        blocks.extend(account_blocks(first));
    }
    blocks
}

fn intro_blocks(account_count: usize, run_key: Option<&str>) -> Vec<Block> {
    vec![
        Block::Header {
            text: TextObject::PlainText {
                text: header_text(run_key),
            },
        },
        Block::Context {
            elements: vec![TextObject::Mrkdwn {
                text: format!("Updates from {account_count} accounts"),
            }],
        },
        Block::Divider,
    ]
}

/// Company heading, summary and links for one account.
pub fn account_blocks(brief: &AccountBrief) -> Vec<Block> {
    let company = sanitize(&brief.company);
    let mut blocks = vec![Block::section(&format!(
        "*{}*\n_{} articles this week_",
        company, brief.article_count
    ))];

    if !brief.summary.trim().is_empty() {
        blocks.push(Block::section(&brief.summary));
    }

    let links = format_links(&brief.links);
    if !links.is_empty() {
        blocks.push(Block::section(&format!("*Links:*\n{links}")));
    }

    blocks
}

/// `• <url|title> — _source_` per link, at most [`MAX_LINKS`].
pub fn format_links(links: &[BriefLink]) -> String {
    links
        .iter()
        .filter(|l| !l.url.is_empty())
        .take(MAX_LINKS)
        .map(|l| {
            format!(
                "• <{}|{}> — _{}_",
                l.url,
                sanitize(&l.title),
                sanitize(&l.source)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Plain-text fallback shown in notifications.
pub fn fallback_text(briefs: &[AccountBrief], run_key: Option<&str>) -> String {
    format!("{}: updates from {} accounts", header_text(run_key), briefs.len())
}

/// Serialized size of the blocks, which decides single vs threaded posting.
pub fn message_size(blocks: &[Block]) -> usize {
    serde_json::to_string(blocks).map(|s| s.len()).unwrap_or(usize::MAX)
}

fn sanitize(text: &str) -> String {
    escape_mrkdwn(&strip_control_chars(text)).into_owned()
}
