//! Posting the weekly brief to Slack.
//!
//! `blocks` renders briefs into Block Kit; `client` decides between a single
//! message and a thread and talks to `chat.postMessage`.

mod blocks;
mod client;

pub use blocks::{
    account_blocks, build_message_blocks, build_thread_parent_blocks, fallback_text, format_links,
    header_text, message_size, Block, TextObject, MAX_BLOCKS_PER_MESSAGE, MAX_LINKS,
    MAX_SECTION_CHARS,
};
pub use client::{PostOutcome, SlackClient, SlackError, THREAD_THRESHOLD_BYTES};
