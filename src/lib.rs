//! Weekly B2B account news brief.
//!
//! For every tracked account the job searches Newsdata.io, keeps the
//! reputable, unique and most recent articles, asks Claude for a sales
//! brief and posts the result to Slack.
//!
//! # Module Structure
//!
//! - `config`: TOML settings, environment overrides and secrets
//! - `accounts`: the YAML/JSON account list
//! - `news`: Newsdata.io client, date window and run key
//! - `filter`: canonical URLs, domain policy, deduplication and ranking
//! - `summarize`: Anthropic Messages client and the brief prompt
//! - `slack`: Block Kit rendering and `chat.postMessage`
//! - `storage`: optional SQLite store of already-reported URLs
//! - `archive`: optional on-disk JSON copy of each posted brief
//! - `job`: per-account pipeline and the weekly run

pub mod accounts;
pub mod archive;
pub mod config;
pub mod filter;
pub mod job;
pub mod news;
pub mod slack;
pub mod storage;
pub mod summarize;
pub mod util;
