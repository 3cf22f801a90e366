use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One result row from the Newsdata.io `news` endpoint.
///
/// Every field is optional on the wire; articles without a `link` are
/// dropped by the filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(default)]
    pub article_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
}

impl NewsArticle {
    pub fn title_str(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// Publisher name, falling back to the source id.
    pub fn source_label(&self) -> &str {
        self.source_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.source_id.as_deref())
            .unwrap_or("Unknown source")
    }

    /// Parsed publication time (see [`parse_pub_date`]).
    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.pub_date.as_deref().and_then(parse_pub_date)
    }
}

/// Parse the publication timestamps the news API emits.
///
/// Accepts RFC 3339 (`2024-01-15T10:30:00Z`), Newsdata's own
/// `2024-01-15 10:30:00` (UTC) and a bare date. Anything else is `None`.
pub fn parse_pub_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Raw page envelope from the news endpoint.
///
/// On failure Newsdata replies with `status = "error"` and an object in
/// `results`, so `results` stays untyped until the status is checked.
#[derive(Debug, Deserialize)]
pub(crate) struct NewsPage {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: serde_json::Value,
    #[serde(default, rename = "nextPage")]
    pub next_page: Option<String>,
}
