//! Per-account summaries from the Anthropic Messages API.
//!
//! [`Summarizer::summarize`] never fails: API problems become an error brief
//! that still carries the article links, so one bad account does not sink
//! the weekly post.

mod claude;
mod prompt;

use serde::{Deserialize, Serialize};

use crate::filter::CandidateArticle;

pub use claude::{Completion, SummarizeError, Summarizer};
pub use prompt::{build_prompt, markdown_to_mrkdwn, MAX_DESCRIPTION_CHARS};

/// A source link shown under an account's summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefLink {
    pub title: String,
    pub source: String,
    pub url: String,
}

/// The summary of one account for the week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBrief {
    pub company: String,
    /// Slack mrkdwn.
    pub summary: String,
    /// Articles that made it through filtering and into the prompt.
    pub article_count: usize,
    /// Raw results returned by the news API before filtering.
    pub articles_fetched: usize,
    pub links: Vec<BriefLink>,
    pub tokens_used: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AccountBrief {
    /// Brief for an account with nothing worth reporting.
    pub fn empty(company: &str, days_lookback: u32) -> Self {
        Self {
            company: company.to_string(),
            summary: format!(
                "*No material items this week.*\n\nNo significant news coverage found for this account in the past {days_lookback} days."
            ),
            article_count: 0,
            articles_fetched: 0,
            links: Vec::new(),
            tokens_used: 0,
            error: None,
        }
    }

    /// Brief for an account whose summary could not be generated.
    pub fn failed(company: &str, articles: &[CandidateArticle], error: String) -> Self {
        Self {
            company: company.to_string(),
            summary: format!("*Error generating summary*\n\n{error}"),
            article_count: articles.len(),
            articles_fetched: 0,
            links: links_for(articles),
            tokens_used: 0,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One link per article, in ranking order.
pub fn links_for(articles: &[CandidateArticle]) -> Vec<BriefLink> {
    articles
        .iter()
        .map(|c| BriefLink {
            title: match c.article.title_str().trim() {
                "" => "No title".to_string(),
                t => t.to_string(),
            },
            source: c.article.source_label().to_string(),
            url: c.canonical_url.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::NewsArticle;

    #[test]
    fn test_empty_brief() {
        let brief = AccountBrief::empty("Acme", 7);
        assert_eq!(
            brief.summary,
            "*No material items this week.*\n\nNo significant news coverage found for this account in the past 7 days."
        );
        assert!(brief.links.is_empty());
        assert!(!brief.is_error());
    }

    #[test]
    fn test_failed_brief_keeps_links() {
        let article = CandidateArticle::from_article(NewsArticle {
            title: Some("Acme news".to_string()),
            link: Some("https://www.reuters.com/a".to_string()),
            ..Default::default()
        })
        .unwrap();
        let brief = AccountBrief::failed("Acme", &[article], "HTTP error: status 500".to_string());

        assert_eq!(brief.summary, "*Error generating summary*\n\nHTTP error: status 500");
        assert_eq!(brief.article_count, 1);
        assert_eq!(
            brief.links,
            vec![BriefLink {
                title: "Acme news".to_string(),
                source: "Unknown source".to_string(),
                url: "https://www.reuters.com/a".to_string(),
            }]
        );
        assert_eq!(brief.tokens_used, 0);
        assert!(brief.is_error());
    }

    #[test]
    fn test_serialized_brief_omits_missing_error() {
        let json = serde_json::to_value(AccountBrief::empty("Acme", 7)).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["company"], "Acme");
    }
}
