use std::cmp::{Ordering, Reverse};

use chrono::{DateTime, Utc};

use crate::accounts::AccountConfig;
use crate::news::NewsArticle;

/// Publishers ranked above the rest when dates tie, highest first.
const SOURCE_PRIORITY: &[&str] = &[
    "reuters",
    "bloomberg",
    "wall street journal",
    "financial times",
    "business wire",
    "pr newswire",
    "globe newswire",
];

/// Reputation of a publisher name: 7 for Reuters down to 1 for Globe
/// Newswire, 0 for everything else.
pub fn source_priority(source_name: &str) -> u8 {
    let name = source_name.to_lowercase();
    SOURCE_PRIORITY
        .iter()
        .position(|s| name.contains(s))
        .map(|idx| (SOURCE_PRIORITY.len() - idx) as u8)
        .unwrap_or(0)
}

/// Terms whose mentions make an article more relevant to an account: the
/// company name and its keywords, each held as lowercase words.
#[derive(Debug, Clone, Default)]
pub struct RelevanceTerms {
    terms: Vec<Vec<String>>,
}

impl RelevanceTerms {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<Vec<String>> = Vec::new();
        for term in terms {
            let term = words(term.as_ref());
            if !term.is_empty() && !out.contains(&term) {
                out.push(term);
            }
        }
        Self { terms: out }
    }

    pub fn for_account(account: &AccountConfig) -> Self {
        Self::new(
            std::iter::once(account.company.as_str())
                .chain(account.keywords.iter().map(String::as_str)),
        )
    }

    /// Whole-word mentions of every term in title and description. A
    /// multi-word term counts where its words appear consecutively.
    pub fn score(&self, article: &NewsArticle) -> usize {
        if self.terms.is_empty() {
            return 0;
        }
        let haystack = words(&format!(
            "{} {}",
            article.title_str(),
            article.description.as_deref().unwrap_or("")
        ));

        self.terms
            .iter()
            .map(|term| {
                haystack
                    .windows(term.len())
                    .filter(|window| *window == term.as_slice())
                    .count()
            })
            .sum()
    }
}

/// Lowercase alphanumeric runs.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Ordering key: newest first with undated articles last, then source
/// priority, then relevance. Equal keys keep their input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RankKey {
    published: Option<DateTime<Utc>>,
    priority: u8,
    relevance: usize,
}

impl RankKey {
    pub(crate) fn new(published: Option<DateTime<Utc>>, priority: u8, relevance: usize) -> Self {
        Self {
            published,
            priority,
            relevance,
        }
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Some(newer) < Some(older) < None
        let by_date = match (self.published, other.published) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_date
            .then_with(|| Reverse(self.priority).cmp(&Reverse(other.priority)))
            .then_with(|| Reverse(self.relevance).cmp(&Reverse(other.relevance)))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
