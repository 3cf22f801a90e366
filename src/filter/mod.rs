//! Article selection: canonical identity, domain policy, deduplication and
//! ranking.
//!
//! # Module Structure
//!
//! - `canonical`: tracking-free canonical links and their SHA-256 identity
//! - `domain`: allow/block lists matched on DNS labels
//! - `similarity`: headline normalization and Ratcliff/Obershelp ratio
//! - `rank`: source reputation, keyword relevance and the sort key
//!
//! The pipeline is pure and synchronous. [`ArticleFilter::prepare`] and
//! [`ArticleFilter::select`] are split so callers can drop already-seen
//! hashes in between.

mod canonical;
mod domain;
mod rank;
mod similarity;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use url::Url;

use crate::config::DEFAULT_SIMILARITY_THRESHOLD;
use crate::news::NewsArticle;

pub use canonical::{canonicalize_url, hash_url};
pub use domain::{normalize_host, DomainPolicy, DomainVerdict};
pub use rank::{source_priority, RelevanceTerms};
pub use similarity::{normalize_title, similarity_ratio, title_similarity};

use rank::RankKey;

/// An article that survived canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateArticle {
    pub article: NewsArticle,
    pub canonical_url: String,
    /// Lowercase hex SHA-256 of `canonical_url`.
    pub url_hash: String,
    pub published: Option<DateTime<Utc>>,
}

impl CandidateArticle {
    /// `None` when the article has no usable link.
    pub fn from_article(article: NewsArticle) -> Option<Self> {
        let canonical_url = canonicalize_url(article.link.as_deref()?)?;
        let url_hash = hash_url(&canonical_url);
        let published = article.published();
        Some(Self {
            article,
            canonical_url,
            url_hash,
            published,
        })
    }

    pub fn host(&self) -> Option<String> {
        Url::parse(&self.canonical_url)
            .ok()?
            .host_str()
            .map(str::to_string)
    }
}

#[derive(Debug, Clone)]
pub struct ArticleFilter {
    policy: DomainPolicy,
    similarity_threshold: f64,
}

impl Default for ArticleFilter {
    fn default() -> Self {
        Self::new(DomainPolicy::default(), DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl ArticleFilter {
    pub fn new(policy: DomainPolicy, similarity_threshold: f64) -> Self {
        Self {
            policy,
            similarity_threshold,
        }
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Canonicalize, dropping articles without a valid link.
    pub fn prepare(&self, articles: Vec<NewsArticle>) -> Vec<CandidateArticle> {
        let total = articles.len();
        let candidates: Vec<CandidateArticle> = articles
            .into_iter()
            .filter_map(CandidateArticle::from_article)
            .collect();

        if candidates.len() < total {
            tracing::debug!(
                dropped = total - candidates.len(),
                "Dropped articles without a usable link"
            );
        }
        candidates
    }

    /// Domain policy, URL dedupe, title dedupe, rank, cap.
    pub fn select(
        &self,
        candidates: Vec<CandidateArticle>,
        max_articles: usize,
        relevance: &RelevanceTerms,
    ) -> Vec<CandidateArticle> {
        let input = candidates.len();

        let allowed: Vec<CandidateArticle> = candidates
            .into_iter()
            .filter(|c| {
                let host = c.host().unwrap_or_default();
                let verdict = self
                    .policy
                    .verdict(&host, c.article.source_url.as_deref());
                if verdict != DomainVerdict::Allowed {
                    tracing::trace!(host = %host, verdict = ?verdict, "Domain rejected");
                }
                verdict == DomainVerdict::Allowed
            })
            .collect();
        let after_domain = allowed.len();

        let mut seen_hashes = HashSet::new();
        let unique: Vec<CandidateArticle> = allowed
            .into_iter()
            .filter(|c| seen_hashes.insert(c.url_hash.clone()))
            .collect();
        let after_url = unique.len();

        let distinct = self.dedupe_titles(unique);
        let after_title = distinct.len();

        let mut ranked: Vec<(RankKey, CandidateArticle)> = distinct
            .into_iter()
            .map(|c| {
                let key = RankKey::new(
                    c.published,
                    source_priority(c.article.source_label()),
                    relevance.score(&c.article),
                );
                (key, c)
            })
            .collect();
        // Stable: equal keys keep input order
        ranked.sort_by(|a, b| a.0.cmp(&b.0));
        ranked.truncate(max_articles);

        tracing::debug!(
            input,
            after_domain,
            after_url,
            after_title,
            kept = ranked.len(),
            "Filtered articles"
        );

        ranked.into_iter().map(|(_, c)| c).collect()
    }

    /// Full pipeline over raw API results.
    pub fn filter_and_dedupe(
        &self,
        articles: Vec<NewsArticle>,
        max_articles: usize,
        relevance: &RelevanceTerms,
    ) -> Vec<CandidateArticle> {
        let candidates = self.prepare(articles);
        self.select(candidates, max_articles, relevance)
    }

    /// Drop articles whose headline is a near-duplicate of one already kept.
    /// Untitled articles are skipped entirely.
    fn dedupe_titles(&self, candidates: Vec<CandidateArticle>) -> Vec<CandidateArticle> {
        let mut kept_titles: Vec<String> = Vec::new();
        let mut kept = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let title = candidate.article.title_str().trim();
            if title.is_empty() {
                continue;
            }
            let normalized = normalize_title(title);
            let duplicate = kept_titles
                .iter()
                .any(|t| similarity_ratio(&normalized, t) >= self.similarity_threshold);
            if duplicate {
                tracing::trace!(title = %title, "Near-duplicate headline");
                continue;
            }
            kept_titles.push(normalized);
            kept.push(candidate);
        }

        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BLOCKED_NEWS_SOURCES, REPUTABLE_NEWS_SOURCES};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn article(link: &str, title: &str, date: Option<&str>, source: &str) -> NewsArticle {
        NewsArticle {
            link: Some(link.to_string()),
            title: Some(title.to_string()),
            pub_date: date.map(str::to_string),
            source_name: Some(source.to_string()),
            ..Default::default()
        }
    }

    fn filter() -> ArticleFilter {
        ArticleFilter::new(
            DomainPolicy::new(REPUTABLE_NEWS_SOURCES, BLOCKED_NEWS_SOURCES),
            0.92,
        )
    }

    fn titles(out: &[CandidateArticle]) -> Vec<&str> {
        out.iter().map(|c| c.article.title_str()).collect()
    }

    #[test]
    fn test_drops_articles_without_links() {
        let mut no_link = article("", "No link", None, "Reuters");
        no_link.link = None;
        let out = ArticleFilter::default().prepare(vec![
            no_link,
            article("javascript:alert(1)", "Bad scheme", None, "Reuters"),
            article("https://www.reuters.com/a", "Good", None, "Reuters"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].canonical_url, "https://www.reuters.com/a");
    }

    #[test]
    fn test_blocked_and_unlisted_domains_removed() {
        let out = filter().filter_and_dedupe(
            vec![
                article("https://finance.yahoo.com/x", "Yahoo piece", None, "Yahoo"),
                article("https://randomblog.example/x", "Blog piece", None, "Blog"),
                article("https://www.reuters.com/x", "Reuters piece", None, "Reuters"),
            ],
            10,
            &RelevanceTerms::default(),
        );
        assert_eq!(titles(&out), vec!["Reuters piece"]);
    }

    #[test]
    fn test_source_url_admits_syndicated_copy() {
        let mut syndicated = article("https://cdn.syndicator.example/x", "Wire copy", None, "Business Wire");
        syndicated.source_url = Some("https://www.businesswire.com".to_string());
        let out = filter().filter_and_dedupe(vec![syndicated], 10, &RelevanceTerms::default());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_url_dedupe_keeps_first() {
        let out = filter().filter_and_dedupe(
            vec![
                article("https://www.reuters.com/x?utm_source=a", "First copy", None, "Reuters"),
                article("https://www.reuters.com/x#section", "Second copy entirely different", None, "Reuters"),
            ],
            10,
            &RelevanceTerms::default(),
        );
        assert_eq!(titles(&out), vec!["First copy"]);
    }

    #[test]
    fn test_title_dedupe() {
        let out = filter().filter_and_dedupe(
            vec![
                article(
                    "https://www.reuters.com/a",
                    "Acme Corp announces partnership with Globex - Reuters",
                    Some("2024-01-15 10:00:00"),
                    "Reuters",
                ),
                article(
                    "https://www.bloomberg.com/b",
                    "BREAKING: Acme Corp Announces Partnership With Globex",
                    Some("2024-01-15 09:00:00"),
                    "Bloomberg",
                ),
                article(
                    "https://www.ft.com/c",
                    "Acme Corp names new chief financial officer",
                    Some("2024-01-14 09:00:00"),
                    "Financial Times",
                ),
                article("https://www.ft.com/d", "   ", None, "Financial Times"),
            ],
            10,
            &RelevanceTerms::default(),
        );
        assert_eq!(
            titles(&out),
            vec![
                "Acme Corp announces partnership with Globex - Reuters",
                "Acme Corp names new chief financial officer",
            ]
        );
    }

    #[test]
    fn test_ranking_order() {
        let terms = RelevanceTerms::new(["acme", "robotics"]);
        let out = filter().filter_and_dedupe(
            vec![
                article("https://www.ft.com/undated", "Undated Acme story", None, "Financial Times"),
                article("https://www.ft.com/old", "Older story", Some("2024-01-10 08:00:00"), "Financial Times"),
                article("https://www.cnbc.com/new", "Generic outlet news", Some("2024-01-15 08:00:00"), "CNBC"),
                article("https://www.reuters.com/new", "Reuters has it", Some("2024-01-15 08:00:00"), "Reuters"),
                article("https://www.cnbc.com/relevant", "Acme robotics update", Some("2024-01-15 08:00:00"), "CNBC"),
            ],
            10,
            &terms,
        );
        assert_eq!(
            titles(&out),
            vec![
                "Reuters has it",
                "Acme robotics update",
                "Generic outlet news",
                "Older story",
                "Undated Acme story",
            ]
        );
    }

    #[test]
    fn test_cap() {
        let articles: Vec<NewsArticle> = (0..20)
            .map(|i| {
                article(
                    &format!("https://www.reuters.com/story-{i}"),
                    &char::from(b'a' + i as u8).to_string().repeat(12),
                    Some(&format!("2024-01-{:02} 08:00:00", i + 1)),
                    "Reuters",
                )
            })
            .collect();
        let out = filter().filter_and_dedupe(articles, 5, &RelevanceTerms::default());
        assert_eq!(out.len(), 5);
        // Newest first: day 20 is story "t"
        assert_eq!(out[0].article.title_str(), "t".repeat(12));
    }

    #[test]
    fn test_empty_input() {
        assert!(filter()
            .filter_and_dedupe(Vec::new(), 10, &RelevanceTerms::default())
            .is_empty());
    }

    fn arb_article() -> impl Strategy<Value = NewsArticle> {
        (
            prop::sample::select(vec![
                "www.reuters.com",
                "uk.reuters.com",
                "www.ft.com",
                "finance.yahoo.com",
                "www.fool.com",
                "blog.example.net",
            ]),
            "[a-c]{1,2}",
            prop::option::of("(utm_source|ref|id)=[a-z]{1,2}"),
            prop::sample::select(vec![
                "Acme launches new product",
                "Acme launches new product - Reuters",
                "Acme quarterly results beat",
                "Globex acquires Initech",
                "",
            ]),
            prop::option::of(1u32..28),
        )
            .prop_map(|(host, path, query, title, day)| {
                let mut link = format!("https://{host}/{path}");
                if let Some(q) = query {
                    link.push('?');
                    link.push_str(&q);
                }
                NewsArticle {
                    link: Some(link),
                    title: Some(title.to_string()),
                    pub_date: day.map(|d| format!("2024-01-{d:02} 12:00:00")),
                    source_name: Some("Reuters".to_string()),
                    ..Default::default()
                }
            })
    }

    proptest! {
        #[test]
        fn output_respects_invariants(
            articles in prop::collection::vec(arb_article(), 0..25),
            max in 0usize..10,
        ) {
            let f = filter();
            let out = f.filter_and_dedupe(articles, max, &RelevanceTerms::default());

            prop_assert!(out.len() <= max);

            let hashes: HashSet<&str> = out.iter().map(|c| c.url_hash.as_str()).collect();
            prop_assert_eq!(hashes.len(), out.len());

            for c in &out {
                let host = c.host().unwrap_or_default();
                prop_assert!(!host.ends_with("yahoo.com") && !host.ends_with("fool.com"));
                prop_assert!(!c.canonical_url.contains("utm_source="));
                prop_assert!(!c.article.title_str().trim().is_empty());
            }

            for (i, a) in out.iter().enumerate() {
                for b in &out[i + 1..] {
                    prop_assert!(
                        title_similarity(a.article.title_str(), b.article.title_str())
                            < f.similarity_threshold()
                    );
                }
            }

            for pair in out.windows(2) {
                match (pair[0].published, pair[1].published) {
                    (Some(a), Some(b)) => prop_assert!(a >= b),
                    (None, Some(_)) => prop_assert!(false, "undated article ranked above dated"),
                    _ => {}
                }
            }
        }
    }
}
