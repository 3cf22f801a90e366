use crate::accounts::AccountConfig;
use crate::news::types::{NewsArticle, NewsPage};
use crate::news::window::DateWindow;
use crate::util::validate_base_url;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 3;
const MAX_PAGES: usize = 5;
const PAGE_DELAY: Duration = Duration::from_millis(200);
/// Keywords beyond this are dropped to keep the press-wire query short.
const MAX_QUERY_KEYWORDS: usize = 6;

/// Wire services searched by the press-wire strategy.
pub const PRESS_WIRE_DOMAINS: &[&str] = &[
    "businesswire.com",
    "prnewswire.com",
    "globenewswire.com",
    "reuters.com",
    "bloomberg.com",
];

/// Excluded server-side by the press-wire strategy.
pub const PRESS_WIRE_EXCLUDED: &[&str] = &[
    "seekingalpha.com",
    "fool.com",
    "benzinga.com",
    "stocktwits.com",
    "finance.yahoo.com",
];

/// Errors from the news API.
#[derive(Debug, Error)]
pub enum NewsError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out")]
    Timeout,
    /// Body was not the expected JSON envelope
    #[error("Malformed response: {0}")]
    Malformed(String),
    /// API answered with `status != "success"`
    #[error("News API error: {0}")]
    Api(String),
    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] crate::util::UrlValidationError),
    #[error("All query strategies failed for {company}: {last}")]
    AllStrategiesFailed { company: String, last: Box<NewsError> },
}

impl NewsError {
    /// Rate limiting, server errors and transport failures are worth retrying.
    fn is_retryable(&self) -> bool {
        match self {
            NewsError::Timeout | NewsError::Network(_) => true,
            NewsError::HttpStatus(status) => *status == 429 || *status >= 500,
            NewsError::Malformed(_)
            | NewsError::Api(_)
            | NewsError::BaseUrl(_)
            | NewsError::AllStrategiesFailed { .. } => false,
        }
    }
}

/// The three complementary searches run for every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStrategy {
    /// The quoted company name anywhere in top-priority sources.
    DirectMentions,
    /// Anything published on the company's own website or newsroom.
    OfficialPress,
    /// Keyword + company matches on the major press wires.
    PressWires,
}

impl QueryStrategy {
    pub const ALL: [QueryStrategy; 3] = [
        QueryStrategy::DirectMentions,
        QueryStrategy::OfficialPress,
        QueryStrategy::PressWires,
    ];

    pub fn name(self) -> &'static str {
        match self {
            QueryStrategy::DirectMentions => "direct_mentions",
            QueryStrategy::OfficialPress => "official_press",
            QueryStrategy::PressWires => "press_wires",
        }
    }

    /// Query parameters for this strategy, or `None` when it does not apply
    /// (official press without a website or newsroom).
    pub fn params(self, account: &AccountConfig, window: &DateWindow) -> Option<Vec<(String, String)>> {
        let company = quote(&account.company);
        let mut params: Vec<(String, String)> = Vec::new();

        match self {
            QueryStrategy::DirectMentions => {
                params.push(("q".into(), company));
                params.push(("prioritydomain".into(), "top".into()));
            }
            QueryStrategy::OfficialPress => {
                let mut domains: Vec<String> = Vec::new();
                if !account.website.is_empty() {
                    domains.push(account.website.clone());
                }
                if let Some(host) = account.newsroom_host() {
                    domains.push(host);
                }
                if domains.is_empty() {
                    return None;
                }
                params.push(("domainurl".into(), domains.join(",")));
            }
            QueryStrategy::PressWires => {
                let keywords: Vec<&str> = account
                    .keywords
                    .iter()
                    .take(MAX_QUERY_KEYWORDS)
                    .map(String::as_str)
                    .collect();
                let q = if keywords.is_empty() {
                    company
                } else {
                    format!("({}) AND {}", keywords.join(" OR "), company)
                };
                params.push(("q".into(), q));
                params.push(("domainurl".into(), PRESS_WIRE_DOMAINS.join(",")));
                params.push(("excludedomain".into(), PRESS_WIRE_EXCLUDED.join(",")));
            }
        }

        params.push(("language".into(), "en".into()));
        params.push(("from_date".into(), window.from_date.clone()));
        params.push(("to_date".into(), window.to_date.clone()));
        Some(params)
    }
}

fn quote(company: &str) -> String {
    format!("\"{}\"", company.replace('"', ""))
}

/// Newsdata.io client.
///
/// The API key travels as a query parameter, so request URLs are never
/// logged; only the strategy and page counters are.
#[derive(Clone)]
pub struct NewsdataClient {
    http: reqwest::Client,
    api_key: SecretString,
    endpoint: Url,
    retry_base_delay: Duration,
    page_delay: Duration,
}

impl std::fmt::Debug for NewsdataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsdataClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl NewsdataClient {
    pub fn new(
        http: reqwest::Client,
        api_key: SecretString,
        base_url: &str,
    ) -> Result<Self, NewsError> {
        let base = validate_base_url(base_url)?;
        let endpoint = base
            .join("/api/1/news")
            .map_err(|e| NewsError::Malformed(format!("base URL: {e}")))?;
        Ok(Self {
            http,
            api_key,
            endpoint,
            retry_base_delay: Duration::from_secs(1),
            page_delay: PAGE_DELAY,
        })
    }

    /// Shrink the retry and pagination pauses (tests).
    pub fn with_delays(mut self, retry_base_delay: Duration, page_delay: Duration) -> Self {
        self.retry_base_delay = retry_base_delay;
        self.page_delay = page_delay;
        self
    }

    /// Run all applicable strategies for one account concurrently.
    ///
    /// Results are concatenated in strategy order. A strategy that fails is
    /// logged and skipped; only when every attempted strategy fails is the
    /// account reported as an error.
    pub async fn fetch_articles_for_account(
        &self,
        account: &AccountConfig,
        window: &DateWindow,
        max_articles: usize,
    ) -> Result<Vec<NewsArticle>, NewsError> {
        let per_strategy = max_articles / 3 + 1;

        let [direct, official, wires] = QueryStrategy::ALL;
        let (direct, official, wires) = futures::join!(
            self.run_strategy(direct, account, window, per_strategy),
            self.run_strategy(official, account, window, per_strategy),
            self.run_strategy(wires, account, window, per_strategy),
        );

        let mut articles = Vec::new();
        let mut attempted = 0usize;
        let mut failed = 0usize;
        let mut last_error = None;

        for (strategy, outcome) in [
            (QueryStrategy::DirectMentions, direct),
            (QueryStrategy::OfficialPress, official),
            (QueryStrategy::PressWires, wires),
        ] {
            match outcome {
                None => {}
                Some(Ok(found)) => {
                    attempted += 1;
                    tracing::info!(
                        company = %account.company,
                        strategy = strategy.name(),
                        count = found.len(),
                        "Fetched articles"
                    );
                    articles.extend(found);
                }
                Some(Err(e)) => {
                    attempted += 1;
                    failed += 1;
                    tracing::warn!(
                        company = %account.company,
                        strategy = strategy.name(),
                        error = %e,
                        "Query strategy failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) if failed == attempted => Err(NewsError::AllStrategiesFailed {
                company: account.company.clone(),
                last: Box::new(last),
            }),
            _ => Ok(articles),
        }
    }

    async fn run_strategy(
        &self,
        strategy: QueryStrategy,
        account: &AccountConfig,
        window: &DateWindow,
        max_results: usize,
    ) -> Option<Result<Vec<NewsArticle>, NewsError>> {
        let params = strategy.params(account, window)?;
        Some(self.paginated_fetch(params, max_results).await)
    }

    /// Follow `nextPage` tokens until `max_results`, the page cap, or the end.
    ///
    /// A failure on the first page is an error; a failure on a later page
    /// ends pagination and keeps what was collected.
    pub async fn paginated_fetch(
        &self,
        params: Vec<(String, String)>,
        max_results: usize,
    ) -> Result<Vec<NewsArticle>, NewsError> {
        let mut articles: Vec<NewsArticle> = Vec::new();
        let mut next_page: Option<String> = None;

        for page in 0..MAX_PAGES {
            if articles.len() >= max_results {
                break;
            }
            if page > 0 {
                tokio::time::sleep(self.page_delay).await;
            }

            let result = self.fetch_with_retry(&params, next_page.as_deref()).await;
            let page_data = match result {
                Ok(p) => p,
                Err(e) if page == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!(page = page, error = %e, "Pagination stopped early");
                    break;
                }
            };

            articles.extend(page_data.results);
            match page_data.next_page {
                Some(token) if !token.is_empty() => next_page = Some(token),
                _ => break,
            }
        }

        articles.truncate(max_results);
        Ok(articles)
    }

    /// One page with bounded retry: `2^attempt` × base delay between attempts.
    async fn fetch_with_retry(
        &self,
        params: &[(String, String)],
        page: Option<&str>,
    ) -> Result<ParsedPage, NewsError> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_page(params, page).await {
                Ok(parsed) => return Ok(parsed),
                Err(e) if e.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                    let delay = self.retry_base_delay * (1u32 << attempt);
                    tracing::debug!(
                        error = %e,
                        retry = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying news request after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_page(
        &self,
        params: &[(String, String)],
        page: Option<&str>,
    ) -> Result<ParsedPage, NewsError> {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("apikey", self.api_key.expose_secret());
            for (key, value) in params {
                query.append_pair(key, value);
            }
            if let Some(token) = page {
                query.append_pair("page", token);
            }
        }

        let response = tokio::time::timeout(REQUEST_TIMEOUT, self.http.get(url).send())
            .await
            .map_err(|_| NewsError::Timeout)?
            .map_err(|e| NewsError::Network(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewsError::HttpStatus(status.as_u16()));
        }

        let body: NewsPage = response
            .json()
            .await
            .map_err(|e| NewsError::Malformed(e.without_url().to_string()))?;
        ParsedPage::try_from(body)
    }
}

/// A successful page with typed results.
struct ParsedPage {
    results: Vec<NewsArticle>,
    next_page: Option<String>,
}

impl TryFrom<NewsPage> for ParsedPage {
    type Error = NewsError;

    fn try_from(page: NewsPage) -> Result<Self, Self::Error> {
        if page.status != "success" {
            let message = page
                .results
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or(&page.status)
                .to_string();
            return Err(NewsError::Api(message));
        }
        let results = match page.results {
            serde_json::Value::Null => Vec::new(),
            value => serde_json::from_value(value)
                .map_err(|e| NewsError::Malformed(e.to_string()))?,
        };
        Ok(Self {
            results,
            next_page: page.next_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn account() -> AccountConfig {
        AccountConfig {
            company: "Acme Corp".to_string(),
            website: "acme.com".to_string(),
            keywords: vec!["robotics".to_string(), "automation".to_string()],
            newsroom: Some("https://news.acme.com/press".to_string()),
        }
    }

    fn window() -> DateWindow {
        DateWindow {
            from_date: "2024-01-08".to_string(),
            to_date: "2024-01-15".to_string(),
        }
    }

    fn client(server: &MockServer) -> NewsdataClient {
        NewsdataClient::new(
            reqwest::Client::new(),
            SecretString::from("test-key".to_string()),
            &server.uri(),
        )
        .unwrap()
        .with_delays(Duration::from_millis(1), Duration::from_millis(1))
    }

    fn page(links: &[&str], next: Option<&str>) -> serde_json::Value {
        let results: Vec<_> = links
            .iter()
            .map(|l| json!({"title": format!("Title {l}"), "link": l}))
            .collect();
        json!({"status": "success", "totalResults": results.len(), "results": results, "nextPage": next})
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_direct_mentions_params() {
        let params = QueryStrategy::DirectMentions
            .params(&account(), &window())
            .unwrap();
        assert_eq!(param(&params, "q"), Some("\"Acme Corp\""));
        assert_eq!(param(&params, "prioritydomain"), Some("top"));
        assert_eq!(param(&params, "language"), Some("en"));
        assert_eq!(param(&params, "from_date"), Some("2024-01-08"));
    }

    #[test]
    fn test_official_press_params() {
        let params = QueryStrategy::OfficialPress
            .params(&account(), &window())
            .unwrap();
        assert_eq!(param(&params, "domainurl"), Some("acme.com,news.acme.com"));
    }

    #[test]
    fn test_official_press_skipped_without_domains() {
        let mut account = account();
        account.website.clear();
        account.newsroom = None;
        assert!(QueryStrategy::OfficialPress.params(&account, &window()).is_none());
    }

    #[test]
    fn test_press_wire_params() {
        let mut account = account();
        account.keywords = (1..=8).map(|i| format!("k{i}")).collect();
        let params = QueryStrategy::PressWires.params(&account, &window()).unwrap();
        assert_eq!(
            param(&params, "q"),
            Some("(k1 OR k2 OR k3 OR k4 OR k5 OR k6) AND \"Acme Corp\"")
        );
        assert!(param(&params, "domainurl").unwrap().contains("businesswire.com"));
        assert!(param(&params, "excludedomain").unwrap().contains("fool.com"));
    }

    #[test]
    fn test_press_wire_without_keywords() {
        let mut account = account();
        account.keywords.clear();
        let params = QueryStrategy::PressWires.params(&account, &window()).unwrap();
        assert_eq!(param(&params, "q"), Some("\"Acme Corp\""));
    }

    #[tokio::test]
    async fn test_pagination_follows_next_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1/news"))
            .and(query_param("page", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["https://b.com/2"], None)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/1/news"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page(&["https://a.com/1"], Some("p2"))),
            )
            .mount(&server)
            .await;

        let articles = client(&server)
            .paginated_fetch(vec![("q".into(), "x".into())], 10)
            .await
            .unwrap();
        let links: Vec<_> = articles.iter().filter_map(|a| a.link.as_deref()).collect();
        assert_eq!(links, vec!["https://a.com/1", "https://b.com/2"]);
    }

    #[tokio::test]
    async fn test_pagination_stops_at_max_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(
                &["https://a.com/1", "https://a.com/2", "https://a.com/3"],
                Some("more"),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let articles = client(&server)
            .paginated_fetch(vec![("q".into(), "x".into())], 2)
            .await
            .unwrap();
        assert_eq!(articles.len(), 2);
    }

    #[tokio::test]
    async fn test_pagination_capped_at_five_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page(&["https://a.com/1"], Some("again"))),
            )
            .expect(5)
            .mount(&server)
            .await;

        let articles = client(&server)
            .paginated_fetch(vec![("q".into(), "x".into())], 100)
            .await
            .unwrap();
        assert_eq!(articles.len(), 5);
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["https://a.com/1"], None)))
            .mount(&server)
            .await;

        let articles = client(&server)
            .paginated_fetch(vec![("q".into(), "x".into())], 10)
            .await
            .unwrap();
        assert_eq!(articles.len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let result = client(&server)
            .paginated_fetch(vec![("q".into(), "x".into())], 10)
            .await;
        assert!(matches!(result, Err(NewsError::HttpStatus(429))));
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .paginated_fetch(vec![("q".into(), "x".into())], 10)
            .await;
        assert!(matches!(result, Err(NewsError::HttpStatus(401))));
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "results": {"message": "API key invalid", "code": "Unauthorized"}
            })))
            .mount(&server)
            .await;

        let result = client(&server)
            .paginated_fetch(vec![("q".into(), "x".into())], 10)
            .await;
        match result {
            Err(NewsError::Api(msg)) => assert_eq!(msg, "API key invalid"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_later_page_failure_keeps_collected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("page", "p2"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page(&["https://a.com/1"], Some("p2"))),
            )
            .mount(&server)
            .await;

        let articles = client(&server)
            .paginated_fetch(vec![("q".into(), "x".into())], 10)
            .await
            .unwrap();
        assert_eq!(articles.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_for_account_runs_all_strategies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("prioritydomain", "top"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["https://direct.com/1"], None)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("domainurl", "acme.com,news.acme.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["https://acme.com/pr"], None)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("excludedomain", PRESS_WIRE_EXCLUDED.join(",")))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["https://businesswire.com/x"], None)))
            .mount(&server)
            .await;

        let articles = client(&server)
            .fetch_articles_for_account(&account(), &window(), 36)
            .await
            .unwrap();
        let links: Vec<_> = articles.iter().filter_map(|a| a.link.as_deref()).collect();
        assert_eq!(
            links,
            vec!["https://direct.com/1", "https://acme.com/pr", "https://businesswire.com/x"]
        );
    }

    #[tokio::test]
    async fn test_fetch_for_account_partial_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("prioritydomain", "top"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["https://direct.com/1"], None)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let articles = client(&server)
            .fetch_articles_for_account(&account(), &window(), 12)
            .await
            .unwrap();
        assert_eq!(articles.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_for_account_total_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = client(&server)
            .fetch_articles_for_account(&account(), &window(), 12)
            .await;
        assert!(matches!(result, Err(NewsError::AllStrategiesFailed { .. })));
    }

    #[tokio::test]
    async fn test_api_key_sent_as_query_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&[], None)))
            .expect(1)
            .mount(&server)
            .await;

        let articles = client(&server)
            .paginated_fetch(vec![("q".into(), "x".into())], 10)
            .await
            .unwrap();
        assert!(articles.is_empty());
    }

    #[test]
    fn test_insecure_base_url_rejected() {
        let result = NewsdataClient::new(
            reqwest::Client::new(),
            SecretString::from("k".to_string()),
            "http://newsdata.example.com",
        );
        assert!(matches!(result, Err(NewsError::BaseUrl(_))));
    }
}
