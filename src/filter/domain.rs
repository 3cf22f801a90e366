use url::Url;

/// Allow/block lists applied to article hosts.
///
/// Matching is on whole DNS labels: `reuters.com` matches `reuters.com` and
/// `uk.reuters.com`, but `ft.com` does not match `microsoft.com`.
#[derive(Debug, Clone, Default)]
pub struct DomainPolicy {
    allowed: Vec<String>,
    blocked: Vec<String>,
}

/// Why an article was rejected by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainVerdict {
    Allowed,
    Blocked,
    NotAllowlisted,
}

impl DomainPolicy {
    pub fn new<A, B>(allowed: A, blocked: B) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        Self {
            allowed: normalize_list(allowed),
            blocked: normalize_list(blocked),
        }
    }

    /// Judge an article by its link host and, failing the allowlist, by the
    /// host of its publisher's `source_url`.
    ///
    /// The blocklist is checked first and only against the link itself.
    /// An empty allowlist admits every host that is not blocked.
    pub fn verdict(&self, link_host: &str, source_url: Option<&str>) -> DomainVerdict {
        let host = normalize_host(link_host);

        if self.blocked.iter().any(|d| host_matches(&host, d)) {
            return DomainVerdict::Blocked;
        }
        if self.allowed.is_empty() || self.allowed.iter().any(|d| host_matches(&host, d)) {
            return DomainVerdict::Allowed;
        }

        let source_host = source_url.and_then(|s| {
            // Publishers sometimes report a bare host here
            Url::parse(s)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .or_else(|| Url::parse(&format!("https://{}", s.trim())).ok()?.host_str().map(str::to_string))
        });
        if let Some(source_host) = source_host {
            let source_host = normalize_host(&source_host);
            if self.allowed.iter().any(|d| host_matches(&source_host, d)) {
                return DomainVerdict::Allowed;
            }
        }

        DomainVerdict::NotAllowlisted
    }

    pub fn is_allowed(&self, link_host: &str, source_url: Option<&str>) -> bool {
        self.verdict(link_host, source_url) == DomainVerdict::Allowed
    }
}

fn normalize_list<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    items
        .into_iter()
        .map(|d| normalize_host(d.as_ref()))
        .filter(|d| !d.is_empty())
        .collect()
}

/// Lowercase, trim dots and drop a leading `www.`.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_matches('.').to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

/// `host` equals `domain` or is a subdomain of it.
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> DomainPolicy {
        DomainPolicy::new(
            ["reuters.com", "ft.com", "businesswire.com"],
            ["finance.yahoo.com", "fool.com"],
        )
    }

    #[test]
    fn test_allowlisted_host() {
        assert_eq!(policy().verdict("www.reuters.com", None), DomainVerdict::Allowed);
        assert_eq!(policy().verdict("uk.reuters.com", None), DomainVerdict::Allowed);
        assert_eq!(policy().verdict("FT.COM", None), DomainVerdict::Allowed);
    }

    #[test]
    fn test_label_boundary() {
        assert_eq!(
            policy().verdict("microsoft.com", None),
            DomainVerdict::NotAllowlisted
        );
        assert_eq!(
            policy().verdict("notreuters.com", None),
            DomainVerdict::NotAllowlisted
        );
    }

    #[test]
    fn test_blocklist_wins() {
        let policy = DomainPolicy::new(["yahoo.com"], ["finance.yahoo.com"]);
        assert_eq!(policy.verdict("finance.yahoo.com", None), DomainVerdict::Blocked);
        assert_eq!(policy.verdict("news.yahoo.com", None), DomainVerdict::Allowed);
    }

    #[test]
    fn test_blocked_even_with_allowed_source() {
        assert_eq!(
            policy().verdict("www.fool.com", Some("https://www.reuters.com")),
            DomainVerdict::Blocked
        );
    }

    #[test]
    fn test_source_url_fallback() {
        assert!(policy().is_allowed("syndication.example.net", Some("https://www.businesswire.com")));
        assert!(policy().is_allowed("syndication.example.net", Some("businesswire.com")));
        assert!(!policy().is_allowed("syndication.example.net", Some("https://blog.example.org")));
        assert!(!policy().is_allowed("syndication.example.net", None));
    }

    #[test]
    fn test_empty_allowlist_allows_unblocked() {
        let policy = DomainPolicy::new(Vec::<String>::new(), ["fool.com"]);
        assert!(policy.is_allowed("anything.example", None));
        assert!(!policy.is_allowed("fool.com", None));
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("WWW.Reuters.com."), "reuters.com");
        assert_eq!(normalize_host("www2.reuters.com"), "www2.reuters.com");
    }
}
