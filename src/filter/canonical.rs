use crate::util::validate_url;
use sha2::{Digest, Sha256};

/// Query parameters that only track the click, never select content.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "ref",
    "source",
    "campaign",
    "_ga",
    "_gl",
    "mc_cid",
    "mc_eid",
];

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS
        .iter()
        .any(|p| p.eq_ignore_ascii_case(key))
}

/// Canonical form of an article link, used as its identity.
///
/// - the fragment is dropped
/// - tracking parameters are dropped (case-insensitive key match)
/// - the remaining parameters keep their order and are re-encoded
/// - an empty query loses its `?`
///
/// Returns `None` for links that fail [`validate_url`]. The result is a
/// fixed point: canonicalizing it again yields the same string.
pub fn canonicalize_url(link: &str) -> Option<String> {
    let mut url = validate_url(link).ok()?;
    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !is_tracking_param(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Some(url.into())
}

/// Lowercase hex SHA-256 of a canonical URL.
pub fn hash_url(canonical: &str) -> String {
    let hash = Sha256::digest(canonical.as_bytes());
    format!("{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_tracking_and_fragment() {
        assert_eq!(
            canonicalize_url(
                "https://www.reuters.com/tech/acme?utm_source=x&id=42&UTM_Medium=y#comments"
            )
            .as_deref(),
            Some("https://www.reuters.com/tech/acme?id=42")
        );
    }

    #[test]
    fn test_empty_query_dropped() {
        assert_eq!(
            canonicalize_url("https://example.com/a?utm_campaign=spring&fbclid=abc").as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(
            canonicalize_url("https://example.com/a?").as_deref(),
            Some("https://example.com/a")
        );
    }

    #[test]
    fn test_param_order_preserved() {
        assert_eq!(
            canonicalize_url("https://example.com/s?z=1&ref=tw&a=2").as_deref(),
            Some("https://example.com/s?z=1&a=2")
        );
    }

    #[test]
    fn test_no_query_untouched() {
        assert_eq!(
            canonicalize_url("https://example.com/path/article.html").as_deref(),
            Some("https://example.com/path/article.html")
        );
    }

    #[test]
    fn test_invalid_links_rejected() {
        assert_eq!(canonicalize_url(""), None);
        assert_eq!(canonicalize_url("not a url"), None);
        assert_eq!(canonicalize_url("ftp://example.com/file"), None);
        assert_eq!(canonicalize_url("http://10.0.0.1/internal"), None);
    }

    #[test]
    fn test_same_article_same_hash() {
        let a = canonicalize_url("https://example.com/a?utm_source=newsletter").unwrap();
        let b = canonicalize_url("https://example.com/a#top").unwrap();
        assert_eq!(hash_url(&a), hash_url(&b));
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = hash_url("https://example.com/a");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    proptest! {
        #[test]
        fn canonical_is_idempotent(
            path in "[a-z0-9/]{0,20}",
            keys in proptest::collection::vec("(utm_source|ref|id|page|q|gclid|x)", 0..5),
            values in proptest::collection::vec("[a-zA-Z0-9 %&]{0,6}", 5),
            fragment in proptest::option::of("[a-z]{1,5}"),
        ) {
            let query: Vec<String> = keys
                .iter()
                .zip(values.iter())
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            let mut link = format!("https://example.com/{path}");
            if !query.is_empty() {
                link.push('?');
                link.push_str(&query.join("&"));
            }
            if let Some(f) = fragment {
                link.push('#');
                link.push_str(&f);
            }

            let once = canonicalize_url(&link).unwrap();
            let twice = canonicalize_url(&once).unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert!(!once.contains('#'));
            prop_assert!(!once.contains("utm_source="));
            prop_assert!(!once.contains("gclid="));
        }
    }
}
