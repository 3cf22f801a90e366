//! Near-duplicate headline detection.
//!
//! Syndicated stories reach the news API through several outlets with the
//! same headline, give or take a prefix or a trailing outlet name. Titles
//! are normalized and then compared with the Ratcliff/Obershelp ratio
//! `2·M / (|a| + |b|)`, where `M` is the number of characters in the
//! recursively found longest common blocks.

/// Prefixes that outlets bolt onto otherwise identical headlines.
const NOISE_PREFIXES: &[&str] = &["breaking:", "exclusive:", "update:"];

/// Separators that introduce an outlet name at the end of a headline.
const SOURCE_SEPARATORS: &[&str] = &[" - ", " | ", " – ", " — "];

/// Lowercase, collapse whitespace, drop noise prefixes and a trailing
/// ` - Outlet Name` suffix.
pub fn normalize_title(title: &str) -> String {
    let mut normalized = crate::util::collapse_whitespace(&title.to_lowercase());

    for prefix in NOISE_PREFIXES {
        if let Some(rest) = normalized.strip_prefix(prefix) {
            normalized = rest.trim_start().to_string();
        }
    }

    let cut = SOURCE_SEPARATORS
        .iter()
        .filter_map(|sep| normalized.rfind(sep))
        .max();
    if let Some(idx) = cut {
        // Never strip the whole headline down to nothing
        if idx > 0 {
            normalized.truncate(idx);
        }
    }

    normalized.trim().to_string()
}

/// Similarity of two already-normalized titles in `[0, 1]`.
///
/// Two empty strings are identical (1.0).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Normalize both titles and compare them.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    similarity_ratio(&normalize_title(a), &normalize_title(b))
}

/// Total length of the matching blocks found by recursively taking the
/// longest common substring and recursing on both sides of it.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, a_lo, a_hi, b_lo, b_hi);
        if size == 0 {
            continue;
        }
        total += size;
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + size < a_hi && j + size < b_hi {
            pending.push((i + size, a_hi, j + size, b_hi));
        }
    }

    total
}

/// Longest common substring of `a[a_lo..a_hi]` and `b[b_lo..b_hi]`.
///
/// Ties go to the earliest start in `a`, then the earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let width = b_hi - b_lo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];
    let (mut best_i, mut best_j, mut best_size) = (a_lo, b_lo, 0);

    for i in a_lo..a_hi {
        for j in b_lo..b_hi {
            let col = j - b_lo + 1;
            if a[i] == b[j] {
                let run = prev[col - 1] + 1;
                curr[col] = run;
                if run > best_size {
                    best_size = run;
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                }
            } else {
                curr[col] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_size)
}
