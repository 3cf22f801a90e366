use std::fmt::Write;

use crate::filter::CandidateArticle;
use crate::util::truncate_chars;

/// Article descriptions longer than this are cut (with an ellipsis).
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// The sales-brief prompt for one account.
pub fn build_prompt(company: &str, articles: &[CandidateArticle]) -> String {
    let mut listing = String::new();
    for (idx, candidate) in articles.iter().enumerate() {
        let article = &candidate.article;
        let title = match article.title_str().trim() {
            "" => "No title",
            t => t,
        };
        // Writing to a String cannot fail
        let _ = writeln!(listing, "{}. **{}**", idx + 1, title);
        let _ = writeln!(
            listing,
            "   Source: {} | {}",
            article.source_label(),
            display_date(candidate)
        );
        let _ = writeln!(listing, "   URL: {}", candidate.canonical_url);

        if let Some(description) = article.description.as_deref().map(str::trim) {
            if !description.is_empty() {
                let _ = writeln!(
                    listing,
                    "   Summary: {}",
                    truncate_chars(description, MAX_DESCRIPTION_CHARS)
                );
            }
        }
        listing.push('\n');
    }

    format!(
        "You are generating a weekly sales intelligence brief for account executives. \
You will summarize recent news about {company} based on the articles below.

**Instructions:**
1. Group the information into these exact sections (only include sections that have content):
   - **Products/Launches**: New products, features, or services
   - **Customers/Partners**: New customers, partnerships, integrations, or case studies
   - **Exec & Hiring**: Leadership changes, key hires, organizational announcements
   - **Funding/M&A**: Funding rounds, acquisitions, or financial milestones
   - **Risks/Controversies**: Lawsuits, security incidents, outages, or negative press
   - **Regulatory**: Compliance updates, policy changes, or regulatory filings

2. For each section:
   - Write 1-3 concise bullets
   - Keep each bullet under 25 words
   - Include concrete numbers, dates, and names when available
   - Focus on what matters to an AE preparing for a call

3. End with a section called **Talk track:** containing 2 bullets that suggest conversation starters or angles for an AE

4. If there's no material news in a category, skip that section entirely

**Articles about {company}:**

{listing}
**Now generate the brief:**"
    )
}

/// `Jan 15, 2024`, the raw date prefix when unparseable, or `Date unknown`.
fn display_date(candidate: &CandidateArticle) -> String {
    if let Some(published) = candidate.published {
        return published.format("%b %d, %Y").to_string();
    }
    match candidate.article.pub_date.as_deref().map(str::trim) {
        None | Some("") => "Date unknown".to_string(),
        Some(raw) => raw.chars().take(10).collect(),
    }
}

/// Markdown bold (`**x**`) to Slack mrkdwn bold (`*x*`).
pub fn markdown_to_mrkdwn(text: &str) -> String {
    text.replace("**", "*")
}
