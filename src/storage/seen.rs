use std::collections::HashSet;

use anyhow::Result;

use super::schema::Database;
use super::types::SeenEntry;
use crate::filter::CandidateArticle;

impl Database {
    // ========================================================================
    // Seen URL Operations
    // ========================================================================

    /// Remember `articles` for `account` for `ttl_days`.
    ///
    /// Upserts in one transaction; an article seen again gets a fresh
    /// `seen_at`/`expires_at` and keeps its earlier `pub_date` when the new
    /// one is missing. Returns the number of rows written.
    pub async fn mark_as_seen(
        &self,
        account: &str,
        articles: &[CandidateArticle],
        ttl_days: i64,
    ) -> Result<u64> {
        if articles.is_empty() {
            return Ok(0);
        }
        let ttl_modifier = format!("{ttl_days:+} days");

        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for article in articles {
            let result = sqlx::query(
                r#"
                INSERT INTO seen_urls (account, url_hash, pub_date, seen_at, expires_at)
                VALUES (?, ?, ?, datetime('now'), datetime('now', ?))
                ON CONFLICT(account, url_hash) DO UPDATE SET
                    pub_date = COALESCE(excluded.pub_date, seen_urls.pub_date),
                    seen_at = excluded.seen_at,
                    expires_at = excluded.expires_at
            "#,
            )
            .bind(account)
            .bind(&article.url_hash)
            .bind(article.article.pub_date.as_deref())
            .bind(&ttl_modifier)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;

        tracing::debug!(account = %account, count = written, "Marked articles as seen");
        Ok(written)
    }

    /// Unexpired URL hashes remembered for `account`.
    pub async fn seen_hashes(&self, account: &str) -> Result<HashSet<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT url_hash FROM seen_urls
            WHERE account = ? AND expires_at > datetime('now')
        "#,
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(hash,)| hash).collect())
    }

    /// Drop candidates already reported for `account`.
    pub async fn filter_unseen(
        &self,
        account: &str,
        candidates: Vec<CandidateArticle>,
    ) -> Result<Vec<CandidateArticle>> {
        let seen = self.seen_hashes(account).await?;
        if seen.is_empty() {
            return Ok(candidates);
        }

        let before = candidates.len();
        let unseen: Vec<CandidateArticle> = candidates
            .into_iter()
            .filter(|c| !seen.contains(&c.url_hash))
            .collect();
        tracing::info!(
            account = %account,
            skipped = before - unseen.len(),
            remaining = unseen.len(),
            "Skipped previously reported articles"
        );
        Ok(unseen)
    }

    /// Delete expired entries. Returns the number removed.
    pub async fn evict_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM seen_urls WHERE expires_at <= datetime('now')")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Forget everything. Returns the number removed.
    pub async fn clear_seen(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM seen_urls")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// All entries for an account, expired or not, oldest first.
    pub async fn seen_entries(&self, account: &str) -> Result<Vec<SeenEntry>> {
        let entries = sqlx::query_as::<_, SeenEntry>(
            r#"
            SELECT account, url_hash, pub_date, seen_at, expires_at
            FROM seen_urls
            WHERE account = ?
            ORDER BY seen_at, url_hash
        "#,
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
