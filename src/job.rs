//! The weekly run: fetch, filter, summarize and post every account.
//!
//! Accounts are processed one after another; inside an account the three
//! news queries fan out concurrently. A failing account is logged and
//! recorded in [`RunStats::errors`] and the run carries on.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::{load_accounts, AccountConfig};
use crate::archive::{ArchivedBrief, BriefArchive};
use crate::config::Config;
use crate::filter::{ArticleFilter, DomainPolicy, RelevanceTerms};
use crate::news::{iso_week_key, DateWindow, NewsdataClient};
use crate::slack::{PostOutcome, SlackClient};
use crate::storage::Database;
use crate::summarize::{AccountBrief, Summarizer};

/// Raw results requested per account, as a multiple of what is kept.
const FETCH_MULTIPLIER: usize = 3;

// ============================================================================
// Types
// ============================================================================

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub accounts_processed: usize,
    pub total_articles_fetched: usize,
    pub total_articles_kept: usize,
    pub total_tokens_used: u64,
    pub errors: Vec<String>,
}

impl RunStats {
    fn record(&mut self, brief: &AccountBrief) {
        self.accounts_processed += 1;
        self.total_articles_fetched += brief.articles_fetched;
        self.total_articles_kept += brief.article_count;
        self.total_tokens_used += brief.tokens_used;
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Build and log the brief without posting, marking seen or archiving.
    pub dry_run: bool,
    /// Only process these companies (case-insensitive). Empty means all.
    pub only_accounts: Vec<String>,
}

impl RunOptions {
    fn selects(&self, account: &AccountConfig) -> bool {
        self.only_accounts.is_empty()
            || self
                .only_accounts
                .iter()
                .any(|name| name.trim().eq_ignore_ascii_case(account.company.trim()))
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_key: String,
    pub dry_run: bool,
    pub accounts_total: usize,
    pub stats: RunStats,
    pub post: PostOutcome,
    #[serde(skip)]
    pub briefs: Vec<AccountBrief>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<PathBuf>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.post.success
    }
}

/// Everything a run needs, built once from the configuration.
#[derive(Debug)]
pub struct JobContext {
    pub config: Config,
    pub news: NewsdataClient,
    pub summarizer: Summarizer,
    /// Absent only for dry runs without a Slack token.
    pub slack: Option<SlackClient>,
    pub filter: ArticleFilter,
    pub db: Option<Database>,
    pub archive: Option<BriefArchive>,
}

impl JobContext {
    /// Build the clients and optional stores described by `config`.
    ///
    /// The Slack token and channel are only required when posting.
    pub async fn from_config(config: Config, http: reqwest::Client, dry_run: bool) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let news = NewsdataClient::new(
            http.clone(),
            config.news_api_key()?,
            &config.endpoints.newsdata,
        )
        .context("Failed to create news client")?;

        let summarizer = Summarizer::new(
            http.clone(),
            config.anthropic_api_key()?,
            config.anthropic_model.clone(),
            &config.endpoints.anthropic,
        )
        .context("Failed to create summarizer")?
        .with_days_lookback(config.days_lookback);

        let slack = match config.slack_bot_token() {
            Ok(token) => Some(
                SlackClient::new(http, token, &config.endpoints.slack)
                    .context("Failed to create Slack client")?,
            ),
            Err(e) if dry_run => {
                tracing::debug!(error = %e, "No Slack token; dry run only");
                None
            }
            Err(e) => return Err(e.into()),
        };
        if !dry_run && config.slack_channel_id.trim().is_empty() {
            anyhow::bail!("slack_channel_id is not set (config file or SLACK_CHANNEL_ID)");
        }

        let filter = ArticleFilter::new(
            DomainPolicy::new(&config.allowed_domains, &config.blocked_domains),
            config.title_similarity_threshold,
        );

        let db = if config.persistence.enabled {
            let path = config.persistence.database_path.to_string_lossy().into_owned();
            let db = Database::open(&path)
                .await
                .with_context(|| format!("Failed to open seen-URL database '{path}'"))?;
            tracing::info!(path = %path, "Using seen-URL persistence");
            Some(db)
        } else {
            None
        };

        let archive = config.archive.enabled.then(|| {
            tracing::info!(dir = %config.archive.directory.display(), "Archiving briefs");
            BriefArchive::new(&config.archive.directory)
        });

        Ok(Self {
            config,
            news,
            summarizer,
            slack,
            filter,
            db,
            archive,
        })
    }
}

// ============================================================================
// Run
// ============================================================================

/// Run the weekly job now.
pub async fn run(ctx: &JobContext, options: &RunOptions) -> Result<RunReport> {
    run_at(ctx, options, Utc::now()).await
}

/// Run the weekly job as if the clock read `now`.
pub async fn run_at(
    ctx: &JobContext,
    options: &RunOptions,
    now: DateTime<Utc>,
) -> Result<RunReport> {
    let config = &ctx.config;
    let tz = config.tz()?;
    let run_key = iso_week_key(now, tz);
    let window = DateWindow::ending_at(now, tz, config.days_lookback);
    tracing::info!(
        run_key = %run_key,
        dry_run = options.dry_run,
        from = %window.from_date,
        to = %window.to_date,
        "Starting weekly brief"
    );

    let accounts: Vec<AccountConfig> = load_accounts(&config.accounts_file)
        .with_context(|| {
            format!(
                "Failed to load accounts from '{}'",
                config.accounts_file.display()
            )
        })?
        .into_iter()
        .filter(|a| options.selects(a))
        .collect();
    tracing::info!(count = accounts.len(), "Selected accounts");

    if let Some(db) = &ctx.db {
        match db.evict_expired().await {
            Ok(0) => {}
            Ok(evicted) => tracing::info!(evicted, "Evicted expired seen URLs"),
            Err(e) => tracing::warn!(error = %e, "Failed to evict expired seen URLs"),
        }
    }

    let mut stats = RunStats::default();
    let mut briefs = Vec::with_capacity(accounts.len());

    for account in &accounts {
        match process_account(ctx, account, &window, options.dry_run).await {
            Ok(brief) => {
                stats.record(&brief);
                briefs.push(brief);
            }
            Err(e) => {
                tracing::error!(company = %account.company, error = %format!("{e:#}"), "Account failed");
                stats
                    .errors
                    .push(format!("Error processing {}: {e:#}", account.company));
            }
        }
    }

    let post = match &ctx.slack {
        Some(slack) => {
            slack
                .post_weekly_brief(
                    &config.slack_channel_id,
                    &briefs,
                    options.dry_run,
                    Some(run_key.as_str()),
                )
                .await
        }
        None if options.dry_run => dry_run_outcome(&briefs),
        None => PostOutcome::failure("Slack client not configured"),
    };

    let archived = match &ctx.archive {
        Some(archive) if !options.dry_run && post.success => {
            let record = ArchivedBrief {
                run_key: run_key.clone(),
                generated_at: now,
                briefs: briefs.clone(),
                stats: stats.clone(),
            };
            match archive.write_brief(&record) {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to archive brief");
                    None
                }
            }
        }
        _ => None,
    };

    let report = RunReport {
        run_key,
        dry_run: options.dry_run,
        accounts_total: accounts.len(),
        stats,
        post,
        briefs,
        archived,
    };
    tracing::info!(
        run_key = %report.run_key,
        accounts = report.stats.accounts_processed,
        fetched = report.stats.total_articles_fetched,
        kept = report.stats.total_articles_kept,
        tokens = report.stats.total_tokens_used,
        errors = report.stats.errors.len(),
        posted = report.post.success,
        "Weekly brief finished"
    );
    Ok(report)
}

/// Fetch, filter, summarize and remember one account.
pub async fn process_account(
    ctx: &JobContext,
    account: &AccountConfig,
    window: &DateWindow,
    dry_run: bool,
) -> Result<AccountBrief> {
    let config = &ctx.config;
    let max_fetch = config.articles_per_account * FETCH_MULTIPLIER;

    let articles = ctx
        .news
        .fetch_articles_for_account(account, window, max_fetch)
        .await?;
    let fetched = articles.len();
    tracing::info!(company = %account.company, fetched, "Fetched raw articles");

    if articles.is_empty() {
        return Ok(ctx.summarizer.summarize(&account.company, &[]).await);
    }

    let mut candidates = ctx.filter.prepare(articles);
    if let Some(db) = &ctx.db {
        match db.filter_unseen(&account.company, candidates.clone()).await {
            Ok(unseen) => candidates = unseen,
            Err(e) => {
                tracing::warn!(company = %account.company, error = %e, "Seen-URL lookup failed; keeping all")
            }
        }
    }

    let relevance = RelevanceTerms::for_account(account);
    let selected = ctx
        .filter
        .select(candidates, config.articles_per_account, &relevance);
    tracing::info!(company = %account.company, kept = selected.len(), "Filtered articles");

    let mut brief = ctx.summarizer.summarize(&account.company, &selected).await;
    brief.articles_fetched = fetched;

    if let Some(db) = &ctx.db {
        if !dry_run && !selected.is_empty() {
            let ttl = i64::from(config.persistence.ttl_days);
            if let Err(e) = db.mark_as_seen(&account.company, &selected, ttl).await {
                tracing::warn!(company = %account.company, error = %e, "Failed to mark articles as seen");
            }
        }
    }

    Ok(brief)
}

/// Dry run without a Slack client: same shape as a Slack dry run.
fn dry_run_outcome(briefs: &[AccountBrief]) -> PostOutcome {
    if briefs.is_empty() {
        return PostOutcome::failure("No summaries provided");
    }
    let blocks = crate::slack::build_message_blocks(briefs, None);
    for brief in briefs.iter().take(3) {
        tracing::info!(
            company = %brief.company,
            articles = brief.article_count,
            preview = %crate::util::truncate_chars(&brief.summary, 200),
            "Preview"
        );
    }
    PostOutcome {
        success: true,
        dry_run: true,
        message_size: crate::slack::message_size(&blocks),
        account_count: briefs.len(),
        ..Default::default()
    }
}
