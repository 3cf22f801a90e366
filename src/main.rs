use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use account_brief::config::Config;
use account_brief::job::{self, JobContext, RunOptions, RunReport};
use account_brief::storage::{Database, DatabaseError};

#[derive(Parser, Debug)]
#[command(
    name = "account-brief",
    version,
    about = "Weekly account news brief: Newsdata.io → Claude → Slack"
)]
struct Args {
    /// Settings file (TOML)
    #[arg(long, value_name = "FILE", default_value = "account-brief.toml")]
    config: PathBuf,

    /// Account list (YAML or JSON); overrides the settings file
    #[arg(long, value_name = "FILE")]
    accounts: Option<PathBuf>,

    /// Build the brief and log a preview without posting, marking or archiving
    #[arg(long)]
    dry_run: bool,

    /// Only process this company (repeatable, case-insensitive)
    #[arg(long = "account", value_name = "NAME")]
    only_accounts: Vec<String>,

    /// Forget every seen URL before running
    #[arg(long)]
    reset_db: bool,

    /// Log as JSON lines even on a terminal
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(force_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Humans get text; schedulers and log shippers get JSON
    if force_json || !std::io::stderr().is_terminal() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn build_http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("account-brief/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        // Outer bound; each API call has its own tighter timeout
        .timeout(Duration::from_secs(90))
        .build()?;
    Ok(client)
}

fn print_summary(report: &RunReport) {
    println!("{}", "=".repeat(60));
    println!("EXECUTION SUMMARY ({})", report.run_key);
    println!("{}", "=".repeat(60));
    if report.dry_run {
        println!("Dry run: nothing was posted");
    }
    println!(
        "Accounts processed: {}/{}",
        report.stats.accounts_processed, report.accounts_total
    );
    println!("Total articles fetched: {}", report.stats.total_articles_fetched);
    println!("Total articles kept: {}", report.stats.total_articles_kept);
    println!("Total tokens used: {}", report.stats.total_tokens_used);
    println!("Slack message size: {} bytes", report.post.message_size);
    println!("Slack post success: {}", report.post.success);
    if let Some(error) = &report.post.error {
        println!("Slack error: {error}");
    }
    if let Some(path) = &report.archived {
        println!("Archived to: {}", path.display());
    }
    if !report.stats.errors.is_empty() {
        println!("Errors: {}", report.stats.errors.len());
        for error in &report.stats.errors {
            println!("  - {error}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load settings from '{}'", args.config.display()))?;
    config.apply_env()?;
    if let Some(accounts) = args.accounts {
        config.accounts_file = accounts;
    }

    if args.reset_db {
        let path = config.persistence.database_path.to_string_lossy().into_owned();
        let db = match Database::open(&path).await {
            Ok(db) => db,
            Err(DatabaseError::InstanceLocked) => {
                eprintln!("Error: {}", DatabaseError::InstanceLocked);
                std::process::exit(1);
            }
            Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
        };
        let removed = db.clear_seen().await?;
        db.close().await;
        println!("Seen-URL database reset ({removed} entries removed).");
    }

    let http = build_http_client().context("Failed to build HTTP client")?;
    let ctx = match JobContext::from_config(config, http, args.dry_run).await {
        Ok(ctx) => ctx,
        Err(e)
            if matches!(
                e.downcast_ref::<DatabaseError>(),
                Some(DatabaseError::InstanceLocked)
            ) =>
        {
            eprintln!("Error: {}", DatabaseError::InstanceLocked);
            std::process::exit(1);
        }
        Err(e) => return Err(e),
    };

    let options = RunOptions {
        dry_run: args.dry_run,
        only_accounts: args.only_accounts,
    };
    let report = job::run(&ctx, &options).await?;
    if let Some(db) = &ctx.db {
        db.close().await;
    }

    print_summary(&report);
    if !report.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}
