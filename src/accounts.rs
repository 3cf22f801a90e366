//! Account list loading.
//!
//! Accounts live in a YAML (`.yaml`/`.yml`) or JSON document shaped as
//! `{ accounts: [ { company, website, keywords, newsroom? } ] }`.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountsError {
    #[error("Failed to read accounts file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in accounts file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON in accounts file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Account #{index} is invalid: {reason}")]
    InvalidAccount { index: usize, reason: String },
}

/// One tracked B2B account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub company: String,
    /// Bare company domain, e.g. `acme.com`.
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Optional newsroom URL; its host is queried alongside `website`.
    #[serde(default)]
    pub newsroom: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountsDocument {
    #[serde(default)]
    accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountsFormat {
    Yaml,
    Json,
}

impl AccountsFormat {
    /// YAML for `.yaml`/`.yml`, JSON for anything else.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => AccountsFormat::Yaml,
            _ => AccountsFormat::Json,
        }
    }
}

/// Load and validate the account list from disk.
pub fn load_accounts(path: &Path) -> Result<Vec<AccountConfig>, AccountsError> {
    let content = std::fs::read_to_string(path).map_err(|source| AccountsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let accounts = parse_accounts(&content, AccountsFormat::from_path(path))?;
    tracing::info!(path = %path.display(), count = accounts.len(), "Loaded accounts");
    Ok(accounts)
}

/// Parse an account document already in memory.
pub fn parse_accounts(
    content: &str,
    format: AccountsFormat,
) -> Result<Vec<AccountConfig>, AccountsError> {
    let doc: AccountsDocument = match format {
        AccountsFormat::Yaml => {
            // An empty YAML document deserializes as null
            if content.trim().is_empty() {
                return Ok(Vec::new());
            }
            serde_yaml::from_str(content)?
        }
        AccountsFormat::Json => serde_json::from_str(content)?,
    };

    doc.accounts
        .into_iter()
        .enumerate()
        .map(|(index, account)| normalize(index, account))
        .collect()
}

fn normalize(index: usize, mut account: AccountConfig) -> Result<AccountConfig, AccountsError> {
    account.company = account.company.trim().to_string();
    if account.company.is_empty() {
        return Err(AccountsError::InvalidAccount {
            index,
            reason: "company must not be empty".to_string(),
        });
    }

    account.website = bare_host(&account.website);
    account.keywords = account
        .keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    account.newsroom = account
        .newsroom
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    Ok(account)
}

/// Reduce `https://www.acme.com/about` style input to `www.acme.com`.
pub(crate) fn bare_host(value: &str) -> String {
    let trimmed = value.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

impl AccountConfig {
    /// Host of the newsroom URL, when it differs from the company website.
    pub fn newsroom_host(&self) -> Option<String> {
        let host = bare_host(self.newsroom.as_deref()?);
        (!host.is_empty() && host != self.website).then_some(host)
    }
}
