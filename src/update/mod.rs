// Release Update Check
// Polls the latest GitHub release and asks the user whether to upgrade

use async_trait::async_trait;
use colored::*;
use serde::Deserialize;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::UpdateConfig;
use crate::preferences::{self, PreferenceError};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("failed to fetch latest release: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to fetch latest release: {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid release payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Preferences(#[from] PreferenceError),
}

/// Where the latest released version comes from
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn latest_tag(&self) -> Result<String, UpdateError>;
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// Extract the tag from a GitHub "latest release" payload
pub fn parse_release(body: &str) -> Result<String, UpdateError> {
    let release: Release = serde_json::from_str(body)?;
    Ok(release.tag_name)
}

/// GitHub releases API
pub struct GithubReleases {
    client: reqwest::Client,
    url: String,
}

impl GithubReleases {
    pub fn new(config: &UpdateConfig) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            config.api_base.trim_end_matches('/'),
            config.repo_owner,
            config.repo_name
        );
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReleaseSource for GithubReleases {
    async fn latest_tag(&self) -> Result<String, UpdateError> {
        debug!(url = %self.url, "Fetching latest release");
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(UpdateError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_release(&body)
    }
}

/// Asks the user whether to install a newer version
#[async_trait]
pub trait UpdatePrompt: Send {
    async fn confirm(&mut self, current: &str, latest: &str) -> bool;
}

/// Interactive prompt on stdin/stdout
///
/// The blocking read runs on Tokio's blocking pool, off the async workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

#[async_trait]
impl UpdatePrompt for TerminalPrompt {
    async fn confirm(&mut self, current: &str, latest: &str) -> bool {
        let (current, latest) = (current.to_string(), latest.to_string());
        tokio::task::spawn_blocking(move || ask(&mut io::stdin().lock(), &current, &latest))
            .await
            .unwrap_or(false)
    }
}

/// Print the question and read one answer line from `input`
pub fn ask<R: BufRead>(input: &mut R, current: &str, latest: &str) -> bool {
    println!(
        "A new version of vigil is available: {} (current version: {})",
        latest.bright_green(),
        current
    );
    print!("Do you want to update to the latest version? [Y/n]: ");
    let _ = io::stdout().flush();

    let mut response = String::new();
    if input.read_line(&mut response).is_err() {
        return false;
    }
    accepts(&response)
}

/// `y`, `yes` and an empty answer all mean yes
pub fn accepts(response: &str) -> bool {
    let response = response.trim().to_lowercase();
    response.is_empty() || response == "y" || response == "yes"
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate,
    /// Newer version exists but the user opted out of prompts
    Notified { latest: String },
    Accepted { latest: String },
    Declined { latest: String },
}

/// Compare the running version with the latest release and act on it
pub async fn check_for_updates(
    current: &str,
    source: &dyn ReleaseSource,
    prefs_path: &Path,
    prompt: &mut dyn UpdatePrompt,
) -> Result<UpdateOutcome, UpdateError> {
    let latest = source.latest_tag().await?;
    if latest.is_empty() || same_version(current, &latest) {
        debug!(current = %current, latest = %latest, "No update available");
        return Ok(UpdateOutcome::UpToDate);
    }

    if preferences::update_opted_out(prefs_path)? {
        warn_available(&latest);
        return Ok(UpdateOutcome::Notified { latest });
    }

    if prompt.confirm(current, &latest).await {
        info!(latest = %latest, "Update accepted; install it with your package manager");
        return Ok(UpdateOutcome::Accepted { latest });
    }

    preferences::save_update_preference(prefs_path, "no")?;
    warn_available(&latest);
    Ok(UpdateOutcome::Declined { latest })
}

fn same_version(current: &str, latest: &str) -> bool {
    current.trim_start_matches('v') == latest.trim_start_matches('v')
}

fn warn_available(latest: &str) {
    crate::cli::warning(&format!("A new version of vigil is available: {}.", latest));
    println!("To update, run: {}", "vigil update".bright_white());
}
