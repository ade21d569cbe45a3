// CLI Command Implementations
// Handles execution of each CLI command with colored output

use super::{error, info, success, warning, Commands, PrefsAction};
use crate::config::VigilConfig;
use crate::preferences::{PreferenceError, Preferences};
use crate::shutdown::{CancellableScope, ShutdownCoordinator, ShutdownTrigger, TracingLogger};
use crate::update::{self, GithubReleases, TerminalPrompt, UpdateOutcome};
use anyhow::{Context, Result};
use colored::*;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info as log_info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Execute a CLI command
pub async fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Run { config, stop_after, reason } => {
            let config = load_config(&config)?;
            run_command(config, stop_after, reason).await
        }
        Commands::Update { config } => {
            let config = load_config(&config)?;
            update_command(&config).await
        }
        Commands::Prefs { config, action } => {
            let config = load_config(&config)?;
            prefs_command(&config, action)
        }
        Commands::Validate { file } => validate_command(&file),
    }
}

fn load_config(path: &str) -> Result<VigilConfig> {
    let config = VigilConfig::load(path)?;
    crate::observability::init(&config.logging)?;
    Ok(config)
}

/// Run until cancelled by a signal or a stop request
async fn run_command(config: VigilConfig, stop_after: Option<u64>, reason: Option<String>) -> Result<()> {
    log_info!(
        signals = config.signals.enabled,
        check_updates = config.update.check_on_start,
        "Configuration loaded"
    );

    if config.update.check_on_start {
        if let Err(e) = check_updates(&config).await {
            warn!(error = %e, "Update check failed");
        }
    }

    let coordinator = Arc::new(ShutdownCoordinator::new());
    let scope = if config.signals.enabled {
        coordinator.new_scope()
    } else {
        coordinator.new_detached_scope()
    };

    let worker = tokio::spawn(heartbeat(scope.child()));

    if let (Some(secs), Some(reason)) = (stop_after, reason) {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            if let Err(e) = coordinator.stop(Some(&TracingLogger), &reason) {
                error(&format!("Stop request rejected: {}", e));
            }
        });
    }

    success("vigil is running");
    info("Press Ctrl+C for graceful shutdown");

    scope.cancelled().await;
    let beats = worker.await.context("Heartbeat worker failed")?;

    match coordinator.cause().map(|cause| cause.trigger) {
        Some(ShutdownTrigger::Signal(signal)) => info(&format!("Stopped by {}", signal.to_string().yellow())),
        Some(ShutdownTrigger::Stop { reason }) => info(&format!("Stopped on request: {}", reason.bright_white())),
        Some(ShutdownTrigger::Direct) | None => info("Stopped"),
    }
    log_info!(beats, "Graceful shutdown complete");
    Ok(())
}

/// Example workload derived from the root scope
async fn heartbeat(scope: CancellableScope) -> u64 {
    let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
    let mut beats = 0;

    loop {
        tokio::select! {
            _ = scope.cancelled() => break,
            _ = interval.tick() => {
                beats += 1;
                debug!(beats, "heartbeat");
            }
        }
    }
    beats
}

async fn check_updates(config: &VigilConfig) -> Result<UpdateOutcome> {
    let source = GithubReleases::new(&config.update)?;
    let prefs_path = config.preferences_path()?;
    let mut prompt = TerminalPrompt;

    let outcome = update::check_for_updates(
        env!("CARGO_PKG_VERSION"),
        &source,
        &prefs_path,
        &mut prompt,
    )
    .await?;
    Ok(outcome)
}

/// Check for a newer release interactively
async fn update_command(config: &VigilConfig) -> Result<()> {
    info(&format!("Current version: {}", env!("CARGO_PKG_VERSION").cyan()));

    match check_updates(config).await? {
        UpdateOutcome::UpToDate => success("You are running the latest version"),
        UpdateOutcome::Accepted { latest } => info(&format!("Install {} to upgrade", latest.bright_green())),
        UpdateOutcome::Declined { .. } | UpdateOutcome::Notified { .. } => {}
    }
    Ok(())
}

fn prefs_command(config: &VigilConfig, action: PrefsAction) -> Result<()> {
    let path = config.preferences_path()?;

    match action {
        PrefsAction::Get { key } => {
            let prefs = Preferences::load(&path)?;
            match prefs.get(&key) {
                Some(value) => println!("{}", value),
                None => warning(&format!("{} is not set", key.cyan())),
            }
        }
        PrefsAction::Set { key, value } => {
            let mut prefs = load_or_default(&path)?;
            prefs.set(key.as_str(), value.as_str())?;
            prefs.save(&path)?;
            success(&format!("Set {} = {}", key.cyan(), value.yellow()));
        }
    }
    Ok(())
}

fn load_or_default(path: &Path) -> Result<Preferences> {
    match Preferences::load(path) {
        Ok(prefs) => Ok(prefs),
        Err(PreferenceError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            Ok(Preferences::default())
        }
        Err(e) => Err(e.into()),
    }
}

fn validate_command(file: &str) -> Result<()> {
    info(&format!("Validating {}", file.bright_white()));

    if !Path::new(file).exists() {
        anyhow::bail!("Configuration file {} not found", file);
    }
    VigilConfig::load(file)?;
    success("Configuration file is valid");
    Ok(())
}
