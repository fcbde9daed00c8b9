use crate::models::{Config, ItemOutcome, SyncReport};
use crate::net::HttpClient;
use crate::publish::{GithubRepository, LocalPublisher, Publisher, RepositoryPublisher};
use crate::sync::SyncRunner;
use crate::Result;
use colored::Colorize;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    pub dry_run: bool,
    pub no_publish: bool,
    pub json: bool,
}

/// Run one sync pass and print the report
pub async fn run(config: &Config, workdir: &Path, opts: CheckOptions) -> Result<()> {
    let transport = HttpClient::new(&config.user_agent, config.timeout_secs)?;
    let publisher = build_publisher(config, opts.no_publish)?;
    info!("Publishing target: {}", publisher.describe());

    let report = SyncRunner::new(config, workdir, &transport, publisher.as_ref())
        .dry_run(opts.dry_run)
        .run()
        .await?;

    let mut stdout = io::stdout().lock();
    write_report(&mut stdout, &report, &publisher.describe(), opts.json)?;

    if report.has_failures() {
        anyhow::bail!("{} annex(es) failed", report.failed_count());
    }
    Ok(())
}

fn build_publisher(config: &Config, no_publish: bool) -> Result<Box<dyn Publisher>> {
    if no_publish {
        return Ok(Box::new(LocalPublisher));
    }

    match config.publish_target()? {
        Some(target) => {
            let repo = GithubRepository::new(target, &config.user_agent, config.timeout_secs)?;
            Ok(Box::new(RepositoryPublisher::new(repo)))
        }
        None => {
            if config.publish.repo.is_some() {
                warn!("Repository configured but GITHUB_TOKEN is not set; keeping files local");
            }
            Ok(Box::new(LocalPublisher))
        }
    }
}

/// Render the report to `out`: JSON, or the colored summary
fn write_report(out: &mut dyn Write, report: &SyncReport, target: &str, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
        return Ok(());
    }

    let title = if report.dry_run {
        "🔍 Annex check (dry run)"
    } else {
        "🔄 Annex sync"
    };
    writeln!(out, "{}", title.cyan().bold())?;
    writeln!(out)?;

    for item in &report.items {
        let line = match &item.outcome {
            ItemOutcome::Unchanged { marker } => {
                format!("{} {}", "unchanged".bright_black(), marker.bright_black())
            }
            ItemOutcome::Changed { previous, marker } => format!(
                "{} {} → {}",
                "changed".yellow(),
                previous.as_deref().unwrap_or("(never seen)"),
                marker
            ),
            ItemOutcome::Updated {
                previous,
                marker,
                path,
            } => format!(
                "{} {} → {} ({})",
                "updated".green(),
                previous.as_deref().unwrap_or("(never seen)"),
                marker,
                path
            ),
            ItemOutcome::Skipped { reason } => format!("{} {}", "skipped".yellow(), reason),
            ItemOutcome::Failed { stage, error } => {
                format!("{} {}: {}", "failed".red(), stage, error)
            }
        };
        writeln!(out, "   Annex {:<4} {}", item.annex.to_string(), line)?;
    }

    writeln!(out)?;
    if report.dry_run {
        return Ok(());
    }

    if report.published.is_empty() {
        writeln!(out, "{}", "✅ No changes detected.".green())?;
    } else {
        let published = format!(
            "✅ Published {} file(s) to {}",
            report.published.len(),
            target
        );
        writeln!(out, "{}", published.green())?;
        if !report.state_published {
            writeln!(out, "{}", "⚠ State file was not published".yellow())?;
        }
    }

    if report.has_failures() {
        let failed = format!("⛔ {} annex(es) failed", report.failed_count());
        writeln!(out, "{}", failed.red())?;
    }
    Ok(())
}
