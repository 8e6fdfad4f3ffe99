mod archive;
mod cli;
mod config;
mod error;
mod github;
mod install;
mod marker;
mod resolve;
mod types;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::Cli;
use config::Settings;
use console::style;
use github::{GitHubClient, ReleaseCatalog};
use indicatif::{MultiProgress, ProgressDrawTarget};
use install::{install_all, InstallContext};
use resolve::{resolve, ResolveOptions};
use std::error::Error;
use std::sync::Arc;
use types::{InstallOutcome, InstallReport, ResolvedRelease};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    let settings = Settings::from_cli(&cli)?;

    let progress = if cli.quiet {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    } else {
        MultiProgress::new()
    };

    let client = GitHubClient::new(&settings.api_url, &settings.repo, settings.token.clone())
        .context("Could not create HTTP client")?
        .with_progress(progress);

    let records = client
        .list_releases()
        .await
        .with_context(|| format!("Could not list releases of {}", settings.repo))?;

    let options = ResolveOptions {
        limit: settings.limit.clone(),
        keep_superseded: settings.keep_superseded,
    };
    let releases = resolve(&records, &options).context("Could not resolve releases")?;
    tracing::info!(
        "{} of {} releases own at least one link",
        releases.len(),
        records.len()
    );

    if settings.dry_run {
        print_plan(&releases);
        return Ok(());
    }

    std::fs::create_dir_all(&settings.store)
        .with_context(|| format!("Could not create store {}", settings.store.display()))?;

    let ctx = Arc::new(InstallContext {
        catalog: Arc::new(client),
        asset_pattern: settings.asset_pattern.clone(),
        store: settings.store.clone(),
        bin_dir: settings.bin_dir.clone(),
    });

    let reports = install_all(ctx, releases).await;
    let failed = print_summary(&reports, cli.quiet);

    if failed > 0 {
        return Err(anyhow!(
            "{} of {} releases failed to install",
            failed,
            reports.len()
        ));
    }

    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 {
        "warn"
    } else if cli.verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Could not set up logging: {}", e))?;

    Ok(())
}

fn suffix_label(suffix: &str) -> &str {
    if suffix.is_empty() {
        "latest"
    } else {
        suffix
    }
}

fn print_plan(releases: &[ResolvedRelease]) {
    println!("--- Release Links ---");
    if releases.is_empty() {
        println!("  No installable releases.");
        return;
    }

    for release in releases {
        let suffixes: Vec<&str> = release.suffixes.iter().map(|s| suffix_label(s)).collect();
        println!(
            "  {} ({}) -> {}",
            style(&release.version).bold(),
            release.tag_name,
            suffixes.join(", ")
        );
    }
}

fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Print one line per release and return how many failed.
fn print_summary(reports: &[InstallReport], quiet: bool) -> usize {
    let mut failed = 0;

    for report in reports {
        match &report.result {
            Ok(outcome) if !quiet => match outcome {
                InstallOutcome::Installed { asset, links } => println!(
                    "  {} {} from {} ({} links)",
                    style("installed").green(),
                    report.version,
                    asset,
                    links
                ),
                InstallOutcome::Relinked { links } => println!(
                    "  {} {} ({} links)",
                    style("relinked").cyan(),
                    report.version,
                    links
                ),
                InstallOutcome::AlreadyInstalled => {
                    println!("  {} {}", style("up to date").dim(), report.version)
                }
                InstallOutcome::NoMatchingAsset => println!(
                    "  {} {}: no matching asset",
                    style("skipped").yellow(),
                    report.version
                ),
            },
            Ok(_) => {}
            Err(e) => {
                failed += 1;
                eprintln!(
                    "  {} {}: {}",
                    style("failed").red().bold(),
                    report.version,
                    error_chain(e)
                );
            }
        }
    }

    failed
}
