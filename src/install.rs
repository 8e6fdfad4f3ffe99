//! Per-release installation
//!
//! Each resolved release is installed by its own task. A task only ever
//! writes below `store/<version>` and to the links for the suffixes its
//! release owns, so tasks never contend with each other.

use crate::archive::{ArchiveFormat, Extractor};
use crate::error::{InstallError, Result};
use crate::github::ReleaseCatalog;
use crate::marker::{read_marker, write_marker};
use crate::types::{InstallOutcome, InstallReport, InstallationMarker, ResolvedRelease};
use chrono::Utc;
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Read-only inputs shared by every install task.
pub struct InstallContext {
    pub catalog: Arc<dyn ReleaseCatalog>,
    pub asset_pattern: Regex,
    pub store: PathBuf,
    pub bin_dir: PathBuf,
}

pub async fn install_release(
    ctx: &InstallContext,
    release: &ResolvedRelease,
) -> Result<InstallOutcome> {
    let version_dir = ctx.store.join(release.dir_name());
    let extractor = Extractor {
        dest_dir: version_dir.clone(),
        link_root: ctx.bin_dir.clone(),
        suffixes: release.suffixes.iter().cloned().collect(),
    };

    if let Some(marker) = read_marker(&version_dir) {
        if marker.url == release.url {
            if marker.suffixes == release.suffixes {
                tracing::info!("Skipping download of {}, already installed", release.version);
                return Ok(InstallOutcome::AlreadyInstalled);
            }

            // Links owned in an earlier run but not now are left for their new owner.
            tracing::info!("Relinking {} without downloading", release.version);
            let links = extractor.relink(&marker.executables)?;
            write_marker(
                &version_dir,
                &InstallationMarker {
                    suffixes: release.suffixes.clone(),
                    ..marker
                },
            )?;
            return Ok(InstallOutcome::Relinked { links });
        }
        tracing::info!(
            "{} was installed from {}, reinstalling from {}",
            release.version,
            marker.url,
            release.url
        );
    }

    let asset = match release
        .assets
        .iter()
        .find(|asset| ctx.asset_pattern.is_match(&asset.name))
    {
        Some(asset) => asset,
        None => {
            tracing::info!(
                "No asset of {} matches '{}', skipping",
                release.tag_name,
                ctx.asset_pattern
            );
            return Ok(InstallOutcome::NoMatchingAsset);
        }
    };

    // Whatever is here has no valid marker: an interrupted or superseded install.
    if fs::symlink_metadata(&version_dir).is_ok() {
        tracing::warn!("Removing incomplete install at {}", version_dir.display());
        tokio::fs::remove_dir_all(&version_dir)
            .await
            .map_err(InstallError::io(&version_dir))?;
    }

    tracing::info!("Installing {} from {}...", release.version, asset.name);

    fs::create_dir_all(&ctx.store).map_err(InstallError::io(&ctx.store))?;
    let staging = tempfile::Builder::new()
        .prefix(".download-")
        .tempdir_in(&ctx.store)
        .map_err(InstallError::io(&ctx.store))?;
    let archive_path = staging.path().join("asset");

    ctx.catalog
        .fetch_asset(&asset.browser_download_url, &archive_path)
        .await?;

    let format = ArchiveFormat::from_name(&asset.name);
    let summary =
        tokio::task::spawn_blocking(move || extractor.extract(&archive_path, format)).await??;

    write_marker(
        &version_dir,
        &InstallationMarker {
            url: release.url.clone(),
            version: release.version.to_string(),
            tag_name: release.tag_name.clone(),
            asset: asset.name.clone(),
            installed_at: Some(Utc::now().to_rfc3339()),
            suffixes: release.suffixes.clone(),
            executables: summary.executables.clone(),
        },
    )?;

    tracing::info!(
        "Installed {} to {} ({} files, {} links)",
        release.version,
        version_dir.display(),
        summary.files,
        summary.links
    );

    Ok(InstallOutcome::Installed {
        asset: asset.name.clone(),
        links: summary.links,
    })
}

/// Install every release concurrently and wait for all of them.
///
/// A failing release never stops the others; its error is returned in its
/// report. Reports come back in the same order as `releases`.
pub async fn install_all(
    ctx: Arc<InstallContext>,
    releases: Vec<ResolvedRelease>,
) -> Vec<InstallReport> {
    let handles: Vec<_> = releases
        .into_iter()
        .map(|release| {
            let ctx = Arc::clone(&ctx);
            let version = release.version.clone();
            let handle = tokio::spawn(async move { install_release(&ctx, &release).await });
            (version, handle)
        })
        .collect();

    tracing::info!("Waiting for {} installs...", handles.len());

    let mut reports = Vec::with_capacity(handles.len());
    for (version, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(InstallError::from(e)),
        };
        if let Err(e) = &result {
            tracing::error!("Installing {} failed: {}", version, e);
        }
        reports.push(InstallReport { version, result });
    }

    tracing::info!("Done");
    reports
}
