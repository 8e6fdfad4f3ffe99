use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A release as returned by the GitHub releases API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseRecord {
    pub url: String,
    pub tag_name: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<AssetRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetRecord {
    pub name: String,
    pub browser_download_url: String,
}

/// A release that survived resolution, together with the link suffixes it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelease {
    pub url: String,
    pub tag_name: String,
    pub version: Version,
    pub published_at: DateTime<Utc>,
    pub assets: Vec<AssetRecord>,
    pub suffixes: BTreeSet<String>,
}

impl ResolvedRelease {
    /// Name of the directory under the store this release installs into.
    pub fn dir_name(&self) -> String {
        self.version.to_string()
    }
}

/// Written as `release.json` inside a version directory once that version is
/// fully installed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallationMarker {
    pub url: String,
    pub version: String,
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub installed_at: Option<String>,
    /// Link suffixes this release owned when its links were last written.
    #[serde(default)]
    pub suffixes: BTreeSet<String>,
    /// Executables below the version directory, relative to it.
    #[serde(default)]
    pub executables: Vec<PathBuf>,
}

/// What happened to a single release during an install run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { asset: String, links: usize },
    AlreadyInstalled,
    /// Installed before, but the release now owns different links.
    Relinked { links: usize },
    NoMatchingAsset,
}

#[derive(Debug)]
pub struct InstallReport {
    pub version: Version,
    pub result: Result<InstallOutcome, crate::error::InstallError>,
}
