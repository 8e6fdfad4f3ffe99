//! Version resolution
//!
//! Decides, for a full list of releases, which release owns each link slot:
//! the overall latest (`tool`), the latest of each major line (`tool-1`), the
//! latest of each minor line (`tool-1.4`) and each exact version
//! (`tool-1.4.2`). Resolution needs every release before it can decide
//! anything, so it runs to completion before any install starts.

use crate::error::{InstallError, Result};
use crate::types::{ReleaseRecord, ResolvedRelease};
use chrono::{DateTime, Utc};
use semver::{BuildMetadata, Version};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Releases newer than this never take part.
    pub limit: Option<Version>,
    /// Keep releases that only own their exact-version link.
    pub keep_superseded: bool,
}

/// A link slot contested by all releases.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Slot {
    Latest,
    Major(u64),
    Minor(u64, u64),
    Exact(u64, u64, u64),
}

impl Slot {
    fn all_for(v: &Version) -> [Slot; 4] {
        [
            Slot::Exact(v.major, v.minor, v.patch),
            Slot::Minor(v.major, v.minor),
            Slot::Major(v.major),
            Slot::Latest,
        ]
    }

    fn suffix(&self) -> String {
        match self {
            Slot::Latest => String::new(),
            Slot::Major(major) => format!("-{}", major),
            Slot::Minor(major, minor) => format!("-{}.{}", major, minor),
            Slot::Exact(major, minor, patch) => format!("-{}.{}.{}", major, minor, patch),
        }
    }
}

/// Parse a release tag into a version.
///
/// Tags are tried as strict semver first. Failing that, leading non-digits
/// (`v`, `release-`, ...) are stripped and missing minor/patch components are
/// filled with zero, so `v1.2` becomes `1.2.0`.
pub fn parse_version(tag: &str) -> Result<Version> {
    if let Ok(version) = Version::parse(tag) {
        return Ok(version);
    }

    let stripped = tag.trim_start_matches(|c: char| !c.is_ascii_digit());
    parse_lenient(stripped).map_err(|source| InstallError::InvalidTag {
        tag: tag.to_string(),
        source,
    })
}

fn parse_lenient(s: &str) -> std::result::Result<Version, semver::Error> {
    let err = match Version::parse(s) {
        Ok(version) => return Ok(version),
        Err(err) => err,
    };

    let core_end = s.find(|c: char| c == '-' || c == '+').unwrap_or(s.len());
    let (core, rest) = s.split_at(core_end);
    let components = core.split('.').count();
    if core.is_empty() || components >= 3 {
        return Err(err);
    }

    let padded = format!("{}{}{}", core, ".0".repeat(3 - components), rest);
    Version::parse(&padded).map_err(|_| err)
}

/// Parse an RFC-3339 publish time. Unparseable or missing times sort before
/// every real one.
pub fn parse_publish_time(raw: Option<&str>) -> DateTime<Utc> {
    match raw.map(DateTime::parse_from_rfc3339) {
        Some(Ok(time)) => time.with_timezone(&Utc),
        Some(Err(e)) => {
            tracing::debug!("Ignoring unparseable publish time {:?}: {}", raw, e);
            DateTime::<Utc>::MIN_UTC
        }
        None => DateTime::<Utc>::MIN_UTC,
    }
}

/// Build metadata does not take part in version precedence, so `1.0.0+a`
/// and `1.0.0+b` are the same release for deduplication.
fn precedence_key(version: &Version) -> Version {
    Version {
        build: BuildMetadata::EMPTY,
        ..version.clone()
    }
}

/// Resolve a raw release list into the releases that must be installed.
///
/// Every returned release owns at least one link suffix and no suffix is
/// owned twice. Releases come back in the order they were first seen.
pub fn resolve(records: &[ReleaseRecord], options: &ResolveOptions) -> Result<Vec<ResolvedRelease>> {
    let mut releases: Vec<ResolvedRelease> = Vec::new();
    let mut by_version: HashMap<Version, usize> = HashMap::new();

    for record in records {
        let version = parse_version(&record.tag_name)?;

        if !version.pre.is_empty() {
            tracing::debug!("Ignoring pre-release {}", record.tag_name);
            continue;
        }

        if let Some(limit) = &options.limit {
            if &version > limit {
                tracing::debug!("Ignoring {} above limit {}", record.tag_name, limit);
                continue;
            }
        }

        let release = ResolvedRelease {
            url: record.url.clone(),
            tag_name: record.tag_name.clone(),
            version: version.clone(),
            published_at: parse_publish_time(record.published_at.as_deref()),
            assets: record.assets.clone(),
            suffixes: BTreeSet::new(),
        };

        let key = precedence_key(&version);
        match by_version.get(&key) {
            Some(&idx) => {
                if releases[idx].published_at < release.published_at {
                    tracing::debug!(
                        "{} replaces earlier release {} of the same version",
                        release.url,
                        releases[idx].url
                    );
                    releases[idx] = release;
                }
            }
            None => {
                by_version.insert(key, releases.len());
                releases.push(release);
            }
        }
    }

    let mut owners: HashMap<Slot, usize> = HashMap::new();
    for (idx, release) in releases.iter().enumerate() {
        for slot in Slot::all_for(&release.version) {
            let wins = match owners.get(&slot) {
                Some(&current) => release.version > releases[current].version,
                None => true,
            };
            if wins {
                owners.insert(slot, idx);
            }
        }
    }

    let mut owned: Vec<Vec<Slot>> = vec![Vec::new(); releases.len()];
    for (slot, idx) in owners {
        owned[idx].push(slot);
    }

    let resolved = releases
        .into_iter()
        .zip(owned)
        .filter_map(|(mut release, slots)| {
            if slots.is_empty() {
                return None;
            }
            let superseded = slots.iter().all(|s| matches!(s, Slot::Exact(..)));
            if superseded && !options.keep_superseded {
                tracing::debug!("{} is superseded, skipping", release.version);
                return None;
            }
            release.suffixes = slots.iter().map(Slot::suffix).collect();
            Some(release)
        })
        .collect();

    Ok(resolved)
}
