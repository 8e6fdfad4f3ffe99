use crate::cli::Cli;
use anyhow::{Context, Result};
use regex::Regex;
use semver::Version;
use std::path::PathBuf;

pub const APP_NAME: &str = "install-releases";
pub const DEFAULT_STORE: &str = "/var/store";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const TOKEN_ENV: &str = "RELEASE_TOKEN";
pub const MARKER_FILE_NAME: &str = "release.json";
pub const PAGE_SIZE: usize = 100;

/// Everything a run needs, gathered from the command line and environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub repo: String,
    pub asset_pattern: Regex,
    pub bin_dir: PathBuf,
    pub store: PathBuf,
    pub limit: Option<Version>,
    pub api_url: String,
    pub token: Option<String>,
    pub keep_superseded: bool,
    pub dry_run: bool,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let asset_pattern = Regex::new(&cli.asset_pattern)
            .with_context(|| format!("Invalid asset pattern '{}'", cli.asset_pattern))?;

        let limit = cli
            .limit
            .as_deref()
            .map(|l| {
                crate::resolve::parse_version(l)
                    .with_context(|| format!("Invalid version limit '{}'", l))
            })
            .transpose()?;

        let token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
        if token.is_some() {
            tracing::debug!("Using {}", TOKEN_ENV);
        }

        Ok(Self {
            repo: cli.repo.clone(),
            asset_pattern,
            bin_dir: cli.bin_dir.clone(),
            store: cli.store.clone(),
            limit,
            api_url: cli.api_url.trim_end_matches('/').to_string(),
            token,
            keep_superseded: cli.keep_superseded,
            dry_run: cli.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_settings_from_cli() {
        let cli = Cli::parse_from([
            APP_NAME,
            "--store",
            "/tmp/store",
            "--limit",
            "v2.1",
            "--api-url",
            "http://localhost:1234/",
            "owner/tool",
            r"linux-amd64\.tar\.gz$",
            "/usr/local/bin",
        ]);
        let settings = Settings::from_cli(&cli).unwrap();

        assert_eq!(settings.repo, "owner/tool");
        assert!(settings.asset_pattern.is_match("tool-linux-amd64.tar.gz"));
        assert_eq!(settings.store, PathBuf::from("/tmp/store"));
        assert_eq!(settings.bin_dir, PathBuf::from("/usr/local/bin"));
        assert_eq!(settings.limit, Some(Version::new(2, 1, 0)));
        assert_eq!(settings.api_url, "http://localhost:1234");
        assert!(!settings.dry_run);
        assert!(!settings.keep_superseded);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let cli = Cli::parse_from([APP_NAME, "owner/tool", "(unclosed", "/bin"]);
        let err = Settings::from_cli(&cli).unwrap_err();
        assert!(err.to_string().contains("Invalid asset pattern"));
    }
}
