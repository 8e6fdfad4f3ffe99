//! GitHub releases API access
//!
//! Lists every release of a repository and downloads release assets. The
//! optional token is only ever sent to the API host itself; asset downloads
//! that live elsewhere go out unauthenticated.

use crate::config::{APP_NAME, PAGE_SIZE};
use crate::error::{InstallError, Result};
use crate::types::ReleaseRecord;
use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use reqwest::Url;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Where releases come from.
#[async_trait]
pub trait ReleaseCatalog: Send + Sync {
    /// Every release of the repository, newest first as the API returns them.
    async fn list_releases(&self) -> Result<Vec<ReleaseRecord>>;

    /// Download an asset to `dest`, returning the number of bytes written.
    async fn fetch_asset(&self, url: &str, dest: &Path) -> Result<u64>;
}

pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    api_origin: Option<(String, Option<u16>)>,
    repo: String,
    token: Option<String>,
    page_size: usize,
    progress: MultiProgress,
}

fn origin(url: &str) -> Option<(String, Option<u16>)> {
    let url = Url::parse(url).ok()?;
    Some((url.host_str()?.to_string(), url.port_or_known_default()))
}

impl GitHubClient {
    pub fn new(api_url: &str, repo: &str, token: Option<String>) -> Result<Self> {
        let api_url = api_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| InstallError::Request {
                url: api_url.clone(),
                source,
            })?;

        Ok(Self {
            http,
            api_origin: origin(&api_url),
            api_url,
            repo: repo.to_string(),
            token,
            page_size: PAGE_SIZE,
            progress: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        })
    }

    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = progress;
        self
    }

    #[cfg(test)]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn is_api_host(&self, url: &str) -> bool {
        self.api_origin.is_some() && origin(url) == self.api_origin
    }

    async fn get(&self, url: &str, accept: &str) -> Result<reqwest::Response> {
        let mut request = self.http.get(url).header("Accept", accept);

        if let Some(token) = &self.token {
            if self.is_api_host(url) {
                request = request.bearer_auth(token);
            } else {
                tracing::debug!("Not sending token to foreign host for {}", url);
            }
        }

        let response = request.send().await.map_err(|source| InstallError::Request {
            url: url.to_string(),
            source,
        })?;

        if !response.status().is_success() {
            return Err(InstallError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        Ok(response)
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

#[async_trait]
impl ReleaseCatalog for GitHubClient {
    async fn list_releases(&self) -> Result<Vec<ReleaseRecord>> {
        let mut releases = Vec::new();

        for page in 1u32.. {
            let url = format!(
                "{}/repos/{}/releases?per_page={}&page={}",
                self.api_url, self.repo, self.page_size, page
            );
            tracing::debug!("Fetching GitHub releases from: {}", url);

            let batch: Vec<ReleaseRecord> = self
                .get(&url, "application/vnd.github+json")
                .await?
                .json()
                .await
                .map_err(|source| InstallError::Request {
                    url: url.clone(),
                    source,
                })?;

            let last_page = batch.len() < self.page_size;
            releases.extend(batch);
            if last_page {
                break;
            }
        }

        tracing::info!("Found {} releases of {}", releases.len(), self.repo);
        Ok(releases)
    }

    async fn fetch_asset(&self, url: &str, dest: &Path) -> Result<u64> {
        let filename = url.rsplit('/').next().unwrap_or(url).to_string();
        tracing::info!("Downloading {}...", filename);

        let response = self.get(url, "application/octet-stream").await?;
        let total_size = response.content_length().unwrap_or(0);

        let pb = self.progress.add(ProgressBar::new(total_size));
        pb.set_style(bar_style());
        pb.set_message(format!("Downloading {}", filename));

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(InstallError::io(dest))?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| InstallError::Request {
                url: url.to_string(),
                source,
            })?;
            file.write_all(&chunk).await.map_err(InstallError::io(dest))?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }
        file.flush().await.map_err(InstallError::io(dest))?;

        pb.finish_and_clear();
        tracing::debug!("Copied {} bytes from {}", downloaded, url);
        Ok(downloaded)
    }
}
