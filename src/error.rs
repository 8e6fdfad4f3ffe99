use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("release tag '{tag}' is not a semantic version")]
    InvalidTag {
        tag: String,
        #[source]
        source: semver::Error,
    },

    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("filesystem error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not read archive {path}")]
    Archive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("archive entry '{0}' has no top-level directory to strip")]
    MalformedEntry(String),

    #[error("install task did not complete")]
    Task(#[from] tokio::task::JoinError),
}

impl InstallError {
    pub fn io(path: impl AsRef<Path>) -> impl FnOnce(io::Error) -> InstallError {
        let path = path.as_ref().to_path_buf();
        move |source| InstallError::Io { path, source }
    }

    pub fn archive(path: impl AsRef<Path>) -> impl FnOnce(io::Error) -> InstallError {
        let path = path.as_ref().to_path_buf();
        move |source| InstallError::Archive { path, source }
    }
}

pub type Result<T, E = InstallError> = std::result::Result<T, E>;
