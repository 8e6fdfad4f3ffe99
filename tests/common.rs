use flate2::write::GzEncoder;
use flate2::Compression;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

#[allow(dead_code)]
pub struct TestContext {
    pub _temp_dir: TempDir,
    pub store: PathBuf,
    pub bin_dir: PathBuf,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = temp_dir.path().join("store");
        let bin_dir = temp_dir.path().join("bin");

        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_install-releases"));

        Self {
            _temp_dir: temp_dir,
            store,
            bin_dir,
            bin_path,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.env_remove("RELEASE_TOKEN");
        cmd.env_remove("RUST_LOG");
        cmd.env("INSTALL_RELEASES_STORE", &self.store);
        cmd
    }

    /// Run an install of `owner/tool` against a mock API.
    pub fn install(&self, api_url: &str, pattern: &str, extra: &[&str]) -> CommandOutput {
        self.cmd()
            .args(["--api-url", api_url])
            .args(extra)
            .arg("owner/tool")
            .arg(pattern)
            .arg(&self.bin_dir)
            .output()
            .expect("Failed to run install-releases")
            .into()
    }

    pub fn link(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.bin_dir.join(name)).ok()
    }
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_failure(&self) -> &Self {
        if self.status.success() {
            panic!(
                "Command unexpectedly succeeded\nstdout: {}\nstderr: {}",
                self.stdout, self.stderr
            );
        }
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Stderr did not contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}

/// A gzipped tarball holding `tool-<version>/tool` (executable) and a README.
#[allow(dead_code)]
pub fn tool_archive(version: &str) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

    let body = format!("tool {}", version);
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(body.len() as u64);
    header.set_mode(0o755);
    builder
        .append_data(&mut header, format!("tool-{}/tool", version), body.as_bytes())
        .unwrap();

    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(6);
    header.set_mode(0o644);
    builder
        .append_data(&mut header, format!("tool-{}/README", version), &b"readme"[..])
        .unwrap();

    builder.into_inner().unwrap().finish().unwrap()
}

/// A release object shaped like the GitHub API's.
#[allow(dead_code)]
pub fn release_json(server_url: &str, tag: &str, published_at: &str) -> serde_json::Value {
    serde_json::json!({
        "url": format!("{}/repos/owner/tool/releases/{}", server_url, tag),
        "tag_name": tag,
        "published_at": published_at,
        "assets": [
            {
                "name": format!("tool-{}-darwin-arm64.tar.gz", tag),
                "browser_download_url": format!("{}/download/{}/tool-darwin-arm64.tar.gz", server_url, tag)
            },
            {
                "name": format!("tool-{}-linux-amd64.tar.gz", tag),
                "browser_download_url": format!("{}/download/{}/tool-linux-amd64.tar.gz", server_url, tag)
            }
        ]
    })
}
