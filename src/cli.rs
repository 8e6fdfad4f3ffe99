use crate::config::{DEFAULT_API_URL, DEFAULT_STORE};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "install-releases")]
#[command(about = "Install every release of a GitHub project and link latest, major and minor aliases")]
#[command(version)]
#[command(after_help = "Examples:\n  install-releases opentofu/opentofu 'linux_amd64\\.tar\\.gz$' ~/.local/bin\n  install-releases --store ~/.local/store --limit 1.6 owner/tool 'x86_64.*linux' /usr/local/bin")]
pub struct Cli {
    /// GitHub repository (e.g., 'owner/repo')
    pub repo: String,

    /// Regular expression selecting the release asset to install
    pub asset_pattern: String,

    /// Directory to create executable symlinks in
    pub bin_dir: PathBuf,

    /// Base directory releases are installed into, one directory per version
    #[arg(long, env = "INSTALL_RELEASES_STORE", default_value = DEFAULT_STORE)]
    pub store: PathBuf,

    /// Ignore releases newer than this version. Links of releases above the
    /// limit that no remaining release takes over are left in place
    #[arg(long, value_name = "VERSION")]
    pub limit: Option<String>,

    /// Base URL of the releases API
    #[arg(long, env = "INSTALL_RELEASES_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Also install releases superseded by a newer patch release, linking
    /// only their exact version
    #[arg(long)]
    pub keep_superseded: bool,

    /// Print which release owns which link without installing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long)]
    pub quiet: bool,
}
