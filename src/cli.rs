//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use depman_core::DEFAULT_MAX_RETRIES;
use depman_core::repository::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS};

/// Resolve and download runtime library dependencies.
///
/// Reads a `dependencies.json` declaration, resolves every listed artifact and
/// its transitive dependencies against the configured repositories, and stores
/// the jars in a shared libraries directory.
#[derive(Parser, Debug)]
#[command(name = "depman")]
#[command(author, version, about)]
pub struct Args {
    /// Extra dependencies to resolve, as group:artifact:version
    pub coordinates: Vec<String>,

    /// Dependency declaration file
    #[arg(long, default_value = "dependencies.json")]
    pub config: PathBuf,

    /// Host data directory; libraries are stored in its sibling `libraries` directory
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Store libraries here instead of next to the data directory
    #[arg(long)]
    pub libraries_dir: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// TCP connect timeout in seconds (1-300)
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=300))]
    pub connect_timeout: u64,

    /// Per-request timeout in seconds (1-3600)
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub request_timeout: u64,

    /// Maximum download attempts for transient failures (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Do not register Maven Central and the plugin repository
    #[arg(long)]
    pub no_default_repositories: bool,
}
