//! CLI entry point for depman.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use depman_core::{
    DEPENDENCIES_RESOURCE, Dependency, DependencyCoordinator, DirectoryResources, DownloadEngine,
    EngineOptions, LoggingLoader, RepositoryHttpConfig, RepositoryManager, ResourceProvider,
    RetryPolicy, libraries_dir_for,
};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let http_config = RepositoryHttpConfig {
        connect_timeout_secs: args.connect_timeout,
        read_timeout_secs: args.request_timeout,
    };

    let repositories = if args.no_default_repositories {
        RepositoryManager::new()
    } else {
        RepositoryManager::with_default_repositories(&http_config)
            .context("could not set up default repositories")?
    };

    let libraries_dir = args
        .libraries_dir
        .clone()
        .unwrap_or_else(|| libraries_dir_for(&args.data_dir));
    info!(libraries_dir = %libraries_dir.display(), "Using libraries directory");

    let options = EngineOptions {
        request_timeout: Duration::from_secs(args.request_timeout),
        retry_policy: RetryPolicy::with_max_attempts(u32::from(args.max_retries)),
    };
    let engine = DownloadEngine::with_options(
        Arc::new(repositories),
        libraries_dir,
        Arc::new(LoggingLoader),
        options,
    );

    let token = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding downloads");
            token.cancel();
        }
    });

    let resources = ConfigFileResources::new(&args.config);
    let mut coordinator = DependencyCoordinator::from_resources(engine, &resources, &http_config);

    for raw in &args.coordinates {
        let dependency = Dependency::parse(raw)?;
        coordinator.add_required_dependency(dependency);
    }

    if coordinator.required().is_empty() {
        info!("No dependencies declared. Pass coordinates or provide a dependencies.json.");
        return Ok(());
    }

    let report = coordinator.load_all_dependencies().await;
    let stats = coordinator.engine().stats();
    info!(
        completed = report.completed(),
        failed = report.failed(),
        total = report.total(),
        downloaded = stats.downloaded(),
        reused = stats.reused(),
        "Resolution complete"
    );

    if !report.is_complete() {
        let missing: Vec<String> = report.missing().iter().map(ToString::to_string).collect();
        bail!(
            "{} of {} dependencies could not be resolved: {}",
            report.failed(),
            report.total(),
            missing.join(", ")
        );
    }

    Ok(())
}

/// Serves the declaration file named on the command line under the
/// well-known resource name, and every other resource from its directory.
struct ConfigFileResources {
    directory: DirectoryResources,
    file_name: String,
}

impl ConfigFileResources {
    fn new(config: &Path) -> Self {
        let directory = match config.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Self {
            directory: DirectoryResources::new(directory),
            file_name: config
                .file_name()
                .map_or_else(|| DEPENDENCIES_RESOURCE.to_string(), |name| {
                    name.to_string_lossy().into_owned()
                }),
        }
    }
}

impl ResourceProvider for ConfigFileResources {
    fn resource(&self, name: &str) -> Option<Vec<u8>> {
        if name == DEPENDENCIES_RESOURCE {
            self.directory.resource(&self.file_name)
        } else {
            self.directory.resource(name)
        }
    }
}
