//! Shared HTTP client construction policy for repositories.
//!
//! All repositories go through [`build_repository_http_client`] so they stay
//! consistent on timeouts, user-agent, compression and proxy handling.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::Client;
use reqwest::{ClientBuilder, Proxy};
use tracing::warn;

use crate::user_agent;

use super::RepositoryError;

/// Default connect timeout for repository requests.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default whole-request timeout for repository requests.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 120;

/// Timeout settings applied to every repository client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryHttpConfig {
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds (covers body download).
    pub read_timeout_secs: u64,
}

impl Default for RepositoryHttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

/// Builds a repository HTTP client using shared project policy.
///
/// `repository` is only used for error messages and logging.
///
/// # Errors
///
/// Returns [`RepositoryError::ClientBuild`] when client construction fails.
pub fn build_repository_http_client(
    repository: &str,
    config: &RepositoryHttpConfig,
) -> Result<Client, RepositoryError> {
    match try_build_client(config, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when querying system proxy
            // settings; env proxies still apply on the fallback path.
            warn!(
                repository,
                "Repository client hit system proxy panic; using env-proxy fallback builder"
            );
            match try_build_client(config, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(RepositoryError::client_build(
                    repository,
                    "client construction panicked while initializing networking",
                )),
                Err(BuildClientFailure::Build(error)) => {
                    Err(RepositoryError::client_build(repository, error.to_string()))
                }
            }
        }
        Err(BuildClientFailure::Build(error)) => {
            Err(RepositoryError::client_build(repository, error.to_string()))
        }
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    config: &RepositoryHttpConfig,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let config = *config;
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(&config);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(config: &RepositoryHttpConfig) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.read_timeout_secs))
        .user_agent(user_agent::default_user_agent())
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
