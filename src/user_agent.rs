//! Shared User-Agent string for repository HTTP clients.

/// Project URL for User-Agent identification (RFC 9308 good citizenship).
const PROJECT_UA_URL: &str = "https://github.com/fierce/depman";

/// Default User-Agent for repository requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("depman/{version} (library-loader; +{PROJECT_UA_URL})")
}
