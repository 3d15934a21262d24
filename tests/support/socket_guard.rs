//! Mock Maven repositories for socket-bound tests.
//!
//! `start_mock_server_or_skip` returns `None` (and says why on stderr) where
//! localhost sockets cannot be bound, unless `DEPMAN_REQUIRE_SOCKET_TESTS`
//! asks for a hard failure. The `mount_*` helpers lay artifacts out the way
//! `MavenRepository` requests them.

use std::net::TcpListener;

use depman_core::Dependency;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[must_use]
pub fn socket_tests_required() -> bool {
    std::env::var("DEPMAN_REQUIRE_SOCKET_TESTS")
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return Some(MockServer::start().await);
    }

    let message = "cannot bind a localhost socket for the mock repository";
    assert!(
        !socket_tests_required(),
        "{message}; unset DEPMAN_REQUIRE_SOCKET_TESTS to skip instead"
    );
    eprintln!("{message}; skipping");
    None
}

/// Server path of `dependency`'s file with the given extension.
pub fn artifact_path(dependency: &Dependency, extension: &str) -> String {
    format!(
        "/{}/{}/{}/{}-{}.{extension}",
        dependency.group_path(),
        dependency.artifact_id(),
        dependency.version(),
        dependency.artifact_id(),
        dependency.version()
    )
}

/// Answers `HEAD` on the jar so containment checks say yes.
pub async fn mount_present(server: &MockServer, dependency: &Dependency) {
    Mock::given(method("HEAD"))
        .and(path(artifact_path(dependency, "jar")))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Publishes no POM, so the dependency has no transitives.
pub async fn mount_without_pom(server: &MockServer, dependency: &Dependency) {
    Mock::given(method("GET"))
        .and(path(artifact_path(dependency, "pom")))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

/// Hosts a leaf artifact whose jar must be fetched exactly once.
pub async fn mount_leaf_artifact(server: &MockServer, dependency: &Dependency, jar: &[u8]) {
    mount_present(server, dependency).await;
    mount_without_pom(server, dependency).await;
    Mock::given(method("GET"))
        .and(path(artifact_path(dependency, "jar")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(jar.to_vec()))
        .expect(1)
        .mount(server)
        .await;
}
