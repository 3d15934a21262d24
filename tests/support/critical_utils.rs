//! Fault injection helpers for the critical test matrix.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use depman_core::download::manifest::manifest_path;
use wiremock::{Respond, ResponseTemplate};

/// Responder that fails the first `fail_count` requests with `status`, then returns 200 with body.
pub struct FlakyResponder {
    fail_count: u32,
    status: u16,
    success_body: Vec<u8>,
    request_count: Arc<AtomicU32>,
}

impl FlakyResponder {
    pub fn new(fail_count: u32, status: u16, success_body: &[u8]) -> Self {
        Self {
            fail_count,
            status,
            success_body: success_body.to_vec(),
            request_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Shared handle on the number of requests answered so far.
    pub fn counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.request_count)
    }
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let n = self.request_count.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_count {
            ResponseTemplate::new(self.status).set_body_bytes(b"unavailable".to_vec())
        } else {
            ResponseTemplate::new(200).set_body_bytes(self.success_body.clone())
        }
    }
}

/// Writes `artifact` plus a manifest that is not valid JSON.
pub fn artifact_with_corrupt_manifest(artifact: &Path, body: &[u8]) {
    if let Some(parent) = artifact.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(artifact, body).unwrap();
    std::fs::write(manifest_path(artifact), b"{\"dependencies\": [ {\"groupId\": ").unwrap();
}

/// Names of the files in `dir`, sorted; empty when `dir` does not exist.
pub fn file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_corrupt_manifest_helper_writes_both_files() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("a-1.jar");
        artifact_with_corrupt_manifest(&artifact, b"jar");
        assert_eq!(file_names(temp.path()), vec!["a-1.jar", "a-1.jar.deps.json"]);
    }

    #[test]
    fn test_file_names_of_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(file_names(&temp.path().join("absent")).is_empty());
    }
}
